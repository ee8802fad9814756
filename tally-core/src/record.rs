use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a stored record could not be used.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to decode: {0}")]
    Decode(String),
    #[error("failed to encode: {0}")]
    Encode(String),
    #[error("quantity is zero")]
    ZeroQuantity,
}

/// The document stored for each item name.
///
/// Records are fixed-shape: unknown fields and a missing quantity are
/// rejected on decode, and a zero quantity is rejected by validation. Only
/// non-empty items exist in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Record {
    pub quantity: u32,
    #[serde(default)]
    pub description: String,
}

impl Record {
    /// The record written the first time an item is added.
    pub fn first() -> Self {
        Record {
            quantity: 1,
            description: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        if self.quantity == 0 {
            return Err(RecordError::ZeroQuantity);
        }
        Ok(())
    }

    /// Encodes the record as CBOR.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| RecordError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes and validates a record from CBOR.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        let record: Record =
            ciborium::from_reader(bytes).map_err(|e| RecordError::Decode(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    /// Applies a shallow field merge; fields absent from `partial` are kept.
    pub fn merged(mut self, partial: PartialRecord) -> Self {
        if let Some(quantity) = partial.quantity {
            self.quantity = quantity;
        }
        if let Some(description) = partial.description {
            self.description = description;
        }
        self
    }
}

/// A subset of record fields to merge onto an existing record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialRecord {
    pub quantity: Option<u32>,
    pub description: Option<String>,
}

impl PartialRecord {
    pub fn description(description: impl Into<String>) -> Self {
        PartialRecord {
            description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn quantity(quantity: u32) -> Self {
        PartialRecord {
            quantity: Some(quantity),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Loose {
        quantity: u32,
        description: String,
        colour: String,
    }

    #[derive(Serialize)]
    struct QuantityOnly {
        quantity: u32,
    }

    #[derive(Serialize)]
    struct NegativeQuantity {
        quantity: i64,
        description: String,
    }

    fn cbor(value: &impl Serialize) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf).unwrap();
        buf
    }

    #[test]
    fn record_serialization_roundtrip() {
        let record = Record {
            quantity: 3,
            description: "ripe".to_string(),
        };

        let recovered = Record::from_bytes(&record.to_bytes().unwrap()).unwrap();
        assert_eq!(recovered, record);
    }

    #[test]
    fn missing_description_defaults_to_empty() {
        let bytes = cbor(&QuantityOnly { quantity: 2 });

        let record = Record::from_bytes(&bytes).unwrap();
        assert_eq!(record.quantity, 2);
        assert_eq!(record.description, "");
    }

    #[test]
    fn unknown_fields_rejected() {
        let bytes = cbor(&Loose {
            quantity: 1,
            description: String::new(),
            colour: "red".to_string(),
        });

        assert!(matches!(Record::from_bytes(&bytes), Err(RecordError::Decode(_))));
    }

    #[test]
    fn zero_quantity_rejected() {
        let bytes = cbor(&QuantityOnly { quantity: 0 });

        assert!(matches!(Record::from_bytes(&bytes), Err(RecordError::ZeroQuantity)));
    }

    #[test]
    fn negative_quantity_rejected() {
        let bytes = cbor(&NegativeQuantity {
            quantity: -4,
            description: String::new(),
        });

        assert!(matches!(Record::from_bytes(&bytes), Err(RecordError::Decode(_))));
    }

    #[test]
    fn garbage_rejected() {
        assert!(Record::from_bytes(b"\xff\x00not cbor").is_err());
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let record = Record {
            quantity: 5,
            description: "old".to_string(),
        };

        let merged = record.clone().merged(PartialRecord::description("new"));
        assert_eq!(merged.quantity, 5);
        assert_eq!(merged.description, "new");

        let merged = record.merged(PartialRecord::quantity(6));
        assert_eq!(merged.quantity, 6);
        assert_eq!(merged.description, "old");
    }
}
