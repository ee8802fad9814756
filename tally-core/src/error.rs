use std::time::Duration;

use thiserror::Error;

use crate::record::RecordError;

/// Error type for ledger and document operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid item name {0:?}: a name needs at least one non-whitespace character")]
    InvalidInput(String),

    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("store unavailable during {operation}: {source}")]
    StoreUnavailable {
        operation: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("store {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("gave up on {name} after {attempts} conflicting writes")]
    Contention { name: String, attempts: u32 },

    #[error("record {name} is unusable: {source}")]
    CorruptRecord {
        name: String,
        source: RecordError,
    },

    #[error("quantity of {0} cannot grow any further")]
    QuantityOverflow(String),
}

impl LedgerError {
    /// True for failures of the store itself, as opposed to rejected input or
    /// bad data. These are the failures a read retry may recover from.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LedgerError::StoreUnavailable { .. } | LedgerError::Timeout { .. }
        )
    }
}
