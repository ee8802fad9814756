use std::fmt;

use crate::error::LedgerError;

/// The name of an inventory item, which is also its store key.
///
/// Names are kept exactly as given: no trimming and no case folding. The only
/// rule is that a name must contain at least one non-whitespace character.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemName(String);

impl ItemName {
    /// Validates a caller-supplied name.
    pub fn parse(name: &str) -> Result<Self, LedgerError> {
        if name.trim().is_empty() {
            return Err(LedgerError::InvalidInput(name.to_owned()));
        }
        Ok(ItemName(name.to_owned()))
    }

    /// Returns the name as stored.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for ItemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemName({:?})", self.0)
    }
}

impl fmt::Display for ItemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
