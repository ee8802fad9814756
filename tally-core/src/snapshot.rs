use indexmap::IndexMap;
use serde::Serialize;

use crate::record::Record;

/// An item as presented to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryItem {
    pub name: String,
    pub quantity: u32,
    pub description: String,
}

impl InventoryItem {
    pub fn from_record(name: String, record: Record) -> Self {
        InventoryItem {
            name,
            quantity: record.quantity,
            description: record.description,
        }
    }
}

/// A point-in-time view of every item in the store.
///
/// Snapshots are immutable once built. The ledger replaces its current
/// snapshot wholesale on refresh, and `version` grows with each replacement.
/// Items keep the order the store listed them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    version: u64,
    items: IndexMap<String, InventoryItem>,
}

impl Snapshot {
    pub fn new(version: u64, items: impl IntoIterator<Item = InventoryItem>) -> Self {
        Snapshot {
            version,
            items: items
                .into_iter()
                .map(|item| (item.name.clone(), item))
                .collect(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, name: &str) -> Option<&InventoryItem> {
        self.items.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InventoryItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Owned copies of every item, in snapshot order.
    pub fn to_items(&self) -> Vec<InventoryItem> {
        self.items.values().cloned().collect()
    }
}
