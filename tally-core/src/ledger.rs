use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, instrument};

use crate::async_store::AsyncStore;
use crate::config::LedgerConfig;
use crate::documents::{Documents, Mutation};
use crate::error::LedgerError;
use crate::name::ItemName;
use crate::record::{PartialRecord, Record};
use crate::snapshot::{InventoryItem, Snapshot};
use crate::view::{self, ChartSeries};

/// The effect a ledger operation had on the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// A new item was written with quantity 1.
    Created,
    /// An existing item's quantity went up.
    Incremented { quantity: u32 },
    /// An existing item's quantity went down.
    Decremented { quantity: u32 },
    /// The last unit was removed, so the item was deleted.
    Removed,
    /// The item did not exist; nothing was written.
    Missing,
    /// The description was replaced.
    Described,
}

/// Owns the rules for how item quantities and descriptions change.
///
/// Quantity changes are read-modify-write cycles made safe by conditional
/// writes at the store boundary: a write only lands if the record is still
/// at the revision that was read, and a lost race is re-read and retried.
/// Concurrent `add`s from independent clients therefore never lose updates.
///
/// After every successful mutation the ledger re-reads the whole store into a
/// fresh [`Snapshot`]. A failed mutation leaves the previous snapshot in
/// place.
pub struct Ledger<S> {
    documents: Documents<S>,
    snapshot: RwLock<Arc<Snapshot>>,
    versions: AtomicU64,
}

impl<S: AsyncStore> Ledger<S> {
    /// Creates a ledger with an empty snapshot and no store access.
    pub fn new(store: S, config: &LedgerConfig) -> Self {
        Ledger {
            documents: Documents::new(store, config),
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            versions: AtomicU64::new(0),
        }
    }

    /// Creates a ledger and loads its first snapshot.
    pub async fn open(store: S, config: &LedgerConfig) -> Result<Self, LedgerError> {
        let ledger = Self::new(store, config);
        ledger.refresh_snapshot().await?;
        Ok(ledger)
    }

    pub fn documents(&self) -> &Documents<S> {
        &self.documents
    }

    /// Adds one unit of `name`, creating the item if needed.
    #[instrument(skip(self))]
    pub async fn add(&self, name: &str) -> Result<Change, LedgerError> {
        let name = ItemName::parse(name)?;
        let change = self
            .documents
            .update(name.as_str(), |current| match current {
                None => Ok((Mutation::Put(Record::first()), Change::Created)),
                Some(record) => {
                    let quantity = record
                        .quantity
                        .checked_add(1)
                        .ok_or_else(|| LedgerError::QuantityOverflow(name.to_string()))?;
                    let next = Record {
                        quantity,
                        ..record.clone()
                    };
                    Ok((Mutation::Put(next), Change::Incremented { quantity }))
                }
            })
            .await?;
        debug!(?change, "add applied");
        self.refresh_snapshot().await?;
        Ok(change)
    }

    /// Removes one unit of `name`, deleting the item when its last unit goes.
    ///
    /// Removing an item that does not exist is not an error.
    #[instrument(skip(self))]
    pub async fn remove(&self, name: &str) -> Result<Change, LedgerError> {
        let name = ItemName::parse(name)?;
        let change = self
            .documents
            .update(name.as_str(), |current| {
                Ok(match current {
                    None => (Mutation::Keep, Change::Missing),
                    Some(record) if record.quantity <= 1 => (Mutation::Delete, Change::Removed),
                    Some(record) => {
                        let quantity = record.quantity - 1;
                        let next = Record {
                            quantity,
                            ..record.clone()
                        };
                        (Mutation::Put(next), Change::Decremented { quantity })
                    }
                })
            })
            .await?;
        debug!(?change, "remove applied");
        self.refresh_snapshot().await?;
        Ok(change)
    }

    /// Replaces the description of an existing item, leaving its quantity
    /// alone.
    #[instrument(skip(self, description))]
    pub async fn edit_description(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Change, LedgerError> {
        let name = ItemName::parse(name)?;
        let merged = self
            .documents
            .merge(name.as_str(), PartialRecord::description(description))
            .await?;
        if merged.is_none() {
            return Err(LedgerError::ItemNotFound(name.into_string()));
        }
        debug!("description replaced");
        self.refresh_snapshot().await?;
        Ok(Change::Described)
    }

    /// Re-reads every record and installs the result as the current snapshot.
    ///
    /// Returns the snapshot that is installed afterwards. When a refresh that
    /// started later has already finished, that newer snapshot is kept and
    /// returned instead of this one.
    #[instrument(skip(self))]
    pub async fn refresh_snapshot(&self) -> Result<Arc<Snapshot>, LedgerError> {
        // Versions order refreshes by when they started reading.
        let version = self.versions.fetch_add(1, Ordering::SeqCst) + 1;
        let records = self.documents.list_all().await?;
        let snapshot = Snapshot::new(
            version,
            records
                .into_iter()
                .map(|(name, record)| InventoryItem::from_record(name, record)),
        );

        let mut current = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        if snapshot.version() > current.version() {
            debug!(version, items = snapshot.len(), "snapshot refreshed");
            *current = Arc::new(snapshot);
        } else {
            debug!(version, installed = current.version(), "stale listing discarded");
        }
        Ok(Arc::clone(&current))
    }

    /// The most recently installed snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Items whose name contains `term`, ignoring case.
    pub fn search(&self, term: &str) -> Vec<InventoryItem> {
        let snapshot = self.snapshot();
        view::filter(&snapshot, term).into_iter().cloned().collect()
    }

    pub fn chart_series(&self) -> ChartSeries {
        view::to_series(&self.snapshot())
    }
}
