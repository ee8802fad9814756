//! Tally is an inventory ledger over a key-value document store.
//!
//! Core concepts:
//! - **Record**: the per-item document (`quantity`, `description`), CBOR-encoded
//! - **Store**: byte-level key-value storage with revisions and conditional writes
//! - **Documents**: typed, timeout-bounded record access on top of a store
//! - **Ledger**: the add / remove / edit rules, kept race-free with conditional writes
//! - **Snapshot**: an immutable, versioned materialization of every item
//! - **View**: search and chart projections over a snapshot
//!
//! # Example
//!
//! ```
//! use tally_core::{Change, LedgerConfig, Ledger, MemoryStore};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let ledger = Ledger::open(MemoryStore::new(), &LedgerConfig::default()).await?;
//!
//! assert_eq!(ledger.add("apple").await?, Change::Created);
//! assert_eq!(ledger.add("apple").await?, Change::Incremented { quantity: 2 });
//! ledger.edit_description("apple", "granny smith").await?;
//!
//! let series = ledger.chart_series();
//! assert_eq!(series.labels, vec!["Apple"]);
//! assert_eq!(series.values, vec![2]);
//! # Ok::<(), tally_core::LedgerError>(())
//! # }).unwrap();
//! ```
//!
//! The ledger installs no tracing subscriber; operations emit `tracing`
//! spans and events for whichever subscriber the application sets up.

mod async_store;
mod config;
mod documents;
mod error;
mod ledger;
mod name;
mod record;
mod retry;
mod snapshot;
mod store;
pub mod view;

pub use async_store::AsyncStore;
pub use config::{
    CONFIG_ENV, Config, ConfigError, LedgerConfig, StoreConfig, default_store_path, load_config,
};
pub use documents::{Documents, Mutation};
pub use error::LedgerError;
pub use ledger::{Change, Ledger};
pub use name::ItemName;
pub use record::{PartialRecord, Record, RecordError};
pub use retry::RetryPolicy;
pub use snapshot::{InventoryItem, Snapshot};
pub use store::{MemoryStore, Revision, Store, Versioned};
pub use view::{ChartSeries, capitalize_first};
