//! RocksDB-backed store for Tally.
//!
//! Each value is framed as an 8-byte big-endian revision followed by the
//! encoded record. Conditional writes run inside optimistic transactions, so
//! a write racing another writer on the same key fails its commit instead of
//! silently overwriting.
//!
//! The highest revision handed out is kept in a separate `meta` column family
//! whenever a key is deleted, so revisions stay unique across reopens even
//! when the newest entries are gone.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use rocksdb::{
    ColumnFamily, ErrorKind, IteratorMode, OptimisticTransactionDB, Options, SingleThreaded,
};
use tally_core::{Revision, Store, Versioned};
use thiserror::Error;
use tracing::debug;

const REVISION_LEN: usize = 8;
const META_CF: &str = "meta";
const HIGH_WATER_KEY: &[u8] = b"revision_high_water";

#[derive(Debug, Error)]
pub enum RocksError {
    #[error("RocksDB error: {0}")]
    Rocks(#[from] rocksdb::Error),

    #[error("stored value for {key} is shorter than its revision header")]
    Truncated { key: String },

    #[error("stored key is not valid UTF-8")]
    NonUtf8Key,

    #[error("column family {0} is missing")]
    MissingColumnFamily(&'static str),
}

/// A persistent store backed by RocksDB.
pub struct RocksStore {
    db: OptimisticTransactionDB<SingleThreaded>,
    last_revision: AtomicU64,
    persisted_revision: Mutex<u64>,
}

impl RocksStore {
    /// Opens a RocksDB store at the given path.
    ///
    /// Creates the database if it doesn't exist. Revisions continue from the
    /// highest one ever handed out, including revisions of deleted keys.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RocksError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        let db = OptimisticTransactionDB::<SingleThreaded>::open_cf(&opts, path, [META_CF])?;

        let persisted = read_high_water(&db)?;
        let mut highest = persisted;
        for entry in db.iterator(IteratorMode::Start) {
            let (key, value) = entry?;
            let (revision, _) = split_frame(&key, &value)?;
            highest = highest.max(revision.get());
        }
        debug!(highest, persisted, "opened rocks store");

        Ok(Self {
            db,
            last_revision: AtomicU64::new(highest),
            persisted_revision: Mutex::new(persisted),
        })
    }

    fn next_revision(&self) -> Revision {
        Revision::new(self.last_revision.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn meta(&self) -> Result<&ColumnFamily, RocksError> {
        self.db
            .cf_handle(META_CF)
            .ok_or(RocksError::MissingColumnFamily(META_CF))
    }

    /// Records the current revision counter on disk.
    ///
    /// Must run before a delete commits: once an entry is gone, its revision
    /// can no longer be recovered by scanning.
    fn persist_high_water(&self) -> Result<(), RocksError> {
        let mut persisted = self
            .persisted_revision
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let current = self.last_revision.load(Ordering::SeqCst);
        if current > *persisted {
            self.db
                .put_cf(self.meta()?, HIGH_WATER_KEY, current.to_be_bytes())?;
            *persisted = current;
        }
        Ok(())
    }
}

fn read_high_water(db: &OptimisticTransactionDB<SingleThreaded>) -> Result<u64, RocksError> {
    let meta = db
        .cf_handle(META_CF)
        .ok_or(RocksError::MissingColumnFamily(META_CF))?;
    match db.get_cf(meta, HIGH_WATER_KEY)? {
        Some(raw) => {
            let bytes = <[u8; REVISION_LEN]>::try_from(raw.as_slice()).map_err(|_| {
                RocksError::Truncated {
                    key: String::from_utf8_lossy(HIGH_WATER_KEY).into_owned(),
                }
            })?;
            Ok(u64::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

fn frame(revision: Revision, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(REVISION_LEN + payload.len());
    buf.extend_from_slice(&revision.get().to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

fn split_frame<'a>(key: &[u8], value: &'a [u8]) -> Result<(Revision, &'a [u8]), RocksError> {
    let Some((header, payload)) = value.split_first_chunk::<REVISION_LEN>() else {
        return Err(RocksError::Truncated {
            key: String::from_utf8_lossy(key).into_owned(),
        });
    };
    Ok((Revision::new(u64::from_be_bytes(*header)), payload))
}

fn unframe(key: &[u8], value: &[u8]) -> Result<Versioned<Vec<u8>>, RocksError> {
    let (revision, payload) = split_frame(key, value)?;
    Ok(Versioned::new(payload.to_vec(), revision))
}

impl Store for RocksStore {
    type Error = RocksError;

    fn get(&self, key: &str) -> Result<Option<Versioned<Vec<u8>>>, Self::Error> {
        self.db
            .get(key.as_bytes())?
            .map(|value| unframe(key.as_bytes(), &value))
            .transpose()
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<Revision, Self::Error> {
        let revision = self.next_revision();
        self.db.put(key.as_bytes(), frame(revision, value))?;
        Ok(revision)
    }

    fn delete(&self, key: &str) -> Result<bool, Self::Error> {
        let txn = self.db.transaction();
        let existed = txn.get_for_update(key.as_bytes(), true)?.is_some();
        if existed {
            self.persist_high_water()?;
            txn.delete(key.as_bytes())?;
        }
        txn.commit()?;
        Ok(existed)
    }

    fn list(&self) -> Result<Vec<(String, Versioned<Vec<u8>>)>, Self::Error> {
        let mut entries = Vec::new();
        for entry in self.db.iterator(IteratorMode::Start) {
            let (key, value) = entry?;
            let versioned = unframe(&key, &value)?;
            let name = String::from_utf8(key.into_vec()).map_err(|_| RocksError::NonUtf8Key)?;
            entries.push((name, versioned));
        }
        Ok(entries)
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<Revision>,
        value: Option<&[u8]>,
    ) -> Result<bool, Self::Error> {
        let txn = self.db.transaction();
        let current = match txn.get_for_update(key.as_bytes(), true)? {
            Some(raw) => Some(split_frame(key.as_bytes(), &raw)?.0),
            None => None,
        };
        if current != expected {
            return Ok(false);
        }

        match value {
            Some(payload) => txn.put(key.as_bytes(), frame(self.next_revision(), payload))?,
            None => {
                self.persist_high_water()?;
                txn.delete(key.as_bytes())?
            }
        }
        match txn.commit() {
            Ok(()) => Ok(true),
            Err(e) if matches!(e.kind(), ErrorKind::Busy | ErrorKind::TryAgain) => {
                debug!(key, "optimistic commit lost a race");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
