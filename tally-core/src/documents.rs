use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::async_store::AsyncStore;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::record::{PartialRecord, Record};
use crate::retry::RetryPolicy;
use crate::store::{Revision, Versioned};

/// What an update wants done to the record it was shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Leave the store untouched.
    Keep,
    /// Write this record.
    Put(Record),
    /// Remove the key.
    Delete,
}

/// Typed access to records held in an [`AsyncStore`].
///
/// Every store call is bounded by the configured timeout. Reads may be
/// retried on transient failures; writes never are, since a write whose
/// acknowledgement was lost may already have applied.
pub struct Documents<S> {
    store: S,
    timeout: Duration,
    read_retry: RetryPolicy,
    max_conflict_retries: u32,
}

impl<S: AsyncStore> Documents<S> {
    pub fn new(store: S, config: &LedgerConfig) -> Self {
        Documents {
            store,
            timeout: config.store_timeout(),
            read_retry: config.read_retry.normalized(),
            max_conflict_retries: config.max_conflict_retries,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn call<T, Fut>(&self, operation: &'static str, fut: Fut) -> Result<T, LedgerError>
    where
        Fut: Future<Output = Result<T, S::Error>>,
    {
        match timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(LedgerError::StoreUnavailable {
                operation,
                source: Box::new(e),
            }),
            Err(_) => Err(LedgerError::Timeout {
                operation,
                after: self.timeout,
            }),
        }
    }

    pub async fn get(&self, name: &str) -> Result<Option<Versioned<Record>>, LedgerError> {
        let raw = self
            .read_retry
            .retry_async(
                |_| self.call("get", self.store.async_get(name)),
                LedgerError::is_transient,
            )
            .await?;
        raw.map(|v| decode(name, v)).transpose()
    }

    /// Every record in store listing order.
    pub async fn list_all(&self) -> Result<Vec<(String, Record)>, LedgerError> {
        let raw = self
            .read_retry
            .retry_async(
                |_| self.call("list", self.store.async_list()),
                LedgerError::is_transient,
            )
            .await?;
        raw.into_iter()
            .map(|(name, v)| {
                let record = decode(&name, v)?.value;
                Ok((name, record))
            })
            .collect()
    }

    /// Full overwrite, ignoring whatever is stored.
    pub async fn put(&self, name: &str, record: &Record) -> Result<Revision, LedgerError> {
        let bytes = encode(name, record)?;
        self.call("put", self.store.async_put(name, &bytes)).await
    }

    pub async fn delete(&self, name: &str) -> Result<bool, LedgerError> {
        self.call("delete", self.store.async_delete(name)).await
    }

    /// Shallow-merges `partial` onto the stored record.
    ///
    /// A missing key is left missing and `None` is returned; merge never
    /// creates a record.
    pub async fn merge(
        &self,
        name: &str,
        partial: PartialRecord,
    ) -> Result<Option<Record>, LedgerError> {
        self.update(name, |current| {
            Ok(match current {
                None => (Mutation::Keep, None),
                Some(record) => {
                    let merged = record.clone().merged(partial.clone());
                    merged
                        .validate()
                        .map_err(|source| LedgerError::CorruptRecord {
                            name: name.to_owned(),
                            source,
                        })?;
                    (Mutation::Put(merged.clone()), Some(merged))
                }
            })
        })
        .await
    }

    /// Optimistic read-modify-write.
    ///
    /// `decide` sees the current record and returns the mutation to apply
    /// along with a result for the caller. The mutation is written only if
    /// the record has not changed since it was read; otherwise the record is
    /// read again and `decide` runs again. After `max_conflict_retries` lost
    /// races the update fails with `Contention`.
    pub async fn update<T, F>(&self, name: &str, mut decide: F) -> Result<T, LedgerError>
    where
        F: FnMut(Option<&Record>) -> Result<(Mutation, T), LedgerError>,
    {
        let mut conflicts = 0u32;
        loop {
            let current = self.get(name).await?;
            let expected = current.as_ref().map(|v| v.revision);
            let (mutation, outcome) = decide(current.as_ref().map(|v| &v.value))?;

            let bytes = match &mutation {
                Mutation::Keep => return Ok(outcome),
                Mutation::Put(record) => Some(encode(name, record)?),
                Mutation::Delete => None,
            };
            let swapped = self
                .call(
                    "compare_and_swap",
                    self.store
                        .async_compare_and_swap(name, expected, bytes.as_deref()),
                )
                .await?;
            if swapped {
                debug!(item = name, ?expected, ?mutation, "record updated");
                return Ok(outcome);
            }

            conflicts += 1;
            if conflicts > self.max_conflict_retries {
                return Err(LedgerError::Contention {
                    name: name.to_owned(),
                    attempts: conflicts,
                });
            }
            warn!(item = name, conflicts, "concurrent write detected, re-reading");
        }
    }
}

fn decode(name: &str, raw: Versioned<Vec<u8>>) -> Result<Versioned<Record>, LedgerError> {
    let record = Record::from_bytes(&raw.value).map_err(|source| LedgerError::CorruptRecord {
        name: name.to_owned(),
        source,
    })?;
    Ok(Versioned::new(record, raw.revision))
}

fn encode(name: &str, record: &Record) -> Result<Vec<u8>, LedgerError> {
    record.to_bytes().map_err(|source| LedgerError::CorruptRecord {
        name: name.to_owned(),
        source,
    })
}
