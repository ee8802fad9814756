use std::future::Future;

use crate::store::{Revision, Store, Versioned};

/// Async key-value store for encoded inventory records.
///
/// Mirrors the `Store` trait but with async methods, enabling network-capable
/// implementations (e.g., a hosted document database). Methods are prefixed
/// with `async_` to avoid name collisions when a type implements both `Store`
/// and `AsyncStore`.
pub trait AsyncStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn async_get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Versioned<Vec<u8>>>, Self::Error>> + Send;

    fn async_put(
        &self,
        key: &str,
        value: &[u8],
    ) -> impl Future<Output = Result<Revision, Self::Error>> + Send;

    fn async_delete(&self, key: &str) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    fn async_list(
        &self,
    ) -> impl Future<Output = Result<Vec<(String, Versioned<Vec<u8>>)>, Self::Error>> + Send;

    fn async_compare_and_swap(
        &self,
        key: &str,
        expected: Option<Revision>,
        value: Option<&[u8]>,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;
}

/// Blanket impl: any sync `Store` is also an `AsyncStore`.
impl<S: Store + Send + Sync> AsyncStore for S {
    type Error = S::Error;

    async fn async_get(&self, key: &str) -> Result<Option<Versioned<Vec<u8>>>, Self::Error> {
        self.get(key)
    }

    async fn async_put(&self, key: &str, value: &[u8]) -> Result<Revision, Self::Error> {
        self.put(key, value)
    }

    async fn async_delete(&self, key: &str) -> Result<bool, Self::Error> {
        self.delete(key)
    }

    async fn async_list(&self) -> Result<Vec<(String, Versioned<Vec<u8>>)>, Self::Error> {
        self.list()
    }

    async fn async_compare_and_swap(
        &self,
        key: &str,
        expected: Option<Revision>,
        value: Option<&[u8]>,
    ) -> Result<bool, Self::Error> {
        self.compare_and_swap(key, expected, value)
    }
}
