use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::sync::{PoisonError, RwLock};

/// A store-assigned version number for a single stored value.
///
/// Revisions only ever increase and are never handed out twice by the same
/// store, so a value that was deleted and recreated never matches a revision
/// observed before the delete.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(u64);

impl Revision {
    pub const fn new(value: u64) -> Self {
        Revision(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A value paired with the revision it was read at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Versioned<T> {
    pub value: T,
    pub revision: Revision,
}

impl<T> Versioned<T> {
    pub fn new(value: T, revision: Revision) -> Self {
        Versioned { value, revision }
    }
}

/// A key-value store for encoded inventory records.
///
/// Stores operate on raw bytes; decoding and validation happen in the
/// document layer. Keys are item names, used verbatim.
///
/// All methods take `&self` to support stores with internal locking (e.g., RocksDB).
pub trait Store {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Retrieves the bytes and current revision for a key, or None if not present.
    fn get(&self, key: &str) -> Result<Option<Versioned<Vec<u8>>>, Self::Error>;

    /// Unconditionally stores bytes at the given key.
    fn put(&self, key: &str, value: &[u8]) -> Result<Revision, Self::Error>;

    /// Removes a key. Returns whether a value was present.
    fn delete(&self, key: &str) -> Result<bool, Self::Error>;

    /// Lists every entry, ordered by key bytes.
    fn list(&self) -> Result<Vec<(String, Versioned<Vec<u8>>)>, Self::Error>;

    /// Writes `value` (or deletes the key when `value` is None) only if the
    /// key's current revision equals `expected`.
    ///
    /// `expected == None` requires the key to be absent. Returns false,
    /// without writing, when the revision has moved on.
    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<Revision>,
        value: Option<&[u8]>,
    ) -> Result<bool, Self::Error>;
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: BTreeMap<String, Versioned<Vec<u8>>>,
    last_revision: u64,
}

impl MemoryState {
    fn next_revision(&mut self) -> Revision {
        self.last_revision += 1;
        Revision(self.last_revision)
    }
}

/// An in-memory store backed by a BTreeMap.
///
/// Useful for testing and as a reference implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemoryStore {
    type Error = Infallible;

    fn get(&self, key: &str) -> Result<Option<Versioned<Vec<u8>>>, Self::Error> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<Revision, Self::Error> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let revision = state.next_revision();
        state
            .entries
            .insert(key.to_owned(), Versioned::new(value.to_vec(), revision));
        Ok(revision)
    }

    fn delete(&self, key: &str) -> Result<bool, Self::Error> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        Ok(state.entries.remove(key).is_some())
    }

    fn list(&self) -> Result<Vec<(String, Versioned<Vec<u8>>)>, Self::Error> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state
            .entries
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<Revision>,
        value: Option<&[u8]>,
    ) -> Result<bool, Self::Error> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let current = state.entries.get(key).map(|v| v.revision);
        if current != expected {
            return Ok(false);
        }
        match value {
            Some(bytes) => {
                let revision = state.next_revision();
                state
                    .entries
                    .insert(key.to_owned(), Versioned::new(bytes.to_vec(), revision));
            }
            None => {
                state.entries.remove(key);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_put_get() {
        let store = MemoryStore::new();
        let value = b"hello world";

        let revision = store.put("apple", value).unwrap();
        let retrieved = store.get("apple").unwrap().unwrap();

        assert_eq!(retrieved.value, value.to_vec());
        assert_eq!(retrieved.revision, revision);
    }

    #[test]
    fn memory_store_get_missing() {
        let store = MemoryStore::new();

        assert_eq!(store.get("nonexistent").unwrap(), None);
    }

    #[test]
    fn memory_store_overwrite_bumps_revision() {
        let store = MemoryStore::new();

        let first = store.put("apple", b"first").unwrap();
        let second = store.put("apple", b"second").unwrap();

        assert!(second > first);
        let retrieved = store.get("apple").unwrap().unwrap();
        assert_eq!(retrieved.value, b"second".to_vec());
    }

    #[test]
    fn memory_store_delete() {
        let store = MemoryStore::new();
        store.put("apple", b"value").unwrap();

        assert!(store.delete("apple").unwrap());
        assert!(!store.delete("apple").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn memory_store_lists_in_key_order() {
        let store = MemoryStore::new();
        store.put("pear", b"3").unwrap();
        store.put("apple", b"1").unwrap();
        store.put("banana", b"2").unwrap();

        let keys: Vec<String> = store.list().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["apple", "banana", "pear"]);
    }

    #[test]
    fn compare_and_swap_requires_matching_revision() {
        let store = MemoryStore::new();
        let revision = store.put("apple", b"1").unwrap();

        assert!(store.compare_and_swap("apple", Some(revision), Some(&b"2"[..])).unwrap());
        // The revision read before the first swap is now stale.
        assert!(!store.compare_and_swap("apple", Some(revision), Some(&b"3"[..])).unwrap());
        assert_eq!(store.get("apple").unwrap().unwrap().value, b"2".to_vec());
    }

    #[test]
    fn compare_and_swap_expecting_absent() {
        let store = MemoryStore::new();

        assert!(store.compare_and_swap("apple", None, Some(&b"1"[..])).unwrap());
        assert!(!store.compare_and_swap("apple", None, Some(&b"1"[..])).unwrap());
    }

    #[test]
    fn compare_and_swap_delete() {
        let store = MemoryStore::new();
        let revision = store.put("apple", b"1").unwrap();

        assert!(store.compare_and_swap("apple", Some(revision), None).unwrap());
        assert_eq!(store.get("apple").unwrap(), None);
    }

    #[test]
    fn recreated_key_never_reuses_revision() {
        let store = MemoryStore::new();
        let old = store.put("apple", b"1").unwrap();
        store.delete("apple").unwrap();
        store.put("apple", b"1").unwrap();

        assert!(!store.compare_and_swap("apple", Some(old), Some(&b"2"[..])).unwrap());
    }
}
