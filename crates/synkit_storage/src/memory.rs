//! In-memory key/value store for testing.

use crate::backend::KeyValueStore;
use crate::error::StorageResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory key/value store.
///
/// Suitable for unit tests, integration tests and ephemeral stores. Sharing
/// one instance behind an `Arc` between two `Storage` handles simulates a
/// process restart against the same backing data.
///
/// # Example
///
/// ```rust
/// use synkit_storage::{InMemoryStore, KeyValueStore};
///
/// let store = InMemoryStore::new();
/// store.put("a", "1").unwrap();
/// assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-existing entries.
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Returns a copy of all entries.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.read().clone()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn flush(&self) -> StorageResult<()> {
        // Nothing is buffered
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn memory_put_then_get() {
        let store = InMemoryStore::new();
        store.put("key", "value").unwrap();
        assert_eq!(store.get("key").unwrap().as_deref(), Some("value"));
        assert!(store.contains("key").unwrap());
    }

    #[test]
    fn memory_put_overwrites() {
        let store = InMemoryStore::new();
        store.put("key", "one").unwrap();
        store.put("key", "two").unwrap();
        assert_eq!(store.get("key").unwrap().as_deref(), Some("two"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_remove_absent_is_not_an_error() {
        let store = InMemoryStore::new();
        assert!(!store.remove("missing").unwrap());

        store.put("key", "value").unwrap();
        assert!(store.remove("key").unwrap());
        assert_eq!(store.get("key").unwrap(), None);
    }

    #[test]
    fn memory_keys_are_sorted() {
        let store = InMemoryStore::with_entries([("b", "2"), ("a", "1"), ("_c", "3")]);
        assert_eq!(store.keys().unwrap(), vec!["_c", "a", "b"]);
    }

    #[test]
    fn memory_clear() {
        let store = InMemoryStore::with_entries([("a", "1")]);
        store.clear();
        assert!(store.is_empty());
    }
}
