//! Server-side sync state.

use parking_lot::RwLock;
use std::collections::HashMap;
use synkit_core::EntityRecord;

/// What the server knows about one synced entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncInfo {
    /// Server version, starting at 1.
    pub version: u64,
    /// Content digest of the stored record.
    pub content_hash: String,
    /// The stored record; its `version` equals [`SyncInfo::version`].
    pub record: EntityRecord,
}

/// Sync state per encoded key.
#[derive(Debug, Default)]
pub struct SyncInfoStore {
    entries: RwLock<HashMap<String, SyncInfo>>,
}

impl SyncInfoStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state for `key`.
    pub fn get(&self, key: &str) -> Option<SyncInfo> {
        self.entries.read().get(key).cloned()
    }

    /// Stores `record` under its key with `content_hash`.
    ///
    /// A new key starts at version 1; an existing one is incremented.
    /// Returns the new version.
    pub fn store(&self, mut record: EntityRecord, content_hash: &str) -> u64 {
        let key = record.key.as_str().to_string();
        let mut entries = self.entries.write();
        let version = entries.get(&key).map_or(1, |info| info.version + 1);
        record.version = version;
        entries.insert(
            key,
            SyncInfo {
                version,
                content_hash: content_hash.to_string(),
                record,
            },
        );
        version
    }

    /// Removes the state for `key`. Returns true if it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Returns the number of tracked entities.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synkit_core::Entity;

    fn record(name: &str) -> EntityRecord {
        Entity::builder("Person")
            .name(name)
            .build()
            .unwrap()
            .to_record()
    }

    #[test]
    fn versions_start_at_one_and_increment() {
        let store = SyncInfoStore::new();
        assert_eq!(store.store(record("ann"), "h1"), 1);
        assert_eq!(store.store(record("ann"), "h2"), 2);
        assert_eq!(store.store(record("bob"), "h1"), 1);

        let info = store.get(record("ann").key.as_str()).unwrap();
        assert_eq!(info.version, 2);
        assert_eq!(info.record.version, 2);
        assert_eq!(info.content_hash, "h2");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn remove() {
        let store = SyncInfoStore::new();
        let key = record("ann").key.as_str().to_string();
        store.store(record("ann"), "h");
        assert!(store.remove(&key));
        assert!(!store.remove(&key));
        assert!(store.is_empty());
    }
}
