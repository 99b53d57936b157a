//! Local entity storage.
//!
//! [`Storage`] maps encoded keys to entity JSON on top of any
//! [`KeyValueStore`]. It also owns two persisted counters: the next
//! auto-assigned numeric id and the next RPC correlation id.

use crate::entity::{Entity, EntityRecord};
use crate::error::{CoreError, CoreResult};
use crate::key::{IdOrName, Identity, KeyPath};
use parking_lot::Mutex;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use synkit_storage::{FileStore, FileStoreOptions, InMemoryStore, KeyValueStore, StorageError};
use tracing::{debug, warn};

/// Store key of the next auto-assigned numeric id.
pub const NEXT_ID_KEY: &str = "_NextId";

/// Store key of the next RPC correlation id.
pub const NEXT_RPC_ID_KEY: &str = "_NextRpcId";

/// Entity storage over a flat key/value store.
///
/// Cloning is cheap; clones share the same store and counter lock.
#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn KeyValueStore>,
    counters: Arc<Mutex<()>>,
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

impl Storage {
    /// Creates storage over `store`.
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self::from_shared(Arc::new(store))
    }

    /// Creates storage over a shared store.
    ///
    /// Reopening a `Storage` on the same `Arc` simulates a restart against
    /// the same persisted data.
    pub fn from_shared(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            counters: Arc::new(Mutex::new(())),
        }
    }

    /// Creates ephemeral in-memory storage.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(InMemoryStore::new())
    }

    /// Opens file-backed storage at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be opened or replayed.
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        Self::open_with(path, FileStoreOptions::default())
    }

    /// Opens file-backed storage at `path` with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be opened or replayed.
    pub fn open_with(path: impl AsRef<Path>, options: FileStoreOptions) -> CoreResult<Self> {
        Ok(Self::new(FileStore::open_with(path.as_ref(), options)?))
    }

    /// Returns the next numeric id and persists its successor.
    ///
    /// Starts at 1. Ids are never handed out twice for the same store, even
    /// across restarts or after deletes.
    pub fn next_id(&self) -> CoreResult<u64> {
        let id = self.bump_counter(NEXT_ID_KEY)?;
        debug!(id, "allocated entity id");
        Ok(id)
    }

    /// Returns the next RPC correlation id and persists its successor.
    pub fn next_rpc_id(&self) -> CoreResult<u64> {
        self.bump_counter(NEXT_RPC_ID_KEY)
    }

    fn bump_counter(&self, counter: &str) -> CoreResult<u64> {
        let _guard = self.counters.lock();
        let current = match self.store.get(counter)? {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                StorageError::Corrupted(format!("counter {counter} holds {raw:?}"))
            })?,
            None => 1,
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| CoreError::invalid_operation(format!("counter {counter} exhausted")))?;
        self.store.put(counter, &next.to_string())?;
        Ok(current)
    }

    /// Persists `entity`, completing its key if needed.
    ///
    /// An incomplete key gets a fresh id from [`Storage::next_id`]. The key
    /// is rebuilt from its resolved identity and written back to the entity.
    /// The version is stored as is.
    ///
    /// Returns the entity's (possibly new) key.
    pub fn put(&self, entity: &mut Entity) -> CoreResult<KeyPath> {
        let current = entity.key();
        let identity = match current.identity() {
            Identity::Incomplete => IdOrName::Id(self.next_id()?),
            Identity::Id(id) => IdOrName::Id(*id),
            Identity::Name(name) => IdOrName::Name(name.clone()),
        };
        let parent = current.parent();
        let key = KeyPath::from_path_in_app(
            current.application(),
            current.kind(),
            identity,
            parent.as_ref(),
            Some(current.namespace()),
        )?;
        entity.set_key(key.clone());

        let json = entity.to_json_string()?;
        self.store.put(key.as_str(), &json)?;
        debug!(key = ?key, version = entity.version(), "stored entity");
        Ok(key)
    }

    /// Loads the entity stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if nothing is stored under `key`, the stored
    /// record cannot be parsed, or one of its property values does not
    /// decode.
    pub fn get(&self, key: &KeyPath) -> CoreResult<Entity> {
        let not_found = || CoreError::EntityNotFound {
            key: key.as_str().to_string(),
        };

        let raw = self.store.get(key.as_str())?.ok_or_else(not_found)?;
        let record = EntityRecord::from_json_str(&raw).map_err(|e| {
            warn!(key = ?key, error = %e, "unreadable entity record");
            not_found()
        })?;
        Entity::from_record_with_key(key.clone(), &record).map_err(|e| {
            warn!(key = ?key, error = %e, "malformed entity record");
            not_found()
        })
    }

    /// Loads the entity stored under an encoded key string.
    ///
    /// # Errors
    ///
    /// `InvalidKey` if `encoded` does not parse, otherwise as
    /// [`Storage::get`].
    pub fn get_encoded(&self, encoded: &str) -> CoreResult<Entity> {
        self.get(&KeyPath::from_encoded(encoded)?)
    }

    /// Returns true if an entity is stored under `key`.
    pub fn contains(&self, key: &KeyPath) -> CoreResult<bool> {
        Ok(self.store.contains(key.as_str())?)
    }

    /// Removes the entity stored under `key`.
    ///
    /// Deleting an absent key is not an error; neither parents nor children
    /// are touched. Returns true if a record was removed.
    pub fn delete(&self, key: &KeyPath) -> CoreResult<bool> {
        let removed = self.store.remove(key.as_str())?;
        debug!(key = ?key, removed, "deleted entity");
        Ok(removed)
    }

    /// Returns the keys of all stored entities, in encoded-string order.
    ///
    /// Counter entries are skipped, as are store keys that do not parse as
    /// entity keys.
    pub fn keys(&self) -> CoreResult<Vec<KeyPath>> {
        let mut keys = Vec::new();
        for raw in self.store.keys()? {
            // Counter names start with '_', which the key codec never emits
            if raw.starts_with('_') {
                continue;
            }
            match KeyPath::from_encoded(&raw) {
                Ok(key) => keys.push(key),
                Err(e) => warn!(raw = %raw, error = %e, "skipping foreign store key"),
            }
        }
        Ok(keys)
    }

    /// Flushes the underlying store.
    pub fn flush(&self) -> CoreResult<()> {
        Ok(self.store.flush()?)
    }
}
