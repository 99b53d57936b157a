//! Key/value store trait definition.

use crate::error::StorageResult;

/// A flat, string-keyed local store.
///
/// Stores are **opaque string maps**. They do not interpret keys or values;
/// synkit owns the record format (encoded keys, entity JSON, counters).
///
/// # Invariants
///
/// - `get` returns exactly the value last written under `key` by `put`
/// - `remove` of an absent key is not an error
/// - each `put`/`remove` is atomic with respect to that single key
/// - implementations must be `Send + Sync`; they synchronize internally
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing and ephemeral stores
/// - [`super::FileStore`] - Durable across process restarts
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn put(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`. Returns true if a value was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn remove(&self, key: &str) -> StorageResult<bool>;

    /// Returns all keys currently stored, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Returns true if `key` is present.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Flushes pending writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&self) -> StorageResult<()>;
}
