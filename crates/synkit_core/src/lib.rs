//! # synkit Core
//!
//! The client-side data model of synkit:
//!
//! - [`KeyPath`] - hierarchical keys carrying application, namespace and the
//!   full ancestor chain in one opaque, storage-safe string
//! - [`Value`] - typed property values with a `{type, value}` wire form
//! - [`Entity`] - a keyed, versioned property bag
//! - [`Storage`] - entity persistence over a flat key/value store, with
//!   persisted id and RPC-id counters
//!
//! Synchronization with a server lives in `synkit_sync_engine`.
//!
//! ## Example
//!
//! ```rust
//! use synkit_core::{Entity, KeyPath, Storage};
//!
//! let storage = Storage::in_memory();
//!
//! let john = KeyPath::from_path("Person", 42u64, None, None).unwrap();
//! let mut song = Entity::builder("Song").name("imagine").parent(&john).build().unwrap();
//! song.set("year", 1971i64).unwrap();
//!
//! let key = storage.put(&mut song).unwrap();
//! assert_eq!(key.parent().unwrap(), john);
//! assert_eq!(storage.get(&key).unwrap(), song);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entity;
mod error;
mod key;
mod storage;
mod value;

pub use entity::{Entity, EntityBuilder, EntityRecord};
pub use error::{CoreError, CoreResult};
pub use key::{
    DecodedKey, IdOrName, Identity, KeyPath, PathElement, DEFAULT_APPLICATION_ID,
    DEFAULT_NAMESPACE, MAX_NAMESPACE_LEN,
};
pub use storage::{Storage, NEXT_ID_KEY, NEXT_RPC_ID_KEY};
pub use value::{
    classify, tags, Value, ValueList, WireValue, DATETIME_FORMAT, DATETIME_FORMAT_SLASHED,
};

/// Re-exported store types, so callers can build [`Storage`] without a
/// direct dependency on `synkit_storage`.
pub use synkit_storage::{FileStore, FileStoreOptions, InMemoryStore, KeyValueStore};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
