//! # synkit Storage
//!
//! Local persistent key/value stores for synkit.
//!
//! This crate provides the lowest-level storage abstraction: a flat map of
//! string keys to string values. Stores are **opaque** - they do not know
//! about encoded keys, entity JSON or counters.
//!
//! ## Design Principles
//!
//! - Stores are simple string maps (get, put, remove, keys)
//! - Single-key writes are atomic; there are no multi-key transactions
//! - Must be `Send + Sync`; stores lock internally
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral storage
//! - [`FileStore`] - Append-only log file, durable across restarts
//!
//! ## Example
//!
//! ```rust
//! use synkit_storage::{InMemoryStore, KeyValueStore};
//!
//! let store = InMemoryStore::new();
//! store.put("hello", "world").unwrap();
//! assert_eq!(store.get("hello").unwrap().as_deref(), Some("world"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::KeyValueStore;
pub use error::{StorageError, StorageResult};
pub use file::{FileStore, FileStoreOptions};
pub use memory::InMemoryStore;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone)]
    enum Op {
        Put(String, String),
        Remove(String),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        let key = "[a-c]{1,2}";
        prop_oneof![
            (key, ".{0,8}").prop_map(|(k, v)| Op::Put(k, v)),
            key.prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn file_store_matches_model_after_reopen(ops in proptest::collection::vec(op_strategy(), 0..40)) {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("store.log");
            let mut model = BTreeMap::new();

            {
                let store = FileStore::open_with(&path, FileStoreOptions::new().sync_on_write(false)).unwrap();
                for op in &ops {
                    match op {
                        Op::Put(k, v) => {
                            store.put(k, v).unwrap();
                            model.insert(k.clone(), v.clone());
                        }
                        Op::Remove(k) => {
                            prop_assert_eq!(store.remove(k).unwrap(), model.remove(k).is_some());
                        }
                    }
                }
                store.flush().unwrap();
            }

            let store = FileStore::open(&path).unwrap();
            prop_assert_eq!(store.keys().unwrap(), model.keys().cloned().collect::<Vec<_>>());
            for (k, v) in &model {
                let got = store.get(k).unwrap();
                prop_assert_eq!(got.as_deref(), Some(v.as_str()));
            }
        }
    }
}
