//! CLI command implementations.

pub mod compact;
pub mod entity;
pub mod key;
pub mod list;
pub mod next_id;

use clap::ValueEnum;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use synkit_core::{FileStore, KeyPath, Storage};

/// Result type shared by all commands.
pub type CommandResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Opens an existing store file.
pub fn open_file_store(path: &Path) -> CommandResult<Arc<FileStore>> {
    if !path.is_file() {
        return Err(format!("No store found at {:?}", path).into());
    }
    Ok(Arc::new(FileStore::open(path)?))
}

/// Opens an existing store file as entity storage.
pub fn open_storage(path: &Path) -> CommandResult<Storage> {
    let store = open_file_store(path)?;
    Ok(Storage::from_shared(store))
}

/// Parses an encoded key argument.
pub fn parse_key(encoded: &str) -> CommandResult<KeyPath> {
    encoded
        .trim()
        .parse::<KeyPath>()
        .map_err(|e| format!("Invalid key {encoded:?}: {e}").into())
}

/// Prints `value` as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CommandResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
