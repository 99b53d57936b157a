//! Next-id command implementation.

use super::{open_storage, print_json, CommandResult, Format};
use serde_json::json;
use std::path::Path;
use synkit_core::{Storage, NEXT_ID_KEY, NEXT_RPC_ID_KEY};

/// Allocates one id from the entity or RPC counter and persists it.
pub fn allocate(storage: &Storage, rpc: bool) -> CommandResult<u64> {
    let id = if rpc {
        storage.next_rpc_id()?
    } else {
        storage.next_id()?
    };
    storage.flush()?;
    Ok(id)
}

/// Runs the next-id command.
pub fn run(path: &Path, rpc: bool, format: Format) -> CommandResult<()> {
    let storage = open_storage(path)?;
    let id = allocate(&storage, rpc)?;
    let counter = if rpc { NEXT_RPC_ID_KEY } else { NEXT_ID_KEY };

    match format {
        Format::Json => print_json(&json!({ "counter": counter, "id": id }))?,
        Format::Text => println!("{id}"),
    }
    Ok(())
}
