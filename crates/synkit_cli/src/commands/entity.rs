//! Single-entity commands: get, delete, digest.

use super::{open_storage, parse_key, print_json, CommandResult, Format};
use serde_json::json;
use std::path::Path;
use synkit_core::{Entity, Storage};

/// Runs the get command.
pub fn get(path: &Path, encoded: &str, format: Format) -> CommandResult<()> {
    let storage = open_storage(path)?;
    let key = parse_key(encoded)?;
    let entity = storage.get(&key)?;

    match format {
        Format::Json => print_json(&entity.to_json()?)?,
        Format::Text => print!("{}", describe(&entity)?),
    }
    Ok(())
}

/// Renders an entity as indented text.
pub fn describe(entity: &Entity) -> CommandResult<String> {
    let key = entity.key();
    let mut out = format!(
        "{} (version {})\n  application: {}\n  namespace:   {}\n",
        key.path_string(),
        entity.version(),
        key.application(),
        key.namespace()
    );
    for (name, value) in entity.properties() {
        let wire = value.to_wire();
        out.push_str(&format!(
            "  {name} [{}] = {}\n",
            wire.type_tag,
            serde_json::to_string(&wire.value)?
        ));
    }
    Ok(out)
}

/// Runs the delete command.
pub fn delete(path: &Path, encoded: &str, format: Format) -> CommandResult<()> {
    let storage = open_storage(path)?;
    let key = parse_key(encoded)?;
    let deleted = remove(&storage, &key)?;

    match format {
        Format::Json => print_json(&json!({ "key": key.as_str(), "deleted": deleted }))?,
        Format::Text if deleted => println!("Deleted {}", key.path_string()),
        Format::Text => println!("Not found: {}", key.path_string()),
    }
    Ok(())
}

fn remove(storage: &Storage, key: &synkit_core::KeyPath) -> CommandResult<bool> {
    let deleted = storage.delete(key)?;
    storage.flush()?;
    Ok(deleted)
}

/// Runs the digest command.
pub fn digest(path: &Path, encoded: &str, format: Format) -> CommandResult<()> {
    let storage = open_storage(path)?;
    let key = parse_key(encoded)?;
    let digest = storage.get(&key)?.content_digest()?;

    match format {
        Format::Json => print_json(&json!({ "key": key.as_str(), "digest": digest }))?,
        Format::Text => println!("{digest}"),
    }
    Ok(())
}
