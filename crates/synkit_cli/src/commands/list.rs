//! List command implementation.

use super::{open_storage, print_json, CommandResult, Format};
use serde::Serialize;
use std::path::Path;
use synkit_core::Storage;
use tracing::warn;

/// One line of the listing.
#[derive(Debug, Serialize)]
pub struct EntitySummary {
    /// Encoded key.
    pub key: String,
    /// Readable ancestor path.
    pub path: String,
    /// Namespace of the key.
    pub namespace: String,
    /// Sync version.
    pub version: u64,
    /// Number of properties.
    pub properties: usize,
}

/// Collects summaries of every stored entity, optionally of one kind.
pub fn collect(storage: &Storage, kind: Option<&str>) -> CommandResult<Vec<EntitySummary>> {
    let mut summaries = Vec::new();
    for key in storage.keys()? {
        if kind.is_some_and(|k| k != key.kind()) {
            continue;
        }
        match storage.get(&key) {
            Ok(entity) => summaries.push(EntitySummary {
                key: key.as_str().to_string(),
                path: key.path_string(),
                namespace: key.namespace().to_string(),
                version: entity.version(),
                properties: entity.len(),
            }),
            Err(e) => warn!(key = %key, error = %e, "skipping unreadable entity"),
        }
    }
    summaries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(summaries)
}

/// Runs the list command.
pub fn run(path: &Path, kind: Option<&str>, format: Format) -> CommandResult<()> {
    let storage = open_storage(path)?;
    let summaries = collect(&storage, kind)?;

    match format {
        Format::Json => print_json(&summaries)?,
        Format::Text => {
            println!("{} entities in {:?}", summaries.len(), path);
            for s in &summaries {
                println!(
                    "  {:<32} v{:<4} {:>3} props  [{}] {}",
                    s.path, s.version, s.properties, s.namespace, s.key
                );
            }
        }
    }
    Ok(())
}
