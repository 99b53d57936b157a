//! Compact command implementation.

use super::{open_file_store, print_json, CommandResult, Format};
use serde::Serialize;
use std::path::Path;
use synkit_core::FileStore;

/// Compaction statistics.
#[derive(Debug, Serialize)]
pub struct CompactStats {
    /// Log records before compaction.
    pub records_before: u64,
    /// Log records after compaction.
    pub records_after: u64,
    /// Bytes before compaction.
    pub bytes_before: u64,
    /// Bytes after compaction.
    pub bytes_after: u64,
}

/// Compacts `store` and reports what changed.
pub fn compact(store: &FileStore) -> CommandResult<CompactStats> {
    let records_before = store.record_count();
    let bytes_before = std::fs::metadata(store.path())?.len();
    store.compact()?;
    Ok(CompactStats {
        records_before,
        records_after: store.record_count(),
        bytes_before,
        bytes_after: std::fs::metadata(store.path())?.len(),
    })
}

/// Runs the compact command.
pub fn run(path: &Path, format: Format) -> CommandResult<()> {
    let store = open_file_store(path)?;
    let stats = compact(&store)?;

    match format {
        Format::Json => print_json(&stats)?,
        Format::Text => {
            println!("Compacted {:?}", path);
            println!("  Records: {} -> {}", stats.records_before, stats.records_after);
            println!("  Size:    {} -> {} bytes", stats.bytes_before, stats.bytes_after);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use synkit_core::KeyValueStore;

    #[test]
    fn compaction_drops_superseded_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        let store = FileStore::open(&path).unwrap();
        for i in 0..5 {
            store.put("k", &i.to_string()).unwrap();
        }
        store.put("gone", "x").unwrap();
        store.remove("gone").unwrap();

        let stats = compact(&store).unwrap();
        assert!(stats.records_before > stats.records_after);
        assert_eq!(stats.records_after, 1);
        assert!(stats.bytes_after < stats.bytes_before);
        assert_eq!(store.get("k").unwrap().as_deref(), Some("4"));
    }
}
