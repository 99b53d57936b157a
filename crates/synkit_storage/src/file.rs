//! Append-only log file store for persistent storage.

use crate::backend::KeyValueStore;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Options for opening a [`FileStore`].
#[derive(Debug, Clone)]
pub struct FileStoreOptions {
    /// Whether to `fsync` after every appended record (safer but slower).
    pub sync_on_write: bool,
    /// Whether to create missing parent directories on open.
    pub create_dirs: bool,
}

impl Default for FileStoreOptions {
    fn default() -> Self {
        Self {
            sync_on_write: true,
            create_dirs: true,
        }
    }
}

impl FileStoreOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to sync after every write.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets whether to create parent directories.
    #[must_use]
    pub const fn create_dirs(mut self, value: bool) -> Self {
        self.create_dirs = value;
        self
    }
}

/// One line of the log.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum LogRecord {
    Put { key: String, value: String },
    Remove { key: String },
}

#[derive(Debug)]
struct Inner {
    file: File,
    entries: BTreeMap<String, String>,
    records: u64,
    /// Length of the log up to the last complete record.
    len: u64,
    /// Set when a partial record could not be rolled back.
    failed: Option<String>,
}

/// A file-backed key/value store.
///
/// Every mutation appends one JSON line (`put` or `remove`) to the log, and
/// the live map is rebuilt by replaying the log on open. Data survives
/// process restarts.
///
/// # Durability
///
/// - a single `put`/`remove` is one `write_all` of one line
/// - with `sync_on_write`, the line is `fsync`ed before the call returns
/// - an unterminated final line (interrupted write) is discarded on open
/// - a failed write is truncated back to the last complete line; if that
///   fails, further writes are refused until [`FileStore::compact`]
///
/// # Example
///
/// ```no_run
/// use synkit_storage::{FileStore, KeyValueStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("local.log")).unwrap();
/// store.put("_NextId", "2").unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    options: FileStoreOptions,
    inner: RwLock<Inner>,
}

impl FileStore {
    /// Opens or creates a store at the given path with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its log is corrupted.
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::open_with(path, FileStoreOptions::default())
    }

    /// Opens or creates a store at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created, the file cannot be
    /// opened, or a complete log line fails to parse.
    pub fn open_with(path: &Path, options: FileStoreOptions) -> StorageResult<Self> {
        if options.create_dirs {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;

        let (entries, records, valid_len) = replay(&contents)?;
        if valid_len < contents.len() as u64 {
            warn!(
                path = %path.display(),
                discarded = contents.len() as u64 - valid_len,
                "discarding unterminated record at end of log"
            );
            file.set_len(valid_len)?;
        }

        debug!(path = %path.display(), records, live = entries.len(), "opened file store");

        Ok(Self {
            path: path.to_path_buf(),
            options,
            inner: RwLock::new(Inner {
                file,
                entries,
                records,
                len: valid_len,
                failed: None,
            }),
        })
    }

    /// Returns the path to the underlying log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of records in the log, including superseded ones.
    #[must_use]
    pub fn record_count(&self) -> u64 {
        self.inner.read().records
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Returns true if the store holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Rewrites the log so it contains only live entries.
    ///
    /// The compacted log is written to a sibling file and renamed over the
    /// original, so a crash mid-compaction leaves the old log intact.
    ///
    /// # Errors
    ///
    /// Returns an error if the new log cannot be written or renamed.
    pub fn compact(&self) -> StorageResult<()> {
        let mut inner = self.inner.write();
        let tmp_path = self.path.with_extension("compact");

        {
            let mut out = File::create(&tmp_path)?;
            for (key, value) in &inner.entries {
                let line = encode_record(&LogRecord::Put {
                    key: key.clone(),
                    value: value.clone(),
                })?;
                out.write_all(&line)?;
            }
            out.sync_all()?;
        }

        fs::rename(&tmp_path, &self.path)?;
        inner.file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)?;

        let before = inner.records;
        inner.records = inner.entries.len() as u64;
        inner.len = inner.file.metadata()?.len();
        inner.failed = None;
        debug!(path = %self.path.display(), before, after = inner.records, "compacted file store");
        Ok(())
    }

    fn append(&self, inner: &mut Inner, record: &LogRecord) -> StorageResult<()> {
        if let Some(reason) = &inner.failed {
            return Err(StorageError::Corrupted(format!(
                "log has an unrecoverable partial record ({reason}); compact to recover"
            )));
        }

        let line = encode_record(record)?;
        match append_line(&mut inner.file, inner.len, &line) {
            Ok(len) => inner.len = len,
            Err(e) => {
                if let StorageError::Corrupted(reason) = &e {
                    warn!(path = %self.path.display(), error = %reason, "file store disabled");
                    inner.failed = Some(reason.clone());
                }
                return Err(e);
            }
        }
        if self.options.sync_on_write {
            inner.file.sync_data()?;
        }
        inner.records += 1;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.inner.read().entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut inner = self.inner.write();
        self.append(
            &mut inner,
            &LogRecord::Put {
                key: key.to_string(),
                value: value.to_string(),
            },
        )?;
        inner.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        let mut inner = self.inner.write();
        if !inner.entries.contains_key(key) {
            return Ok(false);
        }
        self.append(
            &mut inner,
            &LogRecord::Remove {
                key: key.to_string(),
            },
        )?;
        inner.entries.remove(key);
        Ok(true)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.inner.read().entries.keys().cloned().collect())
    }

    fn flush(&self) -> StorageResult<()> {
        let mut inner = self.inner.write();
        inner.file.flush()?;
        inner.file.sync_data()?;
        Ok(())
    }
}

/// Destination of log lines that can be cut back after a failed write.
trait LogSink: Write {
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl LogSink for File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Appends `line` to a log of length `len` and returns the new length.
///
/// A failed write is cut back to `len` so the next record starts on a
/// fresh line. If that fails too the error is `Corrupted`.
fn append_line<S: LogSink>(sink: &mut S, len: u64, line: &[u8]) -> StorageResult<u64> {
    if let Err(write_err) = sink.write_all(line) {
        return match sink.truncate(len) {
            Ok(()) => Err(write_err.into()),
            Err(truncate_err) => Err(StorageError::Corrupted(format!(
                "partial record left at offset {len}: {write_err}; rollback failed: {truncate_err}"
            ))),
        };
    }
    Ok(len + line.len() as u64)
}

fn encode_record(record: &LogRecord) -> StorageResult<Vec<u8>> {
    let mut line = serde_json::to_vec(record).map_err(|e| StorageError::Encoding(e.to_string()))?;
    line.push(b'\n');
    Ok(line)
}

/// Replays the log, returning the live map, the record count and the length
/// of the valid prefix.
fn replay(contents: &[u8]) -> StorageResult<(BTreeMap<String, String>, u64, u64)> {
    let mut entries = BTreeMap::new();
    let mut records = 0u64;
    let mut offset = 0usize;

    while offset < contents.len() {
        let rest = &contents[offset..];
        let Some(newline) = rest.iter().position(|b| *b == b'\n') else {
            break;
        };

        let record: LogRecord = serde_json::from_slice(&rest[..newline]).map_err(|e| {
            StorageError::Corrupted(format!("invalid log record at offset {offset}: {e}"))
        })?;

        match record {
            LogRecord::Put { key, value } => {
                entries.insert(key, value);
            }
            LogRecord::Remove { key } => {
                entries.remove(&key);
            }
        }

        records += 1;
        offset += newline + 1;
    }

    Ok((entries, records, offset as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_put_then_get() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(&dir.path().join("store.log")).unwrap();

        store.put("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.record_count(), 1);
    }

    #[test]
    fn file_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.log");

        {
            let store = FileStore::open(&path).unwrap();
            store.put("a", "1").unwrap();
            store.put("b", "2").unwrap();
            store.put("a", "3").unwrap();
            store.remove("b").unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("3"));
        assert_eq!(store.get("b").unwrap(), None);
        assert_eq!(store.len(), 1);
        assert_eq!(store.record_count(), 4);
    }

    #[test]
    fn file_remove_absent_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(&dir.path().join("store.log")).unwrap();

        assert!(!store.remove("missing").unwrap());
        assert_eq!(store.record_count(), 0);
    }

    #[test]
    fn file_values_with_newlines_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.log");

        {
            let store = FileStore::open(&path).unwrap();
            store.put("k", "line one\nline two").unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn file_discards_torn_tail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.log");

        {
            let store = FileStore::open(&path).unwrap();
            store.put("a", "1").unwrap();
        }

        // Simulate a write interrupted before its newline
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(br#"{"op":"put","key":"b","va"#).unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("b").unwrap(), None);

        // The store keeps working after recovery
        store.put("c", "3").unwrap();
        drop(store);
        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("c").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn file_rejects_corrupted_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.log");
        fs::write(&path, b"garbage\n").unwrap();

        let result = FileStore::open(&path);
        assert!(matches!(result, Err(StorageError::Corrupted(_))));
    }

    #[test]
    fn file_compact_keeps_live_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.log");

        let store = FileStore::open(&path).unwrap();
        for i in 0..10 {
            store.put("counter", &i.to_string()).unwrap();
        }
        store.put("other", "x").unwrap();
        store.remove("other").unwrap();
        assert_eq!(store.record_count(), 12);

        store.compact().unwrap();
        assert_eq!(store.record_count(), 1);
        store.put("after", "compact").unwrap();
        drop(store);

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("counter").unwrap().as_deref(), Some("9"));
        assert_eq!(store.get("after").unwrap().as_deref(), Some("compact"));
        assert_eq!(store.record_count(), 2);
    }

    #[test]
    fn file_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("store.log");

        let store = FileStore::open(&path).unwrap();
        store.put("a", "1").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn file_without_sync_on_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.log");
        let options = FileStoreOptions::new().sync_on_write(false);

        let store = FileStore::open_with(&path, options).unwrap();
        store.put("a", "1").unwrap();
        store.flush().unwrap();
        drop(store);

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
    }

    /// Accepts `budget` bytes, then fails every write.
    struct ShortSink {
        bytes: Vec<u8>,
        budget: usize,
        can_truncate: bool,
    }

    impl Write for ShortSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::other("disk full"));
            }
            let n = buf.len().min(self.budget);
            self.bytes.extend_from_slice(&buf[..n]);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogSink for ShortSink {
        fn truncate(&mut self, len: u64) -> io::Result<()> {
            if !self.can_truncate {
                return Err(io::Error::other("read-only"));
            }
            self.bytes.truncate(len as usize);
            Ok(())
        }
    }

    fn put_line(key: &str, value: &str) -> Vec<u8> {
        encode_record(&LogRecord::Put {
            key: key.to_string(),
            value: value.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn partial_write_is_rolled_back() {
        let first = put_line("a", "1");
        let mut sink = ShortSink {
            bytes: first.clone(),
            budget: 5,
            can_truncate: true,
        };
        let len = first.len() as u64;

        let err = append_line(&mut sink, len, &put_line("b", "2")).unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
        assert_eq!(sink.bytes, first);

        sink.budget = usize::MAX;
        let len = append_line(&mut sink, len, &put_line("c", "3")).unwrap();
        assert_eq!(len, sink.bytes.len() as u64);

        let (entries, records, valid_len) = replay(&sink.bytes).unwrap();
        assert_eq!(records, 2);
        assert_eq!(valid_len, len);
        assert_eq!(entries.get("c").map(String::as_str), Some("3"));
        assert!(!entries.contains_key("b"));
    }

    #[test]
    fn failed_rollback_is_corruption() {
        let mut sink = ShortSink {
            bytes: Vec::new(),
            budget: 3,
            can_truncate: false,
        };
        let err = append_line(&mut sink, 0, &put_line("a", "1")).unwrap_err();
        assert!(matches!(err, StorageError::Corrupted(_)));
    }

    #[test]
    fn fragment_before_a_record_is_corruption() {
        let mut log = b"{\"op\":\"put\",\"ke".to_vec();
        log.extend(put_line("a", "1"));
        assert!(matches!(replay(&log), Err(StorageError::Corrupted(_))));
    }
}
