//! Durable key-value storage for the capture session.
//!
//! The buffer, sync queue, and navigation position are persisted
//! through this port on every change, so a restart or navigation never
//! loses committed entries. Production uses [`FileStore`] (one JSON
//! file per key under a data directory); [`MemoryStore`] backs tests
//! and the degraded direct-network-only mode used when no durable
//! location is available.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

/// Durable storage port for capture-session state.
pub trait DurableStore: Send + Sync {
    /// Returns the stored value, or `None` when the key has never been
    /// written.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a value durably before returning.
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Errors from durable store operations.
#[derive(Debug)]
pub enum StoreError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::IoError(_, e) => Some(e),
        }
    }
}

/// File-backed store: one `<key>.json` file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", key))
    }

    /// Lists stored keys with the given prefix. Used to find events
    /// that still have queued mutations.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys = Vec::new();
        let entries = match fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(_) => return keys,
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(stem) = name.strip_suffix(".json") {
                if stem.starts_with(prefix) {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        keys
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::IoError(path, e)),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StoreError::IoError(self.data_dir.clone(), e))?;
        let path = self.path(key);
        fs::write(&path, value).map_err(|e| StoreError::IoError(path, e))
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::IoError(path, e)),
        }
    }
}

/// In-memory store. No durability: state lives only as long as the
/// process, which is exactly the degraded mode the session falls back
/// to when durable storage cannot be opened.
#[derive(Debug, Default)]
pub struct MemoryStore {
    cells: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.cells.lock().unwrap().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.cells
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.cells.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        (store, temp_dir)
    }

    #[test]
    fn test_get_missing_returns_none() {
        let (store, _temp) = file_store();
        assert!(store.get("absent").unwrap().is_none());
    }

    #[test]
    fn test_put_get_roundtrip() {
        let (store, _temp) = file_store();
        store.put("scores-abc", "{\"a\":1}").unwrap();
        assert_eq!(store.get("scores-abc").unwrap().as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_put_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested").join("capture");
        let store = FileStore::new(&nested);
        store.put("k", "v").unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (store, _temp) = file_store();
        store.put("k", "v").unwrap();
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_keys_with_prefix() {
        let (store, _temp) = file_store();
        store.put("pending-e1", "[]").unwrap();
        store.put("pending-e2", "[]").unwrap();
        store.put("scores-e1", "{}").unwrap();
        let keys = store.keys_with_prefix("pending-");
        assert_eq!(keys, vec!["pending-e1", "pending-e2"]);
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.put("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }
}
