use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("writing snapshot '{key}' would bring the store to {size} bytes, over the {limit} byte quota")]
    QuotaExceeded { key: String, size: usize, limit: usize },

    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
}

/// String key-value persistence for last-known snapshots.
pub trait SnapshotStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str);
}

/// The quota bounds the whole store: `others` is what every other key holds.
fn check_quota(key: &str, value: &str, others: usize, limit: Option<usize>) -> Result<(), StorageError> {
    let size = others + value.len();
    match limit {
        Some(limit) if size > limit => Err(StorageError::QuotaExceeded {
            key: key.to_string(),
            size,
            limit,
        }),
        _ => Ok(()),
    }
}

/// Lives only as long as the running application (one visit).
#[derive(Default)]
pub struct MemorySnapshotStore {
    entries: DashMap<String, String>,
    quota: Option<usize>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: DashMap::new(),
            quota: Some(quota),
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.quota.is_some() {
            let others: usize = self
                .entries
                .iter()
                .filter(|entry| entry.key() != key)
                .map(|entry| entry.value().len())
                .sum();
            check_quota(key, value, others, self.quota)?;
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

/// Survives restarts: one file per key under a directory scoped to the app origin.
pub struct FileSnapshotStore {
    dir: PathBuf,
    quota: Option<usize>,
}

impl FileSnapshotStore {
    pub fn open(root: impl Into<PathBuf>, origin: &str, quota: Option<usize>) -> Result<Self, StorageError> {
        let dir = root.into().join(slug(origin));
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, quota })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", slug(key)))
    }

    fn stored_bytes(&self, except: &Path) -> Result<usize, StorageError> {
        let mut total = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path == except || path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            total += fs::metadata(&path)?.len() as usize;
        }
        Ok(total)
    }
}

fn slug(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

impl SnapshotStore for FileSnapshotStore {
    fn get(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Some(contents),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                warn!(key, error = %err, "failed to read snapshot");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if self.quota.is_some() {
            check_quota(key, value, self.stored_bytes(&path)?, self.quota)?;
        }
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) {
        if let Err(err) = fs::remove_file(self.path_for(key)) {
            if err.kind() != ErrorKind::NotFound {
                warn!(key, error = %err, "failed to remove snapshot");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore, StorageError};

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::open(dir.path(), "http://localhost:4200", None).unwrap();
        store.set("vantage_locations_cache", "[1,2,3]").unwrap();
        drop(store);

        let reopened = FileSnapshotStore::open(dir.path(), "http://localhost:4200", None).unwrap();
        assert_eq!(reopened.get("vantage_locations_cache").as_deref(), Some("[1,2,3]"));

        let other_origin = FileSnapshotStore::open(dir.path(), "https://vantage.example", None).unwrap();
        assert!(other_origin.get("vantage_locations_cache").is_none());
    }

    #[test]
    fn quota_rejects_oversized_values() {
        let store = MemorySnapshotStore::with_quota(4);
        store.set("small", "[]").unwrap();

        let err = store.set("big", "[1,2,3]").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { size: 9, limit: 4, .. }));
        assert!(store.get("big").is_none());
    }

    #[test]
    fn quota_counts_every_key_in_the_store() {
        let store = MemorySnapshotStore::with_quota(10);
        store.set("a", "[1,2]").unwrap();
        store.set("a", "[1,2,3]").unwrap();

        let err = store.set("b", "[4,5]").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { size: 12, limit: 10, .. }));

        store.remove("a");
        store.set("b", "[4,5]").unwrap();
    }

    #[test]
    fn file_store_quota_spans_all_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::open(dir.path(), "origin", Some(10)).unwrap();
        store.set("vantage_locations_cache", "[1,2,3]").unwrap();
        store.set("vantage_locations_cache", "[1,2,3,4]").unwrap();

        let err = store.set("dismissed_notifications", "[\"x\"]").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { size: 14, limit: 10, .. }));
        assert!(store.get("dismissed_notifications").is_none());
    }

    #[test]
    fn remove_missing_key_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::open(dir.path(), "origin", Some(16)).unwrap();
        store.remove("never-written");
        assert!(store.get("never-written").is_none());
    }
}
