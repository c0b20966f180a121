//! File-based preference store — one JSON object on disk.
//!
//! The whole object is loaded into memory on creation and flushed to disk on
//! every write. This gives fast reads with durable writes.
//!
//! Storage location: `~/.mathtutor/preferences.json` by default.

use async_trait::async_trait;
use mathtutor_core::error::StoreError;
use mathtutor_core::store::PreferenceStore;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A file-backed key-value store.
pub struct FileStore {
    path: PathBuf,
    entries: Arc<RwLock<Map<String, Value>>>,
}

impl FileStore {
    /// Open the store at `path`.
    ///
    /// If the file exists, entries are loaded from it.
    /// If the file does not exist, starts empty (file created on first write).
    pub fn new(path: PathBuf) -> Self {
        let entries = Self::load_from_disk(&path);
        debug!(path = %path.display(), keys = entries.len(), "Preference store loaded");
        Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Map<String, Value> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Map::new(), // File doesn't exist yet — start empty
        };

        if content.trim().is_empty() {
            return Map::new();
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!(path = %path.display(), "Preference file is not a JSON object, starting empty");
                Map::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupted preference file, starting empty");
                Map::new()
            }
        }
    }

    /// Write the full map to disk via a sibling temp file and rename.
    ///
    /// Callers hold the entries write lock for the whole flush so writers
    /// never share the temp file.
    async fn flush(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Storage(format!("Failed to serialize preferences: {e}")))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Storage(format!("Failed to create preference directory: {e}"))
            })?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content.as_bytes())
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to write preference file: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to replace preference file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        self.flush(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathtutor_core::store::{REMEMBERED_ENDPOINT_KEY, TOPIC_STATS_KEY};
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[tokio::test]
    async fn set_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");

        let store = FileStore::new(path.clone());
        store
            .set(REMEMBERED_ENDPOINT_KEY, Value::String("https://b.test".into()))
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("https://b.test"));

        let reopened = FileStore::new(path);
        assert_eq!(
            reopened.get(REMEMBERED_ENDPOINT_KEY).await.unwrap(),
            Some(Value::String("https://b.test".into()))
        );
    }

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("prefs.json");
        let store = FileStore::new(path.clone());
        store.set(TOPIC_STATS_KEY, serde_json::json!({})).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writes_all_land() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        let store = Arc::new(FileStore::new(path.clone()));

        let writers: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.set(&format!("k{i}"), Value::from(i)).await })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let reopened = FileStore::new(path);
        for i in 0..16 {
            assert_eq!(reopened.get(&format!("k{i}")).await.unwrap(), Some(Value::from(i)));
        }
        assert!(!dir.path().join("prefs.json.tmp").exists());
    }

    #[tokio::test]
    async fn handles_missing_file_gracefully() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("absent.json"));
        assert!(store.get(TOPIC_STATS_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn handles_corrupted_file() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "{{ this is not json").unwrap();
        let store = FileStore::new(tmp.path().to_path_buf());
        assert!(store.get("anything").await.unwrap().is_none());

        // A write replaces the corrupted content with a valid object
        store.set("k", Value::from(1)).await.unwrap();
        let reopened = FileStore::new(tmp.path().to_path_buf());
        assert_eq!(reopened.get("k").await.unwrap(), Some(Value::from(1)));
    }
}
