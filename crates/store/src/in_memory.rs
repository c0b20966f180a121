//! In-memory store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use mathtutor_core::error::StoreError;
use mathtutor_core::store::PreferenceStore;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A store that keeps preferences in a map and forgets them on drop.
pub struct InMemoryStore {
    entries: Arc<RwLock<Map<String, Value>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Map::new())),
        }
    }

    /// Pre-populate a store, e.g. with a remembered endpoint for a test.
    pub fn with_entry(self, key: &str, value: Value) -> Self {
        // Fresh store: the lock is uncontended
        if let Ok(mut entries) = self.entries.try_write() {
            entries.insert(key.to_string(), value);
        }
        self
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreferenceStore for InMemoryStore {
    fn name(&self) -> &str { "in_memory" }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}
