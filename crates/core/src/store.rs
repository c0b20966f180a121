//! Preference store — durable key-value storage that survives restarts.
//!
//! The tutor persists three things, each under a fixed key:
//! - the API credential
//! - the last endpoint that answered successfully
//! - the cross-session topic statistics
//!
//! Values are JSON so any backend that can hold a string can implement the port.

use crate::error::StoreError;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Key holding the API credential string.
pub const CREDENTIAL_KEY: &str = "api_key";

/// Key holding the last endpoint URL that answered successfully.
pub const REMEMBERED_ENDPOINT_KEY: &str = "working_endpoint";

/// Key holding the topic statistics map.
pub const TOPIC_STATS_KEY: &str = "topic_stats";

/// The core PreferenceStore trait.
///
/// Implementations: JSON file, in-memory (for testing).
/// Writes are last-write-wins; no transactional guarantee is provided.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// The backend name (e.g., "file", "in_memory").
    fn name(&self) -> &str;

    /// Read a value. Absence is `Ok(None)`, not an error.
    async fn get(&self, key: &str) -> std::result::Result<Option<serde_json::Value>, StoreError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: serde_json::Value) -> std::result::Result<(), StoreError>;
}

/// Read and deserialize a typed value.
pub async fn load<T: DeserializeOwned>(
    store: &dyn PreferenceStore,
    key: &str,
) -> std::result::Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StoreError::Serialization {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// Serialize and write a typed value.
pub async fn save<T: Serialize + ?Sized>(
    store: &dyn PreferenceStore,
    key: &str,
    value: &T,
) -> std::result::Result<(), StoreError> {
    let value = serde_json::to_value(value).map_err(|e| StoreError::Serialization {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.set(key, value).await
}
