use std::sync::Arc;

use tracing::debug;

use super::KeyValueStore;
use crate::config::StoreConfig;
use crate::models::PersistedRecord;

/// The persisted session: one well-known key inside a scoped key-value store.
///
/// Only the session manager holds one of these for writing.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
}

impl SessionStore {
    /// The stored key is `<namespace>.<key>`, so several applications can share
    /// one backend.
    pub fn new(backend: Arc<dyn KeyValueStore>, namespace: &str, key: &str) -> Self {
        let key = if namespace.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", namespace, key)
        };
        Self { backend, key }
    }

    pub fn from_config(backend: Arc<dyn KeyValueStore>, config: &StoreConfig) -> Self {
        Self::new(backend, &config.namespace, &config.key)
    }

    /// The fully scoped key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    /// The raw stored bytes, or `None` when nothing is stored.
    pub async fn read(&self) -> Result<Option<Vec<u8>>, String> {
        debug!(
            "Reading session record '{}' from {} store",
            self.key,
            self.backend.get_name()
        );
        self.backend.get(&self.key).await
    }

    pub async fn write(&self, record: &PersistedRecord) -> Result<(), String> {
        let encoded = record.encode()?;
        debug!(
            "Writing session record '{}' to {} store",
            self.key,
            self.backend.get_name()
        );
        self.backend.set(&self.key, encoded.as_bytes()).await
    }

    pub async fn clear(&self) -> Result<(), String> {
        debug!(
            "Clearing session record '{}' from {} store",
            self.key,
            self.backend.get_name()
        );
        self.backend.remove(&self.key).await
    }
}
