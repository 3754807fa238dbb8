use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::{file_store::FileStore, memory_store::MemoryStore, no_store::NoStore};
use crate::config::{StoreBackend, StoreConfig};

/// The KeyValueStore trait abstracts durable byte storage (get, set, remove).
///
/// Values are returned exactly as stored; interpreting them (and rejecting
/// bytes that are not a valid record) is up to the caller.
///
/// Implementations must be safe to share between tasks; the session manager is
/// the only component that writes the session key.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, String>;
    /// Overwrites any prior value for `key`.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), String>;
    /// Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), String>;
    fn get_name(&self) -> &str;
    fn is_enabled(&self) -> bool {
        // Real stores persist; NoStore returns false so we can write better debug messages
        true
    }
}

/// Creates a concrete store implementation based on the StoreConfig.
/// If `store.enabled = false`, returns NoStore. Otherwise, picks the specified backend.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>, String> {
    if !config.enabled {
        info!("Session store is disabled. Using NoStore.");
        return Ok(Arc::new(NoStore::new()));
    }

    match &config.backend {
        Some(StoreBackend::Memory) => {
            info!("Using in-memory session store; sessions will not survive a restart.");
            Ok(Arc::new(MemoryStore::new()))
        }
        Some(StoreBackend::File(file_config)) => {
            info!(
                "Using file session store in '{}'",
                file_config.directory.display()
            );
            Ok(Arc::new(FileStore::new(file_config)))
        }
        None => {
            error!("Store is enabled, but no backend config is provided!");
            Err("Store is enabled, but no backend config is provided".to_string())
        }
    }
}
