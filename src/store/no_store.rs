use async_trait::async_trait;
use tracing::debug;

use super::KeyValueStore;

/// A no-op store used when persistence is disabled: nothing is ever found,
/// and writes are accepted and dropped.
pub struct NoStore;

impl NoStore {
    pub fn new() -> Self {
        NoStore
    }
}

impl Default for NoStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for NoStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, String> {
        Ok(None)
    }

    async fn set(&self, key: &str, _value: &[u8]) -> Result<(), String> {
        debug!("Session store is disabled; dropping write to '{}'", key);
        Ok(())
    }

    async fn remove(&self, _key: &str) -> Result<(), String> {
        Ok(())
    }

    fn get_name(&self) -> &str {
        "none"
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
