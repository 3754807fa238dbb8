use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A wrapper for the session store configuration:
/// - enabled: if false, nothing is persisted (NoStore) and every start is signed out.
/// - namespace/key: where the session record lives inside the backend.
/// - backend: the actual storage backend, selected by a "type" tag.
#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone)]
pub struct StoreConfig {
    pub enabled: bool,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_key")]
    pub key: String,
    #[serde(flatten)]
    pub backend: Option<StoreBackend>,
}

/// The available key-value backends. We differentiate them via a "type" tag in the YAML.
#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum StoreBackend {
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "file")]
    File(FileStoreConfig),
}

#[derive(Deserialize, Serialize, Debug, JsonSchema, Clone, PartialEq, Eq)]
pub struct FileStoreConfig {
    /// Directory holding one file per stored key. Created on first write.
    pub directory: PathBuf,
}

fn default_namespace() -> String {
    "authsession".to_string()
}

fn default_key() -> String {
    "auth_user".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            enabled: true,
            namespace: default_namespace(),
            key: default_key(),
            backend: Some(StoreBackend::Memory),
        }
    }
}
