use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::KeyValueStore;
use crate::config::FileStoreConfig;

/// Stores each key as a file inside a directory.
///
/// Writes land in a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves either the old value or the new one.
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    pub fn new(config: &FileStoreConfig) -> Self {
        Self {
            directory: config.directory.clone(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(file_name(key))
    }
}

/// Map a key onto a single file name inside the store directory.
///
/// ASCII alphanumerics, `-` and `_` pass through, as does `.` anywhere but the
/// first position; every other byte (including `%` itself) is written as
/// `%XX`. Distinct keys therefore never share a file, and no key can name `.`,
/// `..` or a hidden file.
fn file_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for (i, byte) in key.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric()
            || byte == b'-'
            || byte == b'_'
            || (byte == b'.' && i > 0);
        if keep {
            name.push(byte as char);
        } else {
            name.push_str(&format!("%{:02X}", byte));
        }
    }
    if name.is_empty() {
        // The empty key still needs a real file name.
        name.push('%');
    }
    name
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, String> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(format!("Failed to read '{}': {}", path.display(), e)),
        }
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), String> {
        fs::create_dir_all(&self.directory).await.map_err(|e| {
            format!(
                "Failed to create store directory '{}': {}",
                self.directory.display(),
                e
            )
        })?;

        let path = self.path_for(key);
        let tmp_path = self.directory.join(format!(".{}.tmp", file_name(key)));
        fs::write(&tmp_path, value)
            .await
            .map_err(|e| format!("Failed to write '{}': {}", tmp_path.display(), e))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| format!("Failed to move record into '{}': {}", path.display(), e))?;

        debug!("Wrote {} bytes to '{}'", value.len(), path.display());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), String> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(format!("Failed to remove '{}': {}", path.display(), e)),
        }
    }

    fn get_name(&self) -> &str {
        "file"
    }
}
