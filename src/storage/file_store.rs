use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::models::error::{QueueError, Result};
use super::KeyValueStore;

/// One file per key under `dir`. Writes go to a temp file that is then
/// renamed over the target.
///
/// File names keep ASCII alphanumerics and `-`; any other byte becomes `_`
/// followed by two hex digits, so distinct keys never share a file.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| {
            QueueError::Storage(format!("failed to create store directory '{}': {}", dir.display(), e))
        })?;
        debug!(dir = %dir.display(), "opened file store");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len());
        for b in key.bytes() {
            if b.is_ascii_alphanumeric() || b == b'-' {
                name.push(b as char);
            } else {
                name.push_str(&format!("_{:02x}", b));
            }
        }
        self.dir.join(format!("{}.json", name))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(QueueError::Storage(format!("failed to read '{}': {}", path.display(), e))),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");

        fs::write(&tmp, value.as_bytes()).await.map_err(|e| {
            QueueError::Storage(format!("failed to write temp file '{}': {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).await.map_err(|e| {
            QueueError::Storage(format!(
                "failed to rename temp file '{}' -> '{}': {}",
                tmp.display(),
                path.display(),
                e
            ))
        })?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(QueueError::Storage(format!("failed to remove '{}': {}", path.display(), e))),
        }
    }
}
