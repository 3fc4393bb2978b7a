use std::path::PathBuf;

use async_trait::async_trait;

use super::{
    fetch_url_or_path, is_remote_url, resolve_local_path, ObjectStorage, StorageError,
    PUBLIC_PREFIX,
};

/// Filesystem store rooted at the public assets directory.
///
/// Stored blobs are referenced by `/uploads/{key}`, the URL the HTTP layer
/// serves them at.
pub struct LocalStorage {
    assets_root: PathBuf,
    http_client: reqwest::Client,
}

impl LocalStorage {
    pub fn new(assets_root: PathBuf, http_client: reqwest::Client) -> Self {
        Self {
            assets_root,
            http_client,
        }
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn store(
        &self,
        key: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<String, StorageError> {
        let path = resolve_local_path(&self.assets_root, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());

        Ok(format!("{}/{}", PUBLIC_PREFIX, key.trim_start_matches('/')))
    }

    async fn fetch(&self, url_or_key: &str) -> Result<Vec<u8>, StorageError> {
        fetch_url_or_path(&self.http_client, &self.assets_root, url_or_key).await
    }

    async fn delete(&self, url_or_key: &str) -> Result<(), StorageError> {
        if is_remote_url(url_or_key) {
            return Err(StorageError::InvalidKey(url_or_key.to_string()));
        }
        let path = resolve_local_path(&self.assets_root, url_or_key)?;
        tokio::fs::remove_file(&path).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
