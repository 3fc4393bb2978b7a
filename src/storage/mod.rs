//! Blob storage for template canvases and report assets.
//!
//! Two backends share the [`ObjectStorage`] capability:
//! - `supabase` - Supabase Storage bucket, returns public HTTPS URLs
//! - `local` - files under the public assets root, returns relative paths
//!
//! The backend is chosen once at startup by [`from_config`].

mod local;
mod supabase;

pub use local::LocalStorage;
pub use supabase::{SupabaseConfig, SupabaseStorage};

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{AppConfig, StorageBackendKind};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
    #[error("HTTP request to storage failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("storage responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage backend is not configured: {0}")]
    NotConfigured(String),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Persist `bytes` under `key` and return the URL or path to reference it by.
    async fn store(&self, key: &str, bytes: &[u8], content_type: &str)
        -> Result<String, StorageError>;

    /// Read a blob back. Accepts either an absolute URL or a key/relative path.
    async fn fetch(&self, url_or_key: &str) -> Result<Vec<u8>, StorageError>;

    async fn delete(&self, url_or_key: &str) -> Result<(), StorageError>;

    fn backend_name(&self) -> &'static str;
}

/// Build the storage backend selected by the deployment configuration.
pub fn from_config(
    config: &AppConfig,
    http_client: reqwest::Client,
) -> Result<Arc<dyn ObjectStorage>, StorageError> {
    match config.storage_backend {
        StorageBackendKind::Supabase => {
            let supabase = config.supabase.clone().ok_or_else(|| {
                StorageError::NotConfigured(
                    "STORAGE_BACKEND=supabase requires SUPABASE_URL and SUPABASE_SERVICE_KEY"
                        .to_string(),
                )
            })?;
            log::info!(
                "Using Supabase storage backend (bucket '{}')",
                supabase.bucket_name
            );
            Ok(Arc::new(SupabaseStorage::new(
                supabase,
                http_client,
                config.assets_root.clone(),
            )))
        }
        StorageBackendKind::Local => {
            log::info!(
                "Using local filesystem storage backend at {}",
                config.assets_root.display()
            );
            Ok(Arc::new(LocalStorage::new(
                config.assets_root.clone(),
                http_client,
            )))
        }
    }
}

pub(crate) fn is_remote_url(url_or_key: &str) -> bool {
    url_or_key.starts_with("https://") || url_or_key.starts_with("http://")
}

/// URL path under which the local assets root is served.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Resolve a storage key, `/relative/path` or `/uploads/...` location below
/// `root`, refusing anything that would escape it.
pub(crate) fn resolve_local_path(root: &Path, url_or_key: &str) -> Result<PathBuf, StorageError> {
    let relative = url_or_key
        .strip_prefix(PUBLIC_PREFIX)
        .filter(|rest| rest.starts_with('/'))
        .unwrap_or(url_or_key)
        .trim_start_matches('/');
    if relative.is_empty() {
        return Err(StorageError::InvalidKey(url_or_key.to_string()));
    }

    let candidate = Path::new(relative);
    let escapes = candidate
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(StorageError::InvalidKey(url_or_key.to_string()));
    }

    Ok(root.join(candidate))
}

/// Shared read path for both backends: absolute URLs are downloaded, anything
/// else is read from the local assets root.
pub(crate) async fn fetch_url_or_path(
    http_client: &reqwest::Client,
    assets_root: &Path,
    url_or_key: &str,
) -> Result<Vec<u8>, StorageError> {
    if is_remote_url(url_or_key) {
        log::debug!("Fetching remote asset {}", url_or_key);
        let response = http_client.get(url_or_key).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        return Ok(bytes.to_vec());
    }

    let path = resolve_local_path(assets_root, url_or_key)?;
    log::debug!("Reading local asset {}", path.display());
    Ok(tokio::fs::read(&path).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_url_detection() {
        assert!(is_remote_url("https://x.supabase.co/storage/v1/object/public/b/k.png"));
        assert!(is_remote_url("http://localhost:54321/storage/v1/object/public/b/k.png"));
        assert!(!is_remote_url("/uploads/templates/a.png"));
        assert!(!is_remote_url("templates/a.png"));
    }

    #[test]
    fn test_resolve_local_path_accepts_relative_and_rooted_keys() {
        let root = Path::new("/srv/public");
        assert_eq!(
            resolve_local_path(root, "/templates/a.png").unwrap(),
            PathBuf::from("/srv/public/templates/a.png")
        );
        assert_eq!(
            resolve_local_path(root, "templates/a.png").unwrap(),
            PathBuf::from("/srv/public/templates/a.png")
        );
    }

    #[test]
    fn test_resolve_local_path_strips_public_prefix() {
        let root = Path::new("/srv/public");
        assert_eq!(
            resolve_local_path(root, "/uploads/templates/a.png").unwrap(),
            PathBuf::from("/srv/public/templates/a.png")
        );
        assert_eq!(
            resolve_local_path(root, "/uploadsx/a.png").unwrap(),
            PathBuf::from("/srv/public/uploadsx/a.png")
        );
        assert!(matches!(
            resolve_local_path(root, "/uploads/../secret"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            resolve_local_path(root, "/uploads/"),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_resolve_local_path_rejects_traversal() {
        let root = Path::new("/srv/public");
        assert!(matches!(
            resolve_local_path(root, "../etc/passwd"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            resolve_local_path(root, "templates/../../secret"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            resolve_local_path(root, "/"),
            Err(StorageError::InvalidKey(_))
        ));
    }
}
