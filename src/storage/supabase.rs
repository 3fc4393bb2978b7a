use std::env;
use std::path::PathBuf;

use async_trait::async_trait;

use super::{fetch_url_or_path, is_remote_url, ObjectStorage, StorageError};

const DEFAULT_BUCKET: &str = "certificate-templates";

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub bucket_name: String,
}

impl SupabaseConfig {
    /// Read the Supabase settings. Returns `Ok(None)` when `SUPABASE_URL` is unset.
    pub fn from_env() -> Result<Option<Self>, env::VarError> {
        let supabase_url = match env::var("SUPABASE_URL") {
            Ok(url) => url,
            Err(env::VarError::NotPresent) => return Ok(None),
            Err(e) => return Err(e),
        };
        let supabase_service_key = env::var("SUPABASE_SERVICE_KEY")?;
        let bucket_name = env::var("BUCKET_NAME").unwrap_or_else(|_| DEFAULT_BUCKET.to_string());

        Ok(Some(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_service_key,
            bucket_name,
        }))
    }

    fn object_endpoint(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.supabase_url, self.bucket_name, key
        )
    }

    fn public_prefix(&self) -> String {
        format!(
            "{}/storage/v1/object/public/{}/",
            self.supabase_url, self.bucket_name
        )
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}{}", self.public_prefix(), key)
    }

    /// Map a public URL or bare key back to the object key inside the bucket.
    pub fn object_key<'a>(&self, url_or_key: &'a str) -> Option<&'a str> {
        if is_remote_url(url_or_key) {
            let prefix = self.public_prefix();
            url_or_key
                .strip_prefix(prefix.as_str())
                .filter(|key| !key.is_empty())
        } else {
            let key = url_or_key.trim_start_matches('/');
            (!key.is_empty()).then_some(key)
        }
    }
}

/// Remote durable store backed by a Supabase Storage bucket.
pub struct SupabaseStorage {
    config: SupabaseConfig,
    http_client: reqwest::Client,
    assets_root: PathBuf,
}

impl SupabaseStorage {
    pub fn new(config: SupabaseConfig, http_client: reqwest::Client, assets_root: PathBuf) -> Self {
        Self {
            config,
            http_client,
            assets_root,
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<(), StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn store(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError> {
        let key = self
            .config
            .object_key(key)
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;
        let content_type = if content_type.is_empty() {
            mime_guess::from_path(key)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        } else {
            content_type.to_string()
        };

        log::debug!("Uploading {} bytes to Supabase object {}", bytes.len(), key);
        let response = self
            .http_client
            .post(self.config.object_endpoint(key))
            .bearer_auth(&self.config.supabase_service_key)
            .header("apikey", &self.config.supabase_service_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await?;
        Self::check_status(response).await?;

        Ok(self.config.public_url(key))
    }

    async fn fetch(&self, url_or_key: &str) -> Result<Vec<u8>, StorageError> {
        fetch_url_or_path(&self.http_client, &self.assets_root, url_or_key).await
    }

    async fn delete(&self, url_or_key: &str) -> Result<(), StorageError> {
        let key = self
            .config
            .object_key(url_or_key)
            .ok_or_else(|| StorageError::InvalidKey(url_or_key.to_string()))?;

        log::debug!("Deleting Supabase object {}", key);
        let response = self
            .http_client
            .delete(self.config.object_endpoint(key))
            .bearer_auth(&self.config.supabase_service_key)
            .header("apikey", &self.config.supabase_service_key)
            .send()
            .await?;
        Self::check_status(response).await
    }

    fn backend_name(&self) -> &'static str {
        "supabase"
    }
}
