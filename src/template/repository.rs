//! Template lifecycle over durable storage.
//!
//! Every transition that touches more than one row goes through a single
//! `TemplateStore` call so the store can run it as one transaction. The
//! repository keeps no copy of the active template between calls.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::model::TemplateRecord;
use super::validator::TemplateValidator;
use super::TemplateError;
use crate::storage::ObjectStorage;

/// Durable persistence for template records.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Deactivate every record and insert `record` as the only active one.
    async fn insert_active(&self, record: &TemplateRecord) -> Result<(), sqlx::Error>;

    /// Deactivate every other record and mark `id` active. `None` if `id` is unknown.
    async fn activate_exclusive(&self, id: Uuid) -> Result<Option<TemplateRecord>, sqlx::Error>;

    /// Clear `is_active` on `id` only if it is currently set.
    async fn deactivate_if_active(&self, id: Uuid) -> Result<bool, sqlx::Error>;

    /// Remove `id` only if it is currently inactive.
    async fn delete_if_inactive(&self, id: Uuid) -> Result<bool, sqlx::Error>;

    async fn find(&self, id: Uuid) -> Result<Option<TemplateRecord>, sqlx::Error>;

    async fn find_active(&self) -> Result<Option<TemplateRecord>, sqlx::Error>;

    /// All records, newest upload first.
    async fn list(&self) -> Result<Vec<TemplateRecord>, sqlx::Error>;
}

pub struct TemplateRepository {
    store: Arc<dyn TemplateStore>,
    storage: Arc<dyn ObjectStorage>,
    validator: Arc<TemplateValidator>,
}

impl TemplateRepository {
    pub fn new(
        store: Arc<dyn TemplateStore>,
        storage: Arc<dyn ObjectStorage>,
        validator: Arc<TemplateValidator>,
    ) -> Self {
        Self {
            store,
            storage,
            validator,
        }
    }

    /// Validate, store the blob, then insert the record as the sole active template.
    pub async fn upload(
        &self,
        bytes: &[u8],
        display_name: &str,
        uploader_id: &str,
    ) -> Result<TemplateRecord, TemplateError> {
        let outcome = self.validator.validate(bytes);
        let metadata = match (outcome.valid, outcome.metadata) {
            (true, Some(metadata)) => metadata,
            (_, _) => {
                let reason = outcome
                    .error
                    .unwrap_or_else(|| "template failed validation".to_string());
                log::info!("Template upload rejected: {}", reason);
                return Err(TemplateError::Upload(reason));
            }
        };
        if metadata.basic_validation {
            log::warn!(
                "Template '{}' accepted with basic validation; assuming {}x{} canvas",
                display_name,
                metadata.width,
                metadata.height
            );
        }

        let id = Uuid::new_v4();
        let key = format!("templates/{}.{}", id, metadata.format.extension());
        let storage_key = self
            .storage
            .store(&key, bytes, metadata.format.mime_type())
            .await
            .map_err(|e| {
                log::error!("Failed to store template blob {}: {}", key, e);
                TemplateError::Storage(e)
            })?;

        let display_name = match display_name.trim() {
            "" => format!("Template {}", &id.to_string()[..8]),
            name => name.to_string(),
        };
        let mut record = TemplateRecord::new(
            display_name,
            storage_key,
            metadata.width,
            metadata.height,
            uploader_id.to_string(),
        );
        record.id = id;

        if let Err(e) = self.store.insert_active(&record).await {
            log::error!("Failed to insert template record {}: {}", record.id, e);
            self.delete_blob(&record.storage_key).await;
            return Err(TemplateError::Database(e));
        }

        log::info!(
            "Template {} ('{}', {}x{}) uploaded by {} and activated",
            record.id,
            record.display_name,
            record.width,
            record.height,
            record.uploaded_by
        );
        Ok(record)
    }

    pub async fn activate(&self, id: Uuid) -> Result<TemplateRecord, TemplateError> {
        match self.store.activate_exclusive(id).await? {
            Some(record) => {
                log::info!("Template {} activated", id);
                Ok(record)
            }
            None => Err(TemplateError::NotFound(id)),
        }
    }

    /// May leave the system with zero active templates.
    pub async fn deactivate(&self, id: Uuid) -> Result<(), TemplateError> {
        if self.store.deactivate_if_active(id).await? {
            log::info!("Template {} deactivated", id);
            return Ok(());
        }
        match self.store.find(id).await? {
            Some(_) => Err(TemplateError::already_inactive()),
            None => Err(TemplateError::NotFound(id)),
        }
    }

    /// Remove an inactive template and, best-effort, its blob.
    ///
    /// The record is removed first under the inactive guard so a blob is
    /// never deleted out from under a template that is still active.
    pub async fn delete(&self, id: Uuid) -> Result<(), TemplateError> {
        let record = self
            .store
            .find(id)
            .await?
            .ok_or(TemplateError::NotFound(id))?;
        if record.is_active {
            return Err(TemplateError::delete_active());
        }

        if !self.store.delete_if_inactive(id).await? {
            return match self.store.find(id).await? {
                Some(_) => Err(TemplateError::delete_active()),
                None => Err(TemplateError::NotFound(id)),
            };
        }

        self.delete_blob(&record.storage_key).await;
        log::info!("Template {} deleted", id);
        Ok(())
    }

    pub async fn get_active(&self) -> Result<Option<TemplateRecord>, TemplateError> {
        Ok(self.store.find_active().await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<TemplateRecord>, TemplateError> {
        Ok(self.store.find(id).await?)
    }

    pub async fn list(&self) -> Result<Vec<TemplateRecord>, TemplateError> {
        Ok(self.store.list().await?)
    }

    async fn delete_blob(&self, storage_key: &str) {
        if let Err(e) = self.storage.delete(storage_key).await {
            log::warn!(
                "Failed to delete template blob {} from {} storage: {}",
                storage_key,
                self.storage.backend_name(),
                e
            );
        }
    }
}
