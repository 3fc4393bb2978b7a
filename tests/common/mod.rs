#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use image::{ImageBuffer, ImageFormat, Rgb, Rgba};
use tokio::sync::Mutex;
use uuid::Uuid;

use tahfidz_docs_server::storage::{ObjectStorage, StorageError};
use tahfidz_docs_server::template::{TemplateRecord, TemplateStore};

/// In-memory blob store that records every key it was asked to fetch.
#[derive(Default)]
pub struct MockObjectStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fetches: Mutex<Vec<String>>,
    fail_store: AtomicBool,
    fail_delete: AtomicBool,
}

impl MockObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_store(self) -> Self {
        self.fail_store.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub async fn has_file(&self, key: &str) -> bool {
        self.files.lock().await.contains_key(key.trim_start_matches('/'))
    }

    pub async fn file_count(&self) -> usize {
        self.files.lock().await.len()
    }

    pub async fn put(&self, key: &str, bytes: Vec<u8>) {
        self.files
            .lock()
            .await
            .insert(key.trim_start_matches('/').to_string(), bytes);
    }

    pub async fn fetches(&self) -> Vec<String> {
        self.fetches.lock().await.clone()
    }
}

#[async_trait]
impl ObjectStorage for MockObjectStorage {
    async fn store(
        &self,
        key: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<String, StorageError> {
        if self.fail_store.load(Ordering::SeqCst) {
            return Err(StorageError::Status {
                status: 503,
                body: "storage unavailable".to_string(),
            });
        }
        self.put(key, bytes.to_vec()).await;
        Ok(format!("/{}", key.trim_start_matches('/')))
    }

    async fn fetch(&self, url_or_key: &str) -> Result<Vec<u8>, StorageError> {
        self.fetches.lock().await.push(url_or_key.to_string());
        self.files
            .lock()
            .await
            .get(url_or_key.trim_start_matches('/'))
            .cloned()
            .ok_or_else(|| StorageError::Status {
                status: 404,
                body: format!("{} not found", url_or_key),
            })
    }

    async fn delete(&self, url_or_key: &str) -> Result<(), StorageError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::Status {
                status: 500,
                body: "delete failed".to_string(),
            });
        }
        self.files
            .lock()
            .await
            .remove(url_or_key.trim_start_matches('/'));
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

/// `TemplateStore` over a vector, with the same single-active transitions
/// as the PostgreSQL store.
#[derive(Default)]
pub struct MemoryTemplateStore {
    records: Mutex<Vec<TemplateRecord>>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn active_count(&self) -> usize {
        self.records
            .lock()
            .await
            .iter()
            .filter(|r| r.is_active)
            .count()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn insert_active(&self, record: &TemplateRecord) -> Result<(), sqlx::Error> {
        let mut records = self.records.lock().await;
        for existing in records.iter_mut() {
            existing.is_active = false;
        }
        let mut record = record.clone();
        record.is_active = true;
        records.push(record);
        Ok(())
    }

    async fn activate_exclusive(&self, id: Uuid) -> Result<Option<TemplateRecord>, sqlx::Error> {
        let mut records = self.records.lock().await;
        if !records.iter().any(|r| r.id == id) {
            return Ok(None);
        }
        for record in records.iter_mut() {
            record.is_active = record.id == id;
        }
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn deactivate_if_active(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut records = self.records.lock().await;
        match records.iter_mut().find(|r| r.id == id && r.is_active) {
            Some(record) => {
                record.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_if_inactive(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| !(r.id == id && !r.is_active));
        Ok(records.len() < before)
    }

    async fn find(&self, id: Uuid) -> Result<Option<TemplateRecord>, sqlx::Error> {
        Ok(self.records.lock().await.iter().find(|r| r.id == id).cloned())
    }

    async fn find_active(&self) -> Result<Option<TemplateRecord>, sqlx::Error> {
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .find(|r| r.is_active)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<TemplateRecord>, sqlx::Error> {
        let mut records = self.records.lock().await.clone();
        records.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(records)
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 120, 255])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .expect("encode PNG fixture");
    out.into_inner()
}

/// PNG with a transparent border, like a scanned stamp.
pub fn stamp_png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        let edge = x < 2 || y < 2 || x + 2 >= width || y + 2 >= height;
        Rgba([180u8, 20, 20, if edge { 0 } else { 200 }])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .expect("encode PNG fixture");
    out.into_inner()
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_fn(width, height, |x, _| Rgb([(x % 256) as u8, 90, 160]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Jpeg)
        .expect("encode JPEG fixture");
    out.into_inner()
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
