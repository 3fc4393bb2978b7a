//! Certificate template lifecycle.
//!
//! - `model` - persisted `TemplateRecord` and API payloads
//! - `validator` - upload checks with the optional-decoder fallback
//! - `repository` - upload/activate/deactivate/delete over a `TemplateStore`
//! - `handlers` - HTTP endpoints

pub mod handlers;
pub mod model;
pub mod repository;
pub mod validator;

pub use model::TemplateRecord;
pub use repository::{TemplateRepository, TemplateStore};
pub use validator::{TemplateValidator, ValidationOutcome};

use thiserror::Error;
use uuid::Uuid;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum TemplateError {
    /// Validation rejected the upload; nothing was stored.
    #[error("upload rejected: {0}")]
    Upload(String),
    /// The blob could not be stored; nothing was written to the database.
    #[error("failed to store template file: {0}")]
    Storage(#[source] StorageError),
    #[error("{0}")]
    InvalidState(String),
    #[error("template {0} not found")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl TemplateError {
    pub fn already_inactive() -> Self {
        Self::InvalidState("already inactive".to_string())
    }

    pub fn delete_active() -> Self {
        Self::InvalidState("cannot delete active template".to_string())
    }
}
