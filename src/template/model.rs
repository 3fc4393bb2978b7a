use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A certificate background canvas.
///
/// At most one record has `is_active = true` at any time; the database
/// enforces this with a partial unique index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    #[schema(example = "a1b2c3d4-e5f6-7890-1234-567890abcdef")]
    pub id: Uuid,
    #[schema(example = "Sertifikat Wisuda 2026")]
    pub display_name: String,
    #[schema(example = "/templates/a1b2c3d4-e5f6-7890-1234-567890abcdef.png")]
    pub storage_key: String,
    #[schema(example = 932)]
    pub width: i32,
    #[schema(example = 661)]
    pub height: i32,
    pub is_active: bool,
    #[schema(example = "admin-01")]
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

impl TemplateRecord {
    pub fn new(
        display_name: String,
        storage_key: String,
        width: u32,
        height: u32,
        uploaded_by: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name,
            storage_key,
            width: i32::try_from(width).unwrap_or(i32::MAX),
            height: i32::try_from(height).unwrap_or(i32::MAX),
            is_active: true,
            uploaded_by,
            uploaded_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadTemplateResponse {
    pub success: bool,
    pub template_id: Uuid,
    pub width: i32,
    pub height: i32,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&TemplateRecord> for UploadTemplateResponse {
    fn from(record: &TemplateRecord) -> Self {
        Self {
            success: true,
            template_id: record.id,
            width: record.width,
            height: record.height,
            uploaded_at: record.uploaded_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TemplateActionResponse {
    pub success: bool,
    #[schema(example = "Template activated")]
    pub message: String,
}

impl TemplateActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Multipart form accepted by the upload endpoint (documentation only).
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadTemplateForm {
    /// PNG or JPEG, at most 5 MB, landscape.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    #[schema(example = "Sertifikat Wisuda 2026")]
    pub name: Option<String>,
    #[schema(example = "admin-01")]
    pub uploaded_by: Option<String>,
}
