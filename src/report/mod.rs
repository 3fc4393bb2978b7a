//! Report rendering.
//!
//! Each report type only builds a [`spec::ReportSpec`]; layout is done once
//! in [`spec::build_document`].
//!
//! - `exam_result` - Laporan Hasil Ujian Tahfidz
//! - `progress` - Laporan Perkembangan Hafalan
//! - `certificate` - Sertifikat on the active template canvas

pub mod certificate;
pub mod common;
pub mod exam_result;
pub mod handlers;
pub mod progress;
pub mod service;
pub mod spec;
pub mod validation;

pub use certificate::CertificateRequest;
pub use exam_result::ExamResultRequest;
pub use progress::ProgressReportRequest;
pub use service::{RenderOptions, ReportService};
pub use spec::{ReportRequest, ReportSpec};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::storage::StorageError;
use crate::template::TemplateError;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no active template")]
    NoActiveTemplate,
    #[error("asset {location} is unreachable: {source}")]
    AssetUnreachable {
        location: String,
        #[source]
        source: StorageError,
    },
    #[error("active template {id} could not be decoded: {reason}")]
    TemplateUndecodable { id: Uuid, reason: String },
    #[error("{0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("failed to write PDF: {0}")]
    Pdf(#[from] lopdf::Error),
}

/// Result of a successful render.
#[derive(Debug)]
pub struct GeneratedDocument {
    pub filename: String,
    pub pdf: Vec<u8>,
    pub tanggal: String,
}

/// Student identity resolved by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentIdentity {
    pub name: String,
    #[serde(default)]
    pub student_number: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub halaqah: Option<String>,
}

impl StudentIdentity {
    fn validate_into(&self, errors: &mut validation::ValidationErrors) {
        validation::validate_required(&self.name, "student.name", "Nama Santri", errors);
    }

    fn rows(&self) -> Vec<(String, String)> {
        let mut rows = vec![
            ("Nama Santri".to_string(), self.name.clone()),
            ("NIS".to_string(), or_dash(&self.student_number)),
            ("Kelas".to_string(), or_dash(&self.class_name)),
        ];
        if let Some(halaqah) = &self.halaqah {
            rows.push(("Halaqah".to_string(), or_dash(halaqah)));
        }
        rows
    }
}

fn or_dash(value: &str) -> String {
    match value.trim() {
        "" => "-".to_string(),
        v => v.to_string(),
    }
}
