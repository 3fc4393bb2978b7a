//! Laporan Perkembangan Hafalan.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::spec::{ReportBody, ReportRequest, ReportSpec, PAGE_MARGIN};
use super::validation::{validate_required, Validate, ValidationErrors};
use super::{or_dash, StudentIdentity};
use crate::config::SchoolProfile;
use crate::pdf::{PageSize, SignatureAsset, TableSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Completed,
    InProgress,
    Repeat,
}

impl ProgressStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "Selesai",
            Self::InProgress => "Proses",
            Self::Repeat => "Mengulang",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    pub date: String,
    pub surah: String,
    pub ayat: String,
    #[serde(default)]
    pub juz: Option<String>,
    pub status: ProgressStatus,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReportRequest {
    pub student: StudentIdentity,
    /// Reporting period, e.g. "Semester Ganjil 2026/2027".
    pub period: String,
    #[serde(default)]
    pub teacher: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub entries: Vec<ProgressEntry>,
    pub signer: SignatureAsset,
}

impl Validate for ProgressReportRequest {
    fn validate(&self) -> Result<(), String> {
        let mut errors = ValidationErrors::new();
        self.student.validate_into(&mut errors);
        validate_required(&self.period, "period", "Periode", &mut errors);
        for (idx, entry) in self.entries.iter().enumerate() {
            validate_required(
                &entry.surah,
                &format!("entries[{}].surah", idx),
                "Surah",
                &mut errors,
            );
        }
        validate_required(&self.signer.display_name, "signer.displayName", "Nama Penandatangan", &mut errors);
        errors.into_result()
    }
}

impl ReportRequest for ProgressReportRequest {
    fn signer(&self) -> &SignatureAsset {
        &self.signer
    }

    fn build_spec(&self, school: &SchoolProfile, date: &str) -> ReportSpec {
        let completed = self
            .entries
            .iter()
            .filter(|e| e.status == ProgressStatus::Completed)
            .count();

        let rows = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                vec![
                    (idx + 1).to_string(),
                    entry.date.clone(),
                    entry.surah.clone(),
                    entry.ayat.clone(),
                    entry.juz.clone().unwrap_or_else(|| "-".to_string()),
                    entry.status.label().to_string(),
                    entry.note.clone().unwrap_or_default(),
                ]
            })
            .collect();

        ReportSpec {
            page: PageSize::A4_PORTRAIT,
            margin: PAGE_MARGIN,
            background_template: false,
            title: "LAPORAN PERKEMBANGAN HAFALAN".to_string(),
            title_size: 14.0,
            subtitle: Some(self.period.clone()),
            identity_left: self.student.rows(),
            identity_right: vec![
                ("Periode".to_string(), self.period.clone()),
                (
                    "Pembimbing".to_string(),
                    or_dash(self.teacher.as_deref().unwrap_or_default()),
                ),
                (
                    "Target".to_string(),
                    or_dash(self.target.as_deref().unwrap_or_default()),
                ),
            ],
            body: ReportBody::Table(TableSpec {
                head: ["No", "Tanggal", "Surah", "Ayat", "Juz", "Status", "Keterangan"]
                    .iter()
                    .map(|h| h.to_string())
                    .collect(),
                widths: vec![0.5, 1.5, 2.0, 1.0, 0.6, 1.2, 2.4],
                rows,
            }),
            summary: vec![
                ("Setoran Tercatat".to_string(), self.entries.len().to_string()),
                ("Setoran Selesai".to_string(), completed.to_string()),
                (
                    "Target".to_string(),
                    or_dash(self.target.as_deref().unwrap_or_default()),
                ),
            ],
            city: school.city.clone(),
            date: date.to_string(),
            signer: self.signer.clone(),
            filename_prefix: "Laporan_Perkembangan",
            subject_name: self.student.name.clone(),
        }
    }
}
