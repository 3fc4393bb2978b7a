//! Laporan Hasil Ujian Tahfidz.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::spec::{ReportBody, ReportRequest, ReportSpec, PAGE_MARGIN};
use super::validation::{
    validate_not_empty, validate_required, validate_score, Validate, ValidationErrors,
};
use super::{or_dash, StudentIdentity};
use crate::config::SchoolProfile;
use crate::pdf::{PageSize, SignatureAsset, TableSpec};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentAspect {
    pub aspect: String,
    pub score: f32,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExamResultRequest {
    pub student: StudentIdentity,
    pub exam_name: String,
    pub juz: String,
    pub exam_date: String,
    pub examiner: String,
    pub aspects: Vec<AssessmentAspect>,
    pub signer: SignatureAsset,
}

/// Tahfidz grading band for an average score.
pub fn predicate(average: f32) -> &'static str {
    match average {
        a if a >= 90.0 => "Mumtaz",
        a if a >= 80.0 => "Jayyid Jiddan",
        a if a >= 70.0 => "Jayyid",
        a if a >= 60.0 => "Maqbul",
        _ => "Rasib",
    }
}

fn format_score(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

impl Validate for ExamResultRequest {
    fn validate(&self) -> Result<(), String> {
        let mut errors = ValidationErrors::new();
        self.student.validate_into(&mut errors);
        validate_required(&self.exam_name, "examName", "Nama Ujian", &mut errors);
        validate_required(&self.juz, "juz", "Juz", &mut errors);
        validate_not_empty(&self.aspects, "aspects", "Aspek Penilaian", &mut errors);
        for (idx, aspect) in self.aspects.iter().enumerate() {
            validate_required(
                &aspect.aspect,
                &format!("aspects[{}].aspect", idx),
                "Aspek Penilaian",
                &mut errors,
            );
            validate_score(
                aspect.score,
                &format!("aspects[{}].score", idx),
                "Nilai",
                &mut errors,
            );
        }
        validate_required(&self.signer.display_name, "signer.displayName", "Nama Penandatangan", &mut errors);
        errors.into_result()
    }
}

impl ReportRequest for ExamResultRequest {
    fn signer(&self) -> &SignatureAsset {
        &self.signer
    }

    fn build_spec(&self, school: &SchoolProfile, date: &str) -> ReportSpec {
        let total: f32 = self.aspects.iter().map(|a| a.score).sum();
        let average = total / self.aspects.len().max(1) as f32;

        let rows = self
            .aspects
            .iter()
            .enumerate()
            .map(|(idx, aspect)| {
                vec![
                    (idx + 1).to_string(),
                    aspect.aspect.clone(),
                    format_score(aspect.score),
                    aspect.note.clone().unwrap_or_else(|| predicate(aspect.score).to_string()),
                ]
            })
            .collect();

        ReportSpec {
            page: PageSize::A4_PORTRAIT,
            margin: PAGE_MARGIN,
            background_template: false,
            title: "LAPORAN HASIL UJIAN TAHFIDZ".to_string(),
            title_size: 14.0,
            subtitle: Some(self.exam_name.clone()),
            identity_left: self.student.rows(),
            identity_right: vec![
                ("Ujian".to_string(), self.exam_name.clone()),
                ("Juz".to_string(), self.juz.clone()),
                ("Tanggal Ujian".to_string(), or_dash(&self.exam_date)),
                ("Penguji".to_string(), or_dash(&self.examiner)),
            ],
            body: ReportBody::Table(TableSpec {
                head: vec![
                    "No".to_string(),
                    "Aspek Penilaian".to_string(),
                    "Nilai".to_string(),
                    "Keterangan".to_string(),
                ],
                widths: vec![0.6, 4.0, 1.2, 2.6],
                rows,
            }),
            summary: vec![
                ("Jumlah Nilai".to_string(), format_score(total)),
                ("Rata-rata".to_string(), format!("{:.2}", average)),
                ("Predikat".to_string(), predicate(average).to_string()),
            ],
            city: school.city.clone(),
            date: date.to_string(),
            signer: self.signer.clone(),
            filename_prefix: "Laporan_Hasil_Ujian",
            subject_name: self.student.name.clone(),
        }
    }
}
