//! Sertifikat Tahfidz, drawn on the active template canvas.
//!
//! Eligibility is decided upstream and arrives with the request; an
//! ineligible request is refused rather than rendered.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::spec::{ReportBody, ReportRequest, ReportSpec, CERTIFICATE_MARGIN};
use super::validation::{validate_required, Validate, ValidationError, ValidationErrors};
use super::StudentIdentity;
use crate::config::SchoolProfile;
use crate::pdf::{PageSize, SignatureAsset};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequest {
    pub student: StudentIdentity,
    /// What was memorised, e.g. "Juz 30".
    pub achievement: String,
    #[serde(default)]
    pub predicate: Option<String>,
    #[serde(default)]
    pub certificate_number: Option<String>,
    /// Upstream eligibility decision.
    pub eligible: bool,
    /// Replaces the default citation text when present.
    #[serde(default)]
    pub body: Option<String>,
    pub signer: SignatureAsset,
}

impl CertificateRequest {
    fn citation(&self, school: &SchoolProfile) -> String {
        if let Some(body) = self.body.as_deref().filter(|b| !b.trim().is_empty()) {
            return body.to_string();
        }
        let mut text = format!(
            "Telah menyelesaikan hafalan Al-Qur'an {} di {}",
            self.achievement, school.name
        );
        if let Some(predicate) = self.predicate.as_deref().filter(|p| !p.trim().is_empty()) {
            text.push_str(&format!(" dengan predikat {}", predicate));
        }
        text.push_str(". Semoga Allah menjadikannya ahlul Qur'an yang mengamalkan isinya.");
        text
    }
}

impl Validate for CertificateRequest {
    fn validate(&self) -> Result<(), String> {
        let mut errors = ValidationErrors::new();
        if !self.eligible {
            errors.add(ValidationError::new(
                "eligible",
                "Santri belum memenuhi syarat untuk menerima sertifikat",
            ));
        }
        self.student.validate_into(&mut errors);
        validate_required(&self.achievement, "achievement", "Capaian Hafalan", &mut errors);
        validate_required(&self.signer.display_name, "signer.displayName", "Nama Penandatangan", &mut errors);
        errors.into_result()
    }
}

impl ReportRequest for CertificateRequest {
    fn signer(&self) -> &SignatureAsset {
        &self.signer
    }

    fn build_spec(&self, school: &SchoolProfile, date: &str) -> ReportSpec {
        let mut identity_left = vec![("Nama".to_string(), self.student.name.clone())];
        if !self.student.student_number.trim().is_empty() {
            identity_left.push(("NIS".to_string(), self.student.student_number.clone()));
        }
        let mut identity_right = vec![("Capaian".to_string(), self.achievement.clone())];
        if let Some(predicate) = &self.predicate {
            identity_right.push(("Predikat".to_string(), predicate.clone()));
        }

        ReportSpec {
            page: PageSize::A4_LANDSCAPE,
            margin: CERTIFICATE_MARGIN,
            background_template: true,
            title: "SERTIFIKAT TAHFIDZ AL-QUR'AN".to_string(),
            title_size: 26.0,
            subtitle: self
                .certificate_number
                .as_ref()
                .map(|number| format!("Nomor: {}", number)),
            identity_left,
            identity_right,
            body: ReportBody::Text(self.citation(school)),
            summary: Vec::new(),
            city: school.city.clone(),
            date: date.to_string(),
            signer: self.signer.clone(),
            filename_prefix: "Sertifikat",
            subject_name: self.student.name.clone(),
        }
    }
}
