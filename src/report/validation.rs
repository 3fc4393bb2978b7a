//! Request validation with messages meant for the school administrator.

use std::fmt;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    /// Indonesian, shown to the operator as-is.
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn empty_field(field: &str, label: &str) -> Self {
        Self::new(field, format!("{} tidak boleh kosong", label))
    }

    pub fn out_of_range(field: &str, label: &str, min: f32, max: f32) -> Self {
        Self::new(
            field,
            format!("{} harus berada di antara {} dan {}", label, min, max),
        )
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)
    }
}

#[derive(Debug, Default)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn message(&self) -> String {
        let parts: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        format!(
            "Validasi gagal ({} kesalahan): {}",
            self.errors.len(),
            parts.join("; ")
        )
    }

    pub fn into_result(self) -> Result<(), String> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.message())
        }
    }
}

/// Implemented by every report request.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

pub fn validate_required(value: &str, field: &str, label: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(ValidationError::empty_field(field, label));
    }
}

pub fn validate_score(value: f32, field: &str, label: &str, errors: &mut ValidationErrors) {
    if !(0.0..=100.0).contains(&value) {
        errors.add(ValidationError::out_of_range(field, label, 0.0, 100.0));
    }
}

pub fn validate_not_empty<T>(items: &[T], field: &str, label: &str, errors: &mut ValidationErrors) {
    if items.is_empty() {
        errors.add(ValidationError::empty_field(field, label));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_all_errors() {
        let mut errors = ValidationErrors::new();
        validate_required("  ", "student.name", "Nama Santri", &mut errors);
        validate_score(101.0, "aspects[0].score", "Nilai", &mut errors);
        validate_score(85.5, "aspects[1].score", "Nilai", &mut errors);
        validate_not_empty::<u8>(&[], "aspects", "Aspek Penilaian", &mut errors);

        assert_eq!(errors.len(), 3);
        let message = errors.into_result().unwrap_err();
        assert!(message.contains("Nama Santri tidak boleh kosong"));
        assert!(message.contains("[aspects[0].score]"));
    }

    #[test]
    fn test_empty_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
