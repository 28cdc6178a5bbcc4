//! Registration input validation.
//!
//! Rejects intake defects before any score is computed. Detects:
//! - Missing or blank customer name
//! - Missing or blank category
//! - Negative urgency levels
//! - Blank service names (when a service is given)
//!
//! All problems are collected so the caller can report them together.

use crate::models::Registration;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A required field is absent or blank.
    MissingField,
    /// A field is present but outside its accepted range.
    OutOfRange,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a registration.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_registration(registration: &Registration) -> ValidationResult {
    let mut errors = Vec::new();

    if registration.name.trim().is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::MissingField,
            "Missing required field: name",
        ));
    }

    if registration.category.trim().is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::MissingField,
            "Missing required field: category",
        ));
    }

    if registration.urgency_level < 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::OutOfRange,
            format!(
                "Urgency level must not be negative, got {}",
                registration.urgency_level
            ),
        ));
    }

    if let Some(service) = &registration.service {
        if service.trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingField,
                "Service must not be blank when provided",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
