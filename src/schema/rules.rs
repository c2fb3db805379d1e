//! Field-level validation rules
//!
//! Every record type exposes a `validate()` returning [`ValidationErrors`].
//! Messages are written for the person filling the form: each names the
//! field and what to correct.

use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

/// One failed rule on one field
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
#[error("{field}: {message}")]
#[diagnostic(code(oficina::validation::field))]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All failed rules for a record
#[derive(Debug, Clone, Default, PartialEq, Diagnostic)]
#[diagnostic(
    code(oficina::validation),
    help("correct the fields listed above and try again")
)]
pub struct ValidationErrors {
    #[related]
    errors: Vec<FieldError>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => write!(f, "validation passed"),
            [only] => write!(f, "{}", only),
            many => {
                write!(f, "{} validation errors", many.len())?;
                for e in many {
                    write!(f, "\n  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Merge errors from a nested record, prefixing field names
    pub fn extend_nested(&mut self, prefix: &str, nested: ValidationErrors) {
        for e in nested.errors {
            self.errors.push(FieldError {
                field: format!("{}.{}", prefix, e.field),
                message: e.message,
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// True if any error is on `field`
    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Keep only ASCII digits (strips CPF/CNPJ and phone punctuation)
pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Upper-case a plate and drop separators: "abc-1d23" -> "ABC1D23"
pub fn normalize_plate(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

pub fn require_text(errors: &mut ValidationErrors, field: &str, value: &str, label: &str) {
    if value.trim().is_empty() {
        errors.push(field, format!("{} is required", label));
    }
}

pub fn require_min_chars(
    errors: &mut ValidationErrors,
    field: &str,
    value: &str,
    min: usize,
    label: &str,
) {
    if value.trim().chars().count() < min {
        errors.push(
            field,
            format!("{} must have at least {} characters", label, min),
        );
    }
}

pub fn require_non_negative(errors: &mut ValidationErrors, field: &str, value: f64, label: &str) {
    if !value.is_finite() || value < 0.0 {
        errors.push(field, format!("{} must not be negative", label));
    }
}

/// CPF (11 digits) or CNPJ (14 digits)
pub fn check_document(errors: &mut ValidationErrors, field: &str, value: &str) {
    match digits_only(value).len() {
        11 | 14 => {}
        0 => errors.push(field, "CPF/CNPJ is required"),
        _ => errors.push(field, "CPF must have 11 digits or CNPJ 14 digits"),
    }
}

pub fn check_cpf(errors: &mut ValidationErrors, field: &str, value: &str) {
    if digits_only(value).len() != 11 {
        errors.push(field, "CPF must have 11 digits");
    }
}

pub fn check_phone(errors: &mut ValidationErrors, field: &str, value: &str) {
    let len = digits_only(value).len();
    if !(10..=11).contains(&len) {
        errors.push(field, "phone must have 10 or 11 digits including area code");
    }
}

pub fn check_email(errors: &mut ValidationErrors, field: &str, value: &str) {
    if !is_valid_email(value) {
        errors.push(field, format!("'{}' is not a valid email address", value));
    }
}

fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.trim().split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.contains(char::is_whitespace)
}

pub fn check_plate(errors: &mut ValidationErrors, field: &str, value: &str) {
    let cleaned: String = value.chars().filter(|c| *c != '-').collect();
    if cleaned.len() != 7 || !cleaned.chars().all(|c| c.is_ascii_alphanumeric()) {
        errors.push(field, "plate must have 7 letters or digits (e.g. ABC1D23)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lengths() {
        let mut errors = ValidationErrors::new();
        check_document(&mut errors, "document", "123.456.789-09");
        check_document(&mut errors, "document", "12.345.678/0001-90");
        assert!(errors.is_empty());

        check_document(&mut errors, "document", "1234");
        assert!(errors.has("document"));
    }

    #[test]
    fn test_phone_lengths() {
        let mut errors = ValidationErrors::new();
        check_phone(&mut errors, "phone", "(11) 98765-4321");
        check_phone(&mut errors, "phone", "(11) 3456-7890");
        assert!(errors.is_empty());

        check_phone(&mut errors, "phone", "98765-4321");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_email() {
        assert!(is_valid_email("ana@example.com"));
        assert!(!is_valid_email("ana.example.com"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("ana @example.com"));
    }

    #[test]
    fn test_plate() {
        let mut errors = ValidationErrors::new();
        check_plate(&mut errors, "plate", "ABC-1234");
        check_plate(&mut errors, "plate", "abc1d23");
        assert!(errors.is_empty());

        check_plate(&mut errors, "plate", "AB-123");
        assert!(errors.has("plate"));
        assert_eq!(normalize_plate("abc-1d23"), "ABC1D23");
    }

    #[test]
    fn test_nested_prefix_and_display() {
        let mut inner = ValidationErrors::new();
        inner.push("quantity", "quantity must be at least 1");

        let mut outer = ValidationErrors::new();
        outer.extend_nested("parts[2]", inner);
        assert!(outer.has("parts[2].quantity"));
        assert_eq!(
            outer.to_string(),
            "parts[2].quantity: quantity must be at least 1"
        );

        outer.push("customer", "customer is required");
        assert!(outer.to_string().starts_with("2 validation errors"));
    }
}
