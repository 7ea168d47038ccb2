//! Input validation for ledger operation arguments.
//!
//! Provides configurable validation for names, free-text fields, and
//! geographic coordinates. Coordinates arrive as decimal strings so the
//! ledger never loses precision crossing numeric environments; they are
//! checked here for shape and range.
//!
//! ## Character Whitelists
//!
//! - Coordinates: optional leading `-`, digits, at most one `.`.
//! - Names and free text: any UTF-8, bounded in byte length by
//!   [`ValidationConfig`](crate::config::ValidationConfig).

use std::fmt;

use crate::config::ValidationConfig;

/// Validation error with structured context.
///
/// Contains the specific constraint that was violated and the field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the violated constraint.
    pub constraint: String,
}

impl ValidationError {
    fn new(field: &str, constraint: impl Into<String>) -> Self {
        Self { field: field.to_string(), constraint: constraint.into() }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.constraint)
    }
}

impl std::error::Error for ValidationError {}

/// Validates a product name against configured limits.
///
/// Names must be non-empty, not exceed `config.max_name_bytes` in UTF-8 byte
/// length, and not consist solely of whitespace.
///
/// # Errors
///
/// Returns [`ValidationError`] naming the violated constraint.
pub fn validate_name(name: &str, config: &ValidationConfig) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("name", "must not be empty"));
    }
    if name.len() > config.max_name_bytes {
        return Err(ValidationError::new(
            "name",
            format!("length {} bytes exceeds maximum {} bytes", name.len(), config.max_name_bytes),
        ));
    }
    Ok(())
}

/// Validates a bounded free-text field (notes, packaging, locations, issuers).
///
/// Unlike names, free text may be empty.
///
/// # Errors
///
/// Returns [`ValidationError`] if the text exceeds `max_bytes`.
pub fn validate_text(
    field: &str,
    text: &str,
    max_bytes: usize,
) -> Result<(), ValidationError> {
    if text.len() > max_bytes {
        return Err(ValidationError {
            field: field.to_string(),
            constraint: format!(
                "length {} bytes exceeds maximum {max_bytes} bytes",
                text.len()
            ),
        });
    }
    Ok(())
}

/// Validates a latitude string: decimal degrees in `[-90, 90]`.
///
/// # Errors
///
/// Returns [`ValidationError`] if the string is malformed or out of range.
pub fn validate_latitude(value: &str) -> Result<(), ValidationError> {
    validate_coordinate("latitude", value, 90.0)
}

/// Validates a longitude string: decimal degrees in `[-180, 180]`.
///
/// # Errors
///
/// Returns [`ValidationError`] if the string is malformed or out of range.
pub fn validate_longitude(value: &str) -> Result<(), ValidationError> {
    validate_coordinate("longitude", value, 180.0)
}

fn validate_coordinate(field: &str, value: &str, limit: f64) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    let digits = value.strip_prefix('-').unwrap_or(value);
    let mut dots = 0usize;
    for c in digits.chars() {
        match c {
            '0'..='9' => {},
            '.' => dots += 1,
            other => {
                return Err(ValidationError::new(
                    field,
                    format!("contains invalid character {other:?}; allowed: [-0-9.]"),
                ));
            },
        }
    }
    if dots > 1 || digits.starts_with('.') || digits.ends_with('.') || digits.is_empty() {
        return Err(ValidationError::new(field, "malformed decimal number"));
    }
    // Range check only; the stored representation stays the caller's string.
    let parsed: f64 = value
        .parse()
        .map_err(|_| ValidationError::new(field, "malformed decimal number"))?;
    if !(-limit..=limit).contains(&parsed) {
        return Err(ValidationError::new(
            field,
            format!("value {value} outside [-{limit}, {limit}]"),
        ));
    }
    Ok(())
}
