//! Input validation for field names.
//!
//! Field names and dotted field paths end up as YAML keys in persisted mapping
//! dictionaries and as column names in resolved tables, so they are checked before a
//! mapping dictionary is saved.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length for a field name or dotted field path
pub const MAX_FIELD_PATH_LENGTH: usize = 255;

/// Errors that can occur during input validation.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    /// Input is empty when a value is required
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// Input exceeds maximum allowed length
    #[error("{field} exceeds maximum length (max: {max}, got: {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// Input contains invalid characters
    #[error("{field} contains invalid characters: {reason}")]
    InvalidCharacters { field: &'static str, reason: String },

    /// Input has invalid format
    #[error("{0}: {1}")]
    InvalidFormat(&'static str, String),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a field name or dotted field path.
///
/// # Rules
///
/// - Must not be empty
/// - Must not exceed 255 characters
/// - Must not contain control characters
/// - Must not contain empty path segments (`a..b`, `.a`, `a.`)
///
/// # Examples
///
/// ```
/// use data_unification_sdk::validation::input::validate_field_path;
///
/// assert!(validate_field_path("customer_id").is_ok());
/// assert!(validate_field_path("address.street").is_ok());
/// assert!(validate_field_path("").is_err());
/// assert!(validate_field_path("address..street").is_err());
/// ```
pub fn validate_field_path(path: &str) -> ValidationResult<()> {
    if path.is_empty() {
        return Err(ValidationError::Empty("field path"));
    }

    if path.len() > MAX_FIELD_PATH_LENGTH {
        return Err(ValidationError::TooLong {
            field: "field path",
            max: MAX_FIELD_PATH_LENGTH,
            actual: path.len(),
        });
    }

    if let Some(c) = path.chars().find(|c| c.is_control()) {
        return Err(ValidationError::InvalidCharacters {
            field: "field path",
            reason: format!("control character: {:?}", c),
        });
    }

    if path.split('.').any(str::is_empty) {
        return Err(ValidationError::InvalidFormat(
            "field path",
            format!("'{}' contains an empty segment", path),
        ));
    }

    Ok(())
}
