//! Value-level type conversion
//!
//! Converts a single scalar to a [`TargetType`]. A failed conversion never aborts the
//! caller: [`convert_value`] logs the failure and hands back the original value together
//! with the error.

use crate::models::{TargetType, Value};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Date format accepted by the `datetime` target
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Error during type conversion
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum ConversionError {
    #[error("Cannot convert '{value}' to {target}: {reason}")]
    InvalidValue {
        value: String,
        target: TargetType,
        reason: String,
    },
    #[error("Field '{field}' holds a mapping or sequence and cannot be converted to {target}")]
    NotScalar { field: String, target: TargetType },
    #[error("Field '{field}' not found")]
    MissingField { field: String },
    #[error("Cannot convert column '{field}' to {target}: row {row}: {reason}")]
    Column {
        field: String,
        target: TargetType,
        row: usize,
        reason: String,
    },
}

/// Outcome of converting one value
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// Converted value, or the original value when `error` is set
    pub value: Value,
    pub error: Option<ConversionError>,
}

impl Conversion {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Convert a value, returning the original value alongside the error on failure.
///
/// Failures are reported with `tracing::warn!`.
///
/// # Example
///
/// ```rust
/// use data_unification_sdk::convert::convert_value;
/// use data_unification_sdk::models::{TargetType, Value};
///
/// let ok = convert_value(&Value::from("42"), TargetType::Int);
/// assert_eq!(ok.value, Value::from(42));
///
/// let failed = convert_value(&Value::from("not-a-number"), TargetType::Int);
/// assert_eq!(failed.value, Value::from("not-a-number"));
/// assert!(failed.error.is_some());
/// ```
pub fn convert_value(value: &Value, target: TargetType) -> Conversion {
    match try_convert_value(value, target) {
        Ok(converted) => Conversion {
            value: converted,
            error: None,
        },
        Err(e) => {
            warn!("Data type convert - {} to {} - {}", value, target, e);
            Conversion {
                value: value.clone(),
                error: Some(e),
            }
        }
    }
}

/// Convert a value to `target`.
///
/// `Null` converts to `Null` for every target.
pub fn try_convert_value(value: &Value, target: TargetType) -> Result<Value, ConversionError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let invalid = |reason: String| ConversionError::InvalidValue {
        value: value.to_string(),
        target,
        reason,
    };

    match target {
        TargetType::Int => match value {
            Value::Int(i) => Ok(Value::Int(*i)),
            Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
            Value::Float(x) => float_to_int(x.0).map(Value::Int).ok_or_else(|| {
                invalid("float is not finite or out of integer range".to_string())
            }),
            Value::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| invalid(e.to_string())),
            other => Err(invalid(format!("unsupported source type {}", other.kind()))),
        },
        TargetType::Float => match value {
            Value::Float(x) => Ok(Value::Float(*x)),
            Value::Int(i) => Ok(Value::float(*i as f64)),
            Value::Bool(b) => Ok(Value::float(if *b { 1.0 } else { 0.0 })),
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::float)
                .map_err(|e| invalid(e.to_string())),
            other => Err(invalid(format!("unsupported source type {}", other.kind()))),
        },
        TargetType::Str => match value {
            Value::Text(s) => Ok(Value::Text(s.clone())),
            other => Ok(Value::Text(other.to_string())),
        },
        TargetType::Datetime => match value {
            Value::DateTime(dt) => Ok(Value::DateTime(*dt)),
            Value::Date(date) => midnight(*date).ok_or_else(|| invalid("invalid date".into())),
            Value::Text(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map_err(|e| invalid(e.to_string()))
                .and_then(|date| midnight(date).ok_or_else(|| invalid("invalid date".into()))),
            other => Err(invalid(format!("unsupported source type {}", other.kind()))),
        },
    }
}

fn midnight(date: NaiveDate) -> Option<Value> {
    date.and_hms_opt(0, 0, 0).map(Value::DateTime)
}

/// Truncate toward zero, rejecting non-finite and out-of-range floats.
fn float_to_int(x: f64) -> Option<i64> {
    let truncated = x.trunc();
    if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        Some(truncated as i64)
    } else {
        None
    }
}
