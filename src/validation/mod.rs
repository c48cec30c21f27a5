//! Validation functionality
//!
//! Provides validation logic for:
//! - Type compatibility of resolved fragments
//! - Input validation of field names and paths

pub mod input;
pub mod types;

pub use input::{ValidationError, ValidationResult, validate_field_path};
pub use types::{IncompatibilityReport, verify_data_types};
