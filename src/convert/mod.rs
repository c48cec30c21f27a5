//! Field renaming and type conversion
//!
//! Provides value-level conversion to a target type, bulk conversion of resolved
//! fragments, and renaming of fields ahead of alignment.

pub mod converter;
pub mod data_types;
pub mod rename;

pub use converter::{Conversion, ConversionError, DATE_FORMAT, convert_value, try_convert_value};
pub use data_types::{ConversionReport, FieldConversion, FieldConversions, convert_data_types};
pub use rename::{FieldRenames, rename_fields};
