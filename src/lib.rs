//! Data Unification SDK - schema overlap discovery and conflict reconciliation
//!
//! Provides unified interfaces for:
//! - Field metadata extraction from tabular and nested sources
//! - Cross-source overlap identification
//! - Conflict detection and strategy-based resolution
//! - Type verification and conversion
//! - Versioned mapping dictionaries
//! - Workspace configuration

pub mod config;
pub mod conflict;
pub mod convert;
pub mod mapping;
pub mod metadata;
pub mod models;
pub mod overlap;
pub mod pipeline;
pub mod validation;

// Re-export commonly used types
pub use config::{ConfigError, ReconcileConfig, sample_config};
pub use conflict::{
    Conflicts, ResolutionOptions, detect_conflicts, detect_conflicts_on, resolve_conflicts,
};
pub use convert::{
    ConversionError, ConversionReport, FieldConversion, convert_data_types, convert_value,
    rename_fields,
};
pub use mapping::{MappingDictionary, MappingError, MappingStore};
pub use metadata::{FieldMetadata, FieldMetadataMap, extract as extract_fields_metadata};
pub use overlap::{OverlapRecord, identify_overlaps};
pub use pipeline::{ReconciliationReport, Reconciler};
pub use validation::{IncompatibilityReport, ValidationError, verify_data_types};

// Re-export models
pub use models::enums::*;
pub use models::{AlignedItem, Column, ColumnType, Nested, RecordSet, Table, Value, ValueKind};
