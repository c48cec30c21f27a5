//! Models module for the SDK
//!
//! Defines the in-memory shapes every reconciliation stage consumes and produces:
//! scalar values, tabular and nested record sets, and policy enums.

pub mod enums;
pub mod record_set;
pub mod value;

pub use enums::{ResolutionStrategy, TargetType};
pub use record_set::{AlignedItem, Column, ColumnType, Nested, RecordSet, RecordSetError, Table};
pub use value::{Value, ValueKind};
