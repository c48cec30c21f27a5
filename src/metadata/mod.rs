//! Field metadata extraction
//!
//! Summarises one source as a map from field path to observed type and a bounded sample
//! of values.
//!
//! Path rules for nested data:
//! - mapping keys are joined to the accumulated path with `.`
//! - sequence elements are visited without extending the path, so leaves repeated across
//!   list elements accumulate under one path
//! - only scalars held by a mapping key are leaves; scalars directly inside a sequence
//!   and a bare scalar root are not recorded

use crate::models::{AlignedItem, Nested, RecordSet, Table, Value};
use indexmap::IndexMap;
use serde::Serialize;

/// Maximum number of sample values kept per field
pub const MAX_SAMPLE_VALUES: usize = 5;

/// Observed type and sample values of one field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMetadata {
    /// Declared column type (tabular) or runtime type of the first leaf seen (nested)
    pub dtype: String,
    /// At most [`MAX_SAMPLE_VALUES`] values in first-seen order
    pub sample_values: Vec<Value>,
}

/// Field path -> metadata, in first-seen order
pub type FieldMetadataMap = IndexMap<String, FieldMetadata>;

/// Extract field metadata from one source's record set.
///
/// # Example
///
/// ```rust
/// use data_unification_sdk::metadata::extract;
/// use data_unification_sdk::models::{Nested, RecordSet};
/// use serde_json::json;
///
/// let data = RecordSet::Nested(Nested::from(json!({"user": {"name": "ada"}})));
/// let metadata = extract(&data);
/// assert_eq!(metadata["user.name"].dtype, "str");
/// ```
pub fn extract(data: &RecordSet) -> FieldMetadataMap {
    match data {
        RecordSet::Tabular(table) => extract_tabular(table),
        RecordSet::Nested(nested) => extract_nested(nested),
    }
}

/// Extract metadata for every item, keyed by source identifier.
pub fn extract_all(items: &[AlignedItem]) -> IndexMap<String, FieldMetadataMap> {
    items
        .iter()
        .map(|item| (item.file.clone(), extract(&item.data)))
        .collect()
}

fn extract_tabular(table: &Table) -> FieldMetadataMap {
    table
        .columns()
        .iter()
        .map(|column| {
            let sample_values = column
                .distinct_non_null()
                .into_iter()
                .take(MAX_SAMPLE_VALUES)
                .cloned()
                .collect();
            (
                column.name.clone(),
                FieldMetadata {
                    dtype: column.dtype.as_str().to_string(),
                    sample_values,
                },
            )
        })
        .collect()
}

fn extract_nested(nested: &Nested) -> FieldMetadataMap {
    let mut metadata = FieldMetadataMap::new();
    visit_leaves(nested, &mut |path, value| match metadata.get_mut(path) {
        Some(entry) => {
            if entry.sample_values.len() < MAX_SAMPLE_VALUES {
                entry.sample_values.push(value.clone());
            }
        }
        None => {
            metadata.insert(
                path.to_string(),
                FieldMetadata {
                    dtype: value.type_name().to_string(),
                    sample_values: vec![value.clone()],
                },
            );
        }
    });
    metadata
}

/// Visit every leaf of a nested record set with its dotted path.
pub(crate) fn visit_leaves(nested: &Nested, visit: &mut dyn FnMut(&str, &Value)) {
    walk(nested, "", visit);
}

fn walk(nested: &Nested, path: &str, visit: &mut dyn FnMut(&str, &Value)) {
    match nested {
        Nested::Mapping(map) => {
            for (key, child) in map {
                let child_path = join_path(path, key);
                match child {
                    Nested::Scalar(value) => visit(&child_path, value),
                    _ => walk(child, &child_path, visit),
                }
            }
        }
        Nested::Sequence(items) => {
            for item in items {
                walk(item, path, visit);
            }
        }
        Nested::Scalar(_) => {}
    }
}

/// Join a key onto an accumulated dotted path.
pub(crate) fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}
