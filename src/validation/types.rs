//! Type compatibility verification
//!
//! After resolution every field should carry one type across all fragments. Tabular
//! fragments contribute their declared column types; nested fragments contribute the
//! runtime type of every leaf under the same path rules as metadata extraction.

use crate::metadata::visit_leaves;
use crate::models::{AlignedItem, RecordSet};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;

/// Fields observed with more than one type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
#[must_use = "type incompatibilities should be resolved by explicit conversion"]
pub struct IncompatibilityReport {
    /// Field path -> distinct type names observed
    pub fields: IndexMap<String, BTreeSet<String>>,
}

impl IncompatibilityReport {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: &str) -> Option<&BTreeSet<String>> {
        self.fields.get(field)
    }
}

/// Collect every type seen per field and report the fields with more than one.
///
/// # Example
///
/// ```rust
/// use data_unification_sdk::models::{AlignedItem, Nested};
/// use data_unification_sdk::validation::verify_data_types;
/// use serde_json::json;
///
/// let items = vec![
///     AlignedItem::new("a", Nested::from(json!({"age": 30}))),
///     AlignedItem::new("b", Nested::from(json!({"age": "30"}))),
/// ];
/// let report = verify_data_types(&items);
/// assert_eq!(report.get("age").unwrap().len(), 2);
/// ```
pub fn verify_data_types(items: &[AlignedItem]) -> IncompatibilityReport {
    let mut field_types: IndexMap<String, BTreeSet<String>> = IndexMap::new();
    for item in items {
        match &item.data {
            RecordSet::Tabular(table) => {
                for column in table.columns() {
                    field_types
                        .entry(column.name.clone())
                        .or_default()
                        .insert(column.dtype.as_str().to_string());
                }
            }
            RecordSet::Nested(nested) => visit_leaves(nested, &mut |path, value| {
                field_types
                    .entry(path.to_string())
                    .or_default()
                    .insert(value.type_name().to_string());
            }),
        }
    }

    field_types.retain(|_, types| types.len() > 1);
    IncompatibilityReport {
        fields: field_types,
    }
}
