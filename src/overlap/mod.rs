//! Cross-source overlap identification
//!
//! Finds field names that appear in more than one source and summarises how their
//! declared types and sample value types line up. Matching is on identical field names
//! only.

use crate::metadata::{FieldMetadata, FieldMetadataMap};
use crate::models::ValueKind;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// A field shared by two or more sources
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapRecord {
    pub field_name: String,
    /// Sources carrying the field, in first-seen order
    pub sources: IndexSet<String>,
    /// Declared dtype per source
    pub data_types: IndexMap<String, String>,
    /// Runtime type of each sample value, per source
    pub value_patterns: IndexMap<String, Vec<ValueKind>>,
}

impl OverlapRecord {
    /// Whether every source declares the same dtype for this field
    pub fn has_consistent_types(&self) -> bool {
        let mut types = self.data_types.values();
        match types.next() {
            Some(first) => types.all(|t| t == first),
            None => true,
        }
    }

    /// Whether every source's samples share one runtime type
    pub fn has_consistent_value_patterns(&self) -> bool {
        let kinds: IndexSet<&ValueKind> = self.value_patterns.values().flatten().collect();
        kinds.len() <= 1
    }
}

/// Identify fields observed in at least two sources.
///
/// Output order follows the first appearance of each field name while walking the
/// sources in order.
pub fn identify_overlaps(per_source: &IndexMap<String, FieldMetadataMap>) -> Vec<OverlapRecord> {
    let mut field_info: IndexMap<&str, IndexMap<&str, &FieldMetadata>> = IndexMap::new();
    for (source, fields) in per_source {
        for (field_name, field_meta) in fields {
            field_info
                .entry(field_name.as_str())
                .or_default()
                .insert(source.as_str(), field_meta);
        }
    }

    field_info
        .into_iter()
        .filter(|(_, sources)| sources.len() > 1)
        .map(|(field_name, sources)| {
            let mut data_types = IndexMap::new();
            let mut value_patterns = IndexMap::new();
            for (source, meta) in &sources {
                data_types.insert(source.to_string(), meta.dtype.clone());
                value_patterns.insert(
                    source.to_string(),
                    meta.sample_values.iter().map(|v| v.kind()).collect(),
                );
            }
            OverlapRecord {
                field_name: field_name.to_string(),
                sources: sources.keys().map(|s| s.to_string()).collect(),
                data_types,
                value_patterns,
            }
        })
        .collect()
}
