//! Bulk type conversion over resolved fragments
//!
//! Applies a field -> target type mapping to every item. Each field is converted
//! independently and the outcome of every field is returned, so callers can see partial
//! success instead of relying on the log.
//!
//! - Tabular: each listed column is cast as a whole. If any cell fails, that column is
//!   left untouched; columns already cast stay cast.
//! - Nested: the first mapping key on the way down whose dotted path is listed is
//!   converted in place and not descended into.

use super::converter::{ConversionError, convert_value, try_convert_value};
use crate::metadata::join_path;
use crate::models::{AlignedItem, ColumnType, Nested, RecordSet, Table, TargetType};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, warn};

/// Field path -> target type
pub type FieldConversions = IndexMap<String, TargetType>;

/// Outcome of converting one field of one item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldConversion {
    /// Source identifier of the item
    pub file: String,
    pub field: String,
    pub target: TargetType,
    /// Number of cells or leaves converted
    pub converted: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ConversionError>,
}

impl FieldConversion {
    fn new(file: &str, field: &str, target: TargetType) -> Self {
        Self {
            file: file.to_string(),
            field: field.to_string(),
            target,
            converted: 0,
            errors: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Converted items plus the per-field outcomes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionReport {
    pub items: Vec<AlignedItem>,
    pub fields: Vec<FieldConversion>,
}

impl ConversionReport {
    pub fn failures(&self) -> impl Iterator<Item = &FieldConversion> {
        self.fields.iter().filter(|f| !f.is_success())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// Apply `conversions` to every item.
pub fn convert_data_types(
    items: Vec<AlignedItem>,
    conversions: &FieldConversions,
) -> ConversionReport {
    let mut fields = Vec::new();
    let items = items
        .into_iter()
        .map(|mut item| {
            match &mut item.data {
                RecordSet::Tabular(table) => {
                    fields.extend(convert_table(table, &item.file, conversions));
                }
                RecordSet::Nested(nested) => {
                    let (converted, outcomes) = convert_nested(nested, &item.file, conversions);
                    *nested = converted;
                    fields.extend(outcomes);
                }
            }
            item
        })
        .collect();

    let report = ConversionReport { items, fields };
    info!(
        "Applied {} field conversion(s), {} failed",
        report.fields.len(),
        report.failures().count()
    );
    report
}

/// Cast the listed columns of a table in place.
pub fn convert_table(
    table: &mut Table,
    file: &str,
    conversions: &FieldConversions,
) -> Vec<FieldConversion> {
    let mut outcomes = Vec::with_capacity(conversions.len());
    for (field, &target) in conversions {
        let mut outcome = FieldConversion::new(file, field, target);
        match cast_column(table, field, target) {
            Ok(converted) => outcome.converted = converted,
            Err(e) => {
                warn!(
                    "Error converting field '{}' to '{}' in {}: {}",
                    field, target, file, e
                );
                outcome.errors.push(e);
            }
        }
        outcomes.push(outcome);
    }
    outcomes
}

fn cast_column(table: &mut Table, field: &str, target: TargetType) -> Result<usize, ConversionError> {
    let column = table
        .column(field)
        .ok_or_else(|| ConversionError::MissingField {
            field: field.to_string(),
        })?;

    let mut values = Vec::with_capacity(column.values.len());
    for (row, value) in column.values.iter().enumerate() {
        let converted =
            try_convert_value(value, target).map_err(|e| ConversionError::Column {
                field: field.to_string(),
                target,
                row,
                reason: e.to_string(),
            })?;
        values.push(converted);
    }

    let converted = values.iter().filter(|v| !v.is_null()).count();
    table
        .replace_column(field, values, column_type_for(target))
        .map_err(|_| ConversionError::MissingField {
            field: field.to_string(),
        })?;
    Ok(converted)
}

fn column_type_for(target: TargetType) -> ColumnType {
    match target {
        TargetType::Int => ColumnType::Int,
        TargetType::Float => ColumnType::Float,
        TargetType::Str => ColumnType::Text,
        TargetType::Datetime => ColumnType::DateTime,
    }
}

/// Convert matching paths of a nested record set, returning a new value.
pub fn convert_nested(
    nested: &Nested,
    file: &str,
    conversions: &FieldConversions,
) -> (Nested, Vec<FieldConversion>) {
    let mut outcomes: IndexMap<&str, FieldConversion> = conversions
        .iter()
        .map(|(field, &target)| (field.as_str(), FieldConversion::new(file, field, target)))
        .collect();
    let converted = convert_walk(nested, "", conversions, &mut outcomes);
    (converted, outcomes.into_values().collect())
}

fn convert_walk(
    nested: &Nested,
    path: &str,
    conversions: &FieldConversions,
    outcomes: &mut IndexMap<&str, FieldConversion>,
) -> Nested {
    match nested {
        Nested::Mapping(map) => Nested::Mapping(
            map.iter()
                .map(|(key, child)| {
                    let child_path = join_path(path, key);
                    let converted = match conversions.get(&child_path) {
                        Some(&target) => convert_leaf(child, &child_path, target, outcomes),
                        None => convert_walk(child, &child_path, conversions, outcomes),
                    };
                    (key.clone(), converted)
                })
                .collect(),
        ),
        Nested::Sequence(items) => Nested::Sequence(
            items
                .iter()
                .map(|item| convert_walk(item, path, conversions, outcomes))
                .collect(),
        ),
        Nested::Scalar(value) => Nested::Scalar(value.clone()),
    }
}

fn convert_leaf(
    child: &Nested,
    path: &str,
    target: TargetType,
    outcomes: &mut IndexMap<&str, FieldConversion>,
) -> Nested {
    let outcome = outcomes.get_mut(path);
    match child {
        Nested::Scalar(value) => {
            let conversion = convert_value(value, target);
            if let Some(outcome) = outcome {
                match conversion.error {
                    Some(e) => outcome.errors.push(e),
                    None => outcome.converted += 1,
                }
            }
            Nested::Scalar(conversion.value)
        }
        _ => {
            let e = ConversionError::NotScalar {
                field: path.to_string(),
                target,
            };
            warn!("{}", e);
            if let Some(outcome) = outcome {
                outcome.errors.push(e);
            }
            child.clone()
        }
    }
}
