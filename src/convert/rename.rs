//! Field renaming
//!
//! Tabular columns are renamed by exact name. Nested mapping keys are renamed by key name
//! at every depth, so `{"cust_id": "customer_id"}` applies inside list elements and
//! sub-mappings alike.

use crate::models::{Nested, RecordSet, Table};
use indexmap::IndexMap;
use tracing::warn;

/// Old name -> new name
pub type FieldRenames = IndexMap<String, String>;

/// Rename fields of a record set.
///
/// A rename whose target already exists in a table is skipped with a warning. In nested
/// data the renamed key keeps its position and a later sibling with the same name
/// replaces its value.
///
/// # Example
///
/// ```rust
/// use data_unification_sdk::convert::rename_fields;
/// use data_unification_sdk::models::{Nested, RecordSet};
/// use indexmap::IndexMap;
/// use serde_json::json;
///
/// let renames = IndexMap::from([("cust".to_string(), "customer".to_string())]);
/// let data = RecordSet::from_json(json!({"orders": [{"cust": 7}]}));
/// let renamed = rename_fields(data, &renames);
/// assert_eq!(
///     renamed,
///     RecordSet::Nested(Nested::from(json!({"orders": [{"customer": 7}]})))
/// );
/// ```
pub fn rename_fields(data: RecordSet, renames: &FieldRenames) -> RecordSet {
    if renames.is_empty() {
        return data;
    }
    match data {
        RecordSet::Tabular(mut table) => {
            rename_columns(&mut table, renames);
            RecordSet::Tabular(table)
        }
        RecordSet::Nested(nested) => RecordSet::Nested(rename_keys(nested, renames)),
    }
}

fn rename_columns(table: &mut Table, renames: &FieldRenames) {
    for (from, to) in renames {
        if !table.has_column(from) {
            continue;
        }
        if let Err(e) = table.rename_column(from, to) {
            warn!("Skipping rename of '{}' to '{}': {}", from, to, e);
        }
    }
}

fn rename_keys(nested: Nested, renames: &FieldRenames) -> Nested {
    match nested {
        Nested::Mapping(map) => {
            let mut renamed = IndexMap::with_capacity(map.len());
            for (key, child) in map {
                let key = renames.get(&key).cloned().unwrap_or(key);
                renamed.insert(key, rename_keys(child, renames));
            }
            Nested::Mapping(renamed)
        }
        Nested::Sequence(items) => Nested::Sequence(
            items
                .into_iter()
                .map(|item| rename_keys(item, renames))
                .collect(),
        ),
        scalar @ Nested::Scalar(_) => scalar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Value;
    use serde_json::json;

    fn renames(pairs: &[(&str, &str)]) -> FieldRenames {
        pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn renames_table_columns() {
        let table = Table::from_records(vec![vec![("cust", Value::from(1)), ("amt", 2.into())]]);
        let renamed = rename_fields(
            RecordSet::Tabular(table),
            &renames(&[("cust", "customer_id"), ("missing", "x")]),
        );
        let table = renamed.as_table().unwrap();
        assert_eq!(
            table.column_names().collect::<Vec<_>>(),
            vec!["customer_id", "amt"]
        );
    }

    #[test]
    fn colliding_table_rename_is_skipped() {
        let table = Table::from_records(vec![vec![("a", 1), ("b", 2)]]);
        let renamed = rename_fields(RecordSet::Tabular(table), &renames(&[("a", "b")]));
        assert_eq!(
            renamed.as_table().unwrap().column_names().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn renames_nested_keys_at_every_depth() {
        let data = RecordSet::from_json(json!({
            "cust": {"cust": 1, "name": "x"},
            "items": [{"cust": 2}]
        }));
        let renamed = rename_fields(data, &renames(&[("cust", "customer")]));
        assert_eq!(
            renamed,
            RecordSet::Nested(Nested::from(json!({
                "customer": {"customer": 1, "name": "x"},
                "items": [{"customer": 2}]
            })))
        );
    }
}
