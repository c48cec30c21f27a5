//! Conflict detection and resolution
//!
//! Both stages work on the tabular items of an aligned dataset:
//! - the *common key columns* are the columns present in every table at once, unless the
//!   caller names the key columns explicitly
//! - rows of all tables are combined into one row union tagged with their source
//! - rows sharing a key tuple form a group
//!
//! Detection reports groups whose non-key columns disagree; resolution keeps one whole
//! row per key tuple according to a [`ResolutionStrategy`](crate::models::ResolutionStrategy).

pub mod detect;
pub mod resolve;

pub use detect::{
    ConflictEntry, Conflicts, RowKey, SourceValues, detect_conflicts, detect_conflicts_on,
};
pub use resolve::{
    RESOLVED_SOURCE, ResolutionOptions, TIMESTAMP_COLUMN, parse_timestamp, resolve_by_hierarchy,
    resolve_by_time, resolve_by_weight, resolve_conflicts,
};

use crate::models::{AlignedItem, Table, Value, ValueKind};
use indexmap::IndexSet;
use tracing::warn;

/// Source label column added to every tagged row
pub const SOURCE_COLUMN: &str = "_source";
/// Hierarchy rank column
pub const PRIORITY_COLUMN: &str = "_priority";
/// Source weight column
pub const WEIGHT_COLUMN: &str = "_weight";

/// Columns owned by the engine; never keys, never compared, never emitted
pub const BOOKKEEPING_COLUMNS: [&str; 3] = [SOURCE_COLUMN, PRIORITY_COLUMN, WEIGHT_COLUMN];

pub(crate) fn is_bookkeeping(column: &str) -> bool {
    BOOKKEEPING_COLUMNS.contains(&column)
}

/// Tabular items with their source labels. Nested items are skipped.
pub(crate) fn tabular_items(items: &[AlignedItem]) -> Vec<(&str, &Table)> {
    items
        .iter()
        .filter_map(|item| item.data.as_table().map(|t| (item.file.as_str(), t)))
        .collect()
}

/// Columns present in every table, in the first table's column order.
pub(crate) fn common_columns(tables: &[(&str, &Table)], exclude: &[&str]) -> Vec<String> {
    let Some((_, first)) = tables.first() else {
        return Vec::new();
    };
    first
        .column_names()
        .filter(|name| !is_bookkeeping(name) && !exclude.contains(name))
        .filter(|name| tables.iter().all(|(_, t)| t.has_column(name)))
        .map(str::to_string)
        .collect()
}

/// Key columns for a set of tables.
///
/// Without a selection the key is every column common to all tables. A selection keeps
/// its own order and must name columns common to all tables, otherwise there is no key.
pub(crate) fn key_columns(
    tables: &[(&str, &Table)],
    selection: Option<&[String]>,
    exclude: &[&str],
) -> Vec<String> {
    let common = common_columns(tables, exclude);
    let Some(selection) = selection else {
        return common;
    };
    let selected: IndexSet<&String> = selection.iter().collect();
    match selected.iter().find(|c| !common.contains(**c)) {
        Some(missing) => {
            warn!(
                "Key column '{}' is not shared by every source or is reserved",
                missing
            );
            Vec::new()
        }
        None => selected.into_iter().cloned().collect(),
    }
}

/// A row of the combined union, tagged with its source
#[derive(Debug, Clone)]
pub(crate) struct TaggedRow<'a> {
    pub source: &'a str,
    /// Cells aligned with [`Combined::columns`]
    pub values: Vec<Value>,
}

/// Row union of several tables
#[derive(Debug, Clone)]
pub(crate) struct Combined<'a> {
    pub columns: IndexSet<String>,
    pub rows: Vec<TaggedRow<'a>>,
}

impl<'a> Combined<'a> {
    /// Concatenate tables. Columns are the union in first-seen order; a column a table
    /// lacks is `Null` for that table's rows. A column holding both ints and floats is
    /// widened to floats, so `1` and `1.0` group and compare as one value.
    pub fn new(tables: &[(&'a str, &Table)]) -> Self {
        let columns: IndexSet<String> = tables
            .iter()
            .flat_map(|(_, t)| t.column_names())
            .filter(|name| !is_bookkeeping(name))
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for &(source, table) in tables {
            for row in 0..table.num_rows() {
                let values = columns
                    .iter()
                    .map(|c| table.get(row, c).cloned().unwrap_or(Value::Null))
                    .collect();
                rows.push(TaggedRow { source, values });
            }
        }
        for index in 0..columns.len() {
            widen_mixed_numbers(&mut rows, index);
        }
        Self { columns, rows }
    }

    pub fn indices_of(&self, columns: &[String]) -> Vec<usize> {
        columns
            .iter()
            .filter_map(|c| self.columns.get_index_of(c.as_str()))
            .collect()
    }

    pub fn key_of(&self, row: &TaggedRow<'_>, key_indices: &[usize]) -> Vec<Value> {
        key_indices.iter().map(|&i| row.values[i].clone()).collect()
    }
}

fn widen_mixed_numbers(rows: &mut [TaggedRow<'_>], index: usize) {
    let holds = |kind: ValueKind| rows.iter().any(|row| row.values[index].kind() == kind);
    if !(holds(ValueKind::Int) && holds(ValueKind::Float)) {
        return;
    }
    for row in rows.iter_mut() {
        if let Value::Int(i) = row.values[index] {
            row.values[index] = Value::float(i as f64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_columns_is_full_intersection() {
        let a = Table::from_records(vec![vec![("id", 1), ("x", 1), ("_source", 1)]]);
        let b = Table::from_records(vec![vec![("x", 2), ("id", 2)]]);
        let c = Table::from_records(vec![vec![("id", 3)]]);

        let tables = vec![("a", &a), ("b", &b)];
        assert_eq!(common_columns(&tables, &[]), vec!["id", "x"]);

        let tables = vec![("a", &a), ("b", &b), ("c", &c)];
        assert_eq!(common_columns(&tables, &[]), vec!["id"]);
        assert!(common_columns(&tables, &["id"]).is_empty());
    }

    #[test]
    fn explicit_key_columns_must_be_common() {
        let a = Table::from_records(vec![vec![("id", 1), ("x", 1)]]);
        let b = Table::from_records(vec![vec![("x", 2), ("id", 2), ("y", 2)]]);
        let tables = vec![("a", &a), ("b", &b)];
        let keys = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();

        assert_eq!(key_columns(&tables, None, &[]), vec!["id", "x"]);
        assert_eq!(
            key_columns(&tables, Some(keys(&["x", "id", "x"]).as_slice()), &[]),
            vec!["x", "id"]
        );
        assert!(key_columns(&tables, Some(keys(&["y"]).as_slice()), &[]).is_empty());
        assert!(key_columns(&tables, Some(keys(&["id"]).as_slice()), &["id"]).is_empty());
        assert!(key_columns(&tables, Some(keys(&[]).as_slice()), &[]).is_empty());
    }

    #[test]
    fn combined_fills_absent_columns_with_null() {
        let a = Table::from_records(vec![vec![("id", 1), ("x", 10)]]);
        let b = Table::from_records(vec![vec![("id", 2), ("y", 20)]]);
        let combined = Combined::new(&[("a", &a), ("b", &b)]);

        assert_eq!(
            combined.columns.iter().collect::<Vec<_>>(),
            vec!["id", "x", "y"]
        );
        assert_eq!(combined.rows[0].values[2], Value::Null);
        assert_eq!(combined.rows[1].values[1], Value::Null);
        assert_eq!(combined.rows[1].source, "b");
    }

    #[test]
    fn combined_widens_ints_mixed_with_floats() {
        let a = Table::from_records(vec![vec![("id", Value::from(1)), ("n", Value::from(2))]]);
        let b = Table::from_records(vec![vec![
            ("id", Value::from(1.0)),
            ("n", Value::from(3)),
        ]]);
        let combined = Combined::new(&[("a", &a), ("b", &b)]);

        assert_eq!(combined.rows[0].values[0], Value::from(1.0));
        assert_eq!(combined.rows[0].values[0], combined.rows[1].values[0]);
        // Int-only columns stay ints
        assert_eq!(combined.rows[0].values[1], Value::from(2));
    }
}
