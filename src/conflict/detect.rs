//! Conflict detection
//!
//! Groups the combined rows of all tabular sources by the common key columns and reports
//! every group, seen in two or more sources, in which a non-key column carries more than
//! one distinct non-null value.

use super::{Combined, key_columns, tabular_items};
use crate::models::record_set::distinct_non_null;
use crate::models::{AlignedItem, Value};
use indexmap::{IndexMap, IndexSet};
use serde::ser::{Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Values of the common key columns for one group, in key column order
pub type RowKey = Vec<Value>;

/// Source identifier -> that source's distinct non-null values for one column
pub type SourceValues = IndexMap<String, Vec<Value>>;

/// Conflicting column -> per-source values
pub type ConflictEntry = IndexMap<String, SourceValues>;

/// Result of conflict detection.
///
/// Entries are ordered by key tuple.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "detected conflicts should be reviewed or handed to a resolution strategy"]
pub struct Conflicts {
    /// Columns used to group rows
    pub key_columns: Vec<String>,
    pub entries: BTreeMap<RowKey, ConflictEntry>,
}

impl Conflicts {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &[Value]) -> Option<&ConflictEntry> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RowKey, &ConflictEntry)> {
        self.entries.iter()
    }
}

#[derive(serde::Serialize)]
struct ConflictRecord<'a> {
    key: IndexMap<&'a str, &'a Value>,
    fields: &'a ConflictEntry,
}

impl Serialize for Conflicts {
    /// Serialized as a list of `{key, fields}` records, the key labelled by column name.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter().map(|(key, fields)| ConflictRecord {
            key: self
                .key_columns
                .iter()
                .map(String::as_str)
                .zip(key.iter())
                .collect(),
            fields,
        }))
    }
}

/// Detect conflicting values across sources, keyed by every column common to all tables.
///
/// Nested items are ignored. Fewer than two tables, or no column common to every table,
/// yields an empty result. Rows with a missing key value are not grouped.
///
/// When the sources share all their columns, every column is part of the key and no group
/// can disagree; use [`detect_conflicts_on`] to name the key columns.
///
/// # Example
///
/// ```rust
/// use data_unification_sdk::conflict::detect_conflicts;
/// use data_unification_sdk::models::{AlignedItem, Table, Value};
///
/// let a = Table::from_records(vec![
///     vec![("id", Value::from(1)), ("v", Value::from("a"))],
///     vec![("id", Value::from(1)), ("v", Value::from("b"))],
/// ]);
/// let b = Table::from_records(vec![vec![("id", Value::from(1)), ("w", Value::from("z"))]]);
/// let conflicts = detect_conflicts(&[AlignedItem::new("A", a), AlignedItem::new("B", b)]);
///
/// assert_eq!(conflicts.key_columns, vec!["id"]);
/// let entry = conflicts.get(&[Value::from(1)]).unwrap();
/// assert_eq!(entry["v"]["A"], vec![Value::from("a"), Value::from("b")]);
/// ```
pub fn detect_conflicts(items: &[AlignedItem]) -> Conflicts {
    detect_with(items, None)
}

/// Detect conflicting values across sources, grouping rows by `key_columns`.
///
/// Every key column must be present in every table, otherwise the result is empty.
///
/// # Example
///
/// ```rust
/// use data_unification_sdk::conflict::detect_conflicts_on;
/// use data_unification_sdk::models::{AlignedItem, Table, Value};
///
/// let a = Table::from_records(vec![vec![("id", Value::from(1)), ("v", Value::from("a"))]]);
/// let b = Table::from_records(vec![vec![("id", Value::from(1)), ("v", Value::from("b"))]]);
/// let items = [AlignedItem::new("A", a), AlignedItem::new("B", b)];
/// let conflicts = detect_conflicts_on(&items, &["id".to_string()]);
///
/// let entry = conflicts.get(&[Value::from(1)]).unwrap();
/// assert_eq!(entry["v"]["A"], vec![Value::from("a")]);
/// assert_eq!(entry["v"]["B"], vec![Value::from("b")]);
/// ```
pub fn detect_conflicts_on(items: &[AlignedItem], key_columns: &[String]) -> Conflicts {
    detect_with(items, Some(key_columns))
}

fn detect_with(items: &[AlignedItem], selection: Option<&[String]>) -> Conflicts {
    let tables = tabular_items(items);
    if tables.len() < 2 {
        debug!(
            "Conflict detection needs at least two tables, found {}",
            tables.len()
        );
        return Conflicts::default();
    }

    let key_columns = key_columns(&tables, selection, &[]);
    if key_columns.is_empty() {
        info!("No key column is shared by all sources; nothing to compare");
        return Conflicts::default();
    }

    let sources: IndexSet<&str> = tables.iter().map(|(source, _)| *source).collect();
    let combined = Combined::new(&tables);
    let key_indices = combined.indices_of(&key_columns);

    let mut groups: BTreeMap<RowKey, Vec<usize>> = BTreeMap::new();
    for (index, row) in combined.rows.iter().enumerate() {
        let key = combined.key_of(row, &key_indices);
        if key.iter().any(Value::is_null) {
            continue;
        }
        groups.entry(key).or_default().push(index);
    }

    let mut entries = BTreeMap::new();
    for (key, members) in groups {
        let rows: Vec<_> = members.iter().map(|&i| &combined.rows[i]).collect();
        let present: IndexSet<&str> = rows.iter().map(|r| r.source).collect();
        if present.len() < 2 {
            continue;
        }

        let mut fields = ConflictEntry::new();
        for (column_index, column) in combined.columns.iter().enumerate() {
            if key_indices.contains(&column_index) {
                continue;
            }
            let all_values = distinct_non_null(rows.iter().map(|r| &r.values[column_index]));
            if all_values.len() <= 1 {
                continue;
            }

            let mut per_source = SourceValues::new();
            for source in &sources {
                let values = distinct_non_null(
                    rows.iter()
                        .filter(|r| r.source == *source)
                        .map(|r| &r.values[column_index]),
                );
                if !values.is_empty() {
                    per_source.insert(source.to_string(), values.into_iter().cloned().collect());
                }
            }
            fields.insert(column.clone(), per_source);
        }

        if !fields.is_empty() {
            debug!(
                "Conflict on key {:?}: {} column(s) disagree",
                key,
                fields.len()
            );
            entries.insert(key, fields);
        }
    }

    info!(
        "Detected {} conflicting group(s) across {} source(s) keyed by {:?}",
        entries.len(),
        sources.len(),
        key_columns
    );
    Conflicts {
        key_columns,
        entries,
    }
}
