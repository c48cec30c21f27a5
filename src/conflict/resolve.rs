//! Conflict resolution
//!
//! The hierarchy, weight and time strategies share one shape: tag every row with a
//! priority, stable-sort the row union by it, and keep the first row of every key tuple.
//! The surviving row is one source's whole record, never a per-column merge.
//!
//! Rows are de-duplicated on the key columns: every column common to all tables, or the
//! columns named by the caller. When no tables are usable or there is no key, a strategy
//! hands back its input unchanged.

use super::detect::{Conflicts, RowKey};
use super::{Combined, TaggedRow, key_columns, tabular_items};
use crate::models::{AlignedItem, Column, RecordSet, ResolutionStrategy, Table, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Source identifier of the consolidated table
pub const RESOLVED_SOURCE: &str = "resolved_data";

/// Column the time strategy orders by
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Caller-supplied resolution policy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionOptions {
    pub strategy: ResolutionStrategy,
    /// Source -> weight; unlisted sources weigh 0
    pub source_weights: HashMap<String, f64>,
    /// Sources by precedence, highest first; unlisted sources rank last
    pub source_hierarchy: Vec<String>,
    /// Explicit key columns; `None` keys on every column common to all tables
    pub key_columns: Option<Vec<String>>,
}

impl ResolutionOptions {
    pub fn new(strategy: ResolutionStrategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    pub fn with_weights<S: Into<String>>(
        mut self,
        weights: impl IntoIterator<Item = (S, f64)>,
    ) -> Self {
        self.source_weights = weights.into_iter().map(|(s, w)| (s.into(), w)).collect();
        self
    }

    pub fn with_hierarchy<S: Into<String>>(
        mut self,
        hierarchy: impl IntoIterator<Item = S>,
    ) -> Self {
        self.source_hierarchy = hierarchy.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_key_columns<S: Into<String>>(
        mut self,
        key_columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.key_columns = Some(key_columns.into_iter().map(Into::into).collect());
        self
    }
}

/// Resolve conflicts with the configured strategy.
///
/// `Manual` returns the input untouched for resolution by hand.
pub fn resolve_conflicts(
    items: Vec<AlignedItem>,
    conflicts: &Conflicts,
    options: &ResolutionOptions,
) -> Vec<AlignedItem> {
    debug!(
        "Resolving {} conflicting group(s) with the {} strategy",
        conflicts.len(),
        options.strategy
    );
    let keys = options.key_columns.as_deref();
    match options.strategy {
        ResolutionStrategy::Manual => items,
        ResolutionStrategy::Hierarchy => {
            resolve_by_hierarchy(items, &options.source_hierarchy, keys)
        }
        ResolutionStrategy::Weight => resolve_by_weight(items, &options.source_weights, keys),
        ResolutionStrategy::Time => resolve_by_time(items, keys),
    }
}

/// Keep, per key tuple, the row of the source listed earliest in `hierarchy`.
pub fn resolve_by_hierarchy(
    items: Vec<AlignedItem>,
    hierarchy: &[String],
    key_columns: Option<&[String]>,
) -> Vec<AlignedItem> {
    let mut ranks: HashMap<&str, usize> = HashMap::new();
    for source in hierarchy {
        let next = ranks.len();
        ranks.entry(source.as_str()).or_insert(next);
    }
    let unranked = ranks.len();

    let resolved = {
        let tables = tabular_items(&items);
        keep_first_by(&tables, key_columns, &[], |row, _| {
            Some(ranks.get(row.source).copied().unwrap_or(unranked))
        })
    };
    finish(items, resolved, ResolutionStrategy::Hierarchy)
}

/// Keep, per key tuple, the row of the heaviest source.
pub fn resolve_by_weight(
    items: Vec<AlignedItem>,
    weights: &HashMap<String, f64>,
    key_columns: Option<&[String]>,
) -> Vec<AlignedItem> {
    let resolved = {
        let tables = tabular_items(&items);
        keep_first_by(&tables, key_columns, &[], |row, _| {
            Some(Reverse(OrderedFloat(source_weight(weights, row.source))))
        })
    };
    finish(items, resolved, ResolutionStrategy::Weight)
}

/// Weight of a source for sorting; NaN weighs least.
fn source_weight(weights: &HashMap<String, f64>, source: &str) -> f64 {
    match weights.get(source).copied().unwrap_or(0.0) {
        w if w.is_nan() => f64::NEG_INFINITY,
        w => w,
    }
}

/// Keep, per key tuple, the row with the latest `timestamp`.
///
/// Only tables carrying a `timestamp` column take part. `timestamp` is neither part of the
/// key nor of the output. Rows whose timestamp cannot be parsed are dropped before grouping.
pub fn resolve_by_time(
    items: Vec<AlignedItem>,
    key_columns: Option<&[String]>,
) -> Vec<AlignedItem> {
    let resolved = {
        let tables: Vec<_> = tabular_items(&items)
            .into_iter()
            .filter(|(_, table)| table.has_column(TIMESTAMP_COLUMN))
            .collect();
        keep_first_by(&tables, key_columns, &[TIMESTAMP_COLUMN], |row, combined| {
            let index = combined.columns.get_index_of(TIMESTAMP_COLUMN)?;
            parse_timestamp(&row.values[index]).map(Reverse)
        })
    };
    finish(items, resolved, ResolutionStrategy::Time)
}

/// Parse a timestamp cell.
///
/// Accepts dates, datetimes, and text in RFC 3339, `%Y-%m-%d %H:%M:%S`,
/// `%Y-%m-%dT%H:%M:%S` or `%Y-%m-%d` form.
pub fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::Date(date) => date.and_hms_opt(0, 0, 0),
        Value::Text(text) => {
            let text = text.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Some(dt.naive_utc());
            }
            for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
                    return Some(dt);
                }
            }
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }
        _ => None,
    }
}

fn finish(
    items: Vec<AlignedItem>,
    resolved: Option<Table>,
    strategy: ResolutionStrategy,
) -> Vec<AlignedItem> {
    match resolved {
        Some(table) => {
            info!(
                "{} resolution kept {} row(s) across {} column(s)",
                strategy,
                table.num_rows(),
                table.num_columns()
            );
            vec![AlignedItem::new(RESOLVED_SOURCE, RecordSet::Tabular(table))]
        }
        None => {
            info!(
                "{} resolution skipped: no usable tables or no key columns",
                strategy
            );
            items
        }
    }
}

fn keep_first_by<K: Ord>(
    tables: &[(&str, &Table)],
    selection: Option<&[String]>,
    priority_columns: &[&str],
    priority: impl Fn(&TaggedRow<'_>, &Combined<'_>) -> Option<K>,
) -> Option<Table> {
    if tables.is_empty() {
        return None;
    }
    let key_columns = key_columns(tables, selection, priority_columns);
    if key_columns.is_empty() {
        return None;
    }
    let combined = Combined::new(tables);
    let key_indices = combined.indices_of(&key_columns);

    let mut ranked: Vec<(K, usize)> = combined
        .rows
        .iter()
        .enumerate()
        .filter_map(|(index, row)| priority(row, &combined).map(|p| (p, index)))
        .collect();
    let dropped = combined.rows.len() - ranked.len();
    if dropped > 0 {
        debug!("Dropped {} row(s) without a usable priority", dropped);
    }
    // Stable: ties keep concatenation order
    ranked.sort_by(|a, b| a.0.cmp(&b.0));

    let mut seen: HashSet<RowKey> = HashSet::new();
    let survivors: Vec<usize> = ranked
        .into_iter()
        .map(|(_, index)| index)
        .filter(|&index| seen.insert(combined.key_of(&combined.rows[index], &key_indices)))
        .collect();

    // Priority columns are consumed by the sort and not emitted
    let columns = combined
        .columns
        .iter()
        .enumerate()
        .filter(|(_, name)| !priority_columns.contains(&name.as_str()))
        .map(|(column_index, name)| {
            let values = survivors
                .iter()
                .map(|&row| combined.rows[row].values[column_index].clone())
                .collect();
            Column::new(name.clone(), values)
        })
        .collect();

    match Table::from_columns(columns) {
        Ok(table) => Some(table),
        Err(e) => {
            warn!("Failed to assemble resolved table: {}", e);
            None
        }
    }
}
