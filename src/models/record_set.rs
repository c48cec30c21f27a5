//! Source record sets
//!
//! A source hands over either a [`Table`] (named, equal-length columns) or a [`Nested`]
//! document (mappings, sequences and scalar leaves). [`AlignedItem`] pairs a record set
//! with the name of the source it came from.

use super::value::{Value, ValueKind};
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Error building or reshaping a record set
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordSetError {
    #[error("Column '{column}' has {actual} values, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),
    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}

/// Declared storage type of a column.
///
/// Names match [`ValueKind`] names so tabular and nested fragments can be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int,
    Float,
    Bool,
    #[serde(rename = "str")]
    Text,
    Date,
    #[serde(rename = "datetime")]
    DateTime,
    /// Mixed or entirely missing values
    Object,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Bool => "bool",
            ColumnType::Text => "str",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Object => "object",
        }
    }

    /// Infer the declared type from the non-null values of a column.
    ///
    /// A mix of ints and floats widens to `Float`; any other mix is `Object`.
    pub fn infer(values: &[Value]) -> Self {
        let mut inferred: Option<ColumnType> = None;
        for value in values.iter().filter(|v| !v.is_null()) {
            let kind = Self::from_kind(value.kind());
            inferred = Some(match inferred {
                None => kind,
                Some(current) if current == kind => current,
                Some(ColumnType::Int) if kind == ColumnType::Float => ColumnType::Float,
                Some(ColumnType::Float) if kind == ColumnType::Int => ColumnType::Float,
                Some(_) => return ColumnType::Object,
            });
        }
        inferred.unwrap_or(ColumnType::Object)
    }

    fn from_kind(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => ColumnType::Bool,
            ValueKind::Int => ColumnType::Int,
            ValueKind::Float => ColumnType::Float,
            ValueKind::Text => ColumnType::Text,
            ValueKind::Date => ColumnType::Date,
            ValueKind::DateTime => ColumnType::DateTime,
            ValueKind::Null => ColumnType::Object,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named column with a declared type
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: ColumnType,
    pub values: Vec<Value>,
}

impl Column {
    /// Create a column, inferring its declared type from the values.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        let dtype = ColumnType::infer(&values);
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    /// Override the declared type.
    pub fn with_dtype(mut self, dtype: ColumnType) -> Self {
        self.dtype = dtype;
        self
    }

    /// Distinct non-null values in first-seen order
    pub fn distinct_non_null(&self) -> Vec<&Value> {
        distinct_non_null(self.values.iter())
    }
}

/// Distinct non-null values of an iterator, in first-seen order
pub fn distinct_non_null<'a>(values: impl Iterator<Item = &'a Value>) -> Vec<&'a Value> {
    let mut seen = HashSet::new();
    values
        .filter(|v| !v.is_null())
        .filter(|v| seen.insert(*v))
        .collect()
}

/// Tabular record set.
///
/// All columns have the same length and column names are unique.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from columns, rejecting ragged or duplicate columns.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, RecordSetError> {
        let mut names = HashSet::new();
        let expected = columns.first().map_or(0, |c| c.values.len());
        for column in &columns {
            if !names.insert(column.name.as_str()) {
                return Err(RecordSetError::DuplicateColumn(column.name.clone()));
            }
            if column.values.len() != expected {
                return Err(RecordSetError::RaggedColumn {
                    column: column.name.clone(),
                    expected,
                    actual: column.values.len(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Build a table from row mappings.
    ///
    /// Columns are the union of all row keys in first-seen order; cells a row does not
    /// mention are `Null`. Declared types are inferred per column.
    pub fn from_records<R, K, V>(records: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut cells: IndexMap<String, Vec<Value>> = IndexMap::new();
        let mut row_count = 0;
        for record in records {
            for (key, value) in record {
                let column = cells
                    .entry(key.into())
                    .or_insert_with(|| vec![Value::Null; row_count]);
                // A key repeated within one row overwrites the earlier cell
                if column.len() > row_count {
                    column.truncate(row_count);
                }
                column.push(value.into());
            }
            row_count += 1;
            for column in cells.values_mut() {
                column.resize(row_count, Value::Null);
            }
        }
        Self {
            columns: cells
                .into_iter()
                .map(|(name, values)| Column::new(name, values))
                .collect(),
        }
    }

    /// Interpret a JSON array of flat objects as a table.
    ///
    /// Returns `None` when the document is not an array, or when any element is not an
    /// object of scalars.
    pub fn from_json_rows(json: &serde_json::Value) -> Option<Self> {
        let rows = json.as_array()?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let object = row.as_object()?;
            let mut record = Vec::with_capacity(object.len());
            for (key, value) in object {
                record.push((key.clone(), Value::from_json_scalar(value)?));
            }
            records.push(record);
        }
        Some(Self::from_records(records))
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Cells of one row keyed by column name
    pub fn row(&self, index: usize) -> Option<IndexMap<&str, &Value>> {
        if index >= self.num_rows() {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| (c.name.as_str(), &c.values[index]))
                .collect(),
        )
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        self.column(column).and_then(|c| c.values.get(row))
    }

    /// Replace the values and declared type of an existing column.
    pub fn replace_column(
        &mut self,
        name: &str,
        values: Vec<Value>,
        dtype: ColumnType,
    ) -> Result<(), RecordSetError> {
        let expected = self.num_rows();
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| RecordSetError::ColumnNotFound(name.to_string()))?;
        if values.len() != expected {
            return Err(RecordSetError::RaggedColumn {
                column: name.to_string(),
                expected,
                actual: values.len(),
            });
        }
        column.values = values;
        column.dtype = dtype;
        Ok(())
    }

    /// Rename a column in place.
    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<(), RecordSetError> {
        if from == to {
            return Ok(());
        }
        if self.has_column(to) {
            return Err(RecordSetError::DuplicateColumn(to.to_string()));
        }
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == from)
            .ok_or_else(|| RecordSetError::ColumnNotFound(from.to_string()))?;
        column.name = to.to_string();
        Ok(())
    }
}

impl Serialize for Table {
    /// Serialized as a sequence of row mappings.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq((0..self.num_rows()).filter_map(|i| self.row(i)))
    }
}

/// Nested (semi-structured) record set
#[derive(Debug, Clone, PartialEq)]
pub enum Nested {
    Mapping(IndexMap<String, Nested>),
    Sequence(Vec<Nested>),
    Scalar(Value),
}

impl Nested {
    pub fn scalar(value: impl Into<Value>) -> Self {
        Nested::Scalar(value.into())
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, Nested>> {
        match self {
            Nested::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Render as plain JSON.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Nested::Mapping(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Nested::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Nested::to_json).collect())
            }
            Nested::Scalar(value) => value.to_json(),
        }
    }
}

impl From<serde_json::Value> for Nested {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Object(object) => Nested::Mapping(
                object
                    .into_iter()
                    .map(|(k, v)| (k, Nested::from(v)))
                    .collect(),
            ),
            serde_json::Value::Array(items) => {
                Nested::Sequence(items.into_iter().map(Nested::from).collect())
            }
            scalar => Nested::Scalar(Value::from_json_scalar(&scalar).unwrap_or(Value::Null)),
        }
    }
}

impl Serialize for Nested {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Nested::Mapping(map) => {
                let mut state = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    state.serialize_entry(key, value)?;
                }
                state.end()
            }
            Nested::Sequence(items) => serializer.collect_seq(items),
            Nested::Scalar(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Nested {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Nested::from)
    }
}

/// One source's records: tabular or nested
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordSet {
    Tabular(Table),
    Nested(Nested),
}

impl RecordSet {
    /// Classify a JSON document: an array of flat objects is tabular, anything else nested.
    pub fn from_json(json: serde_json::Value) -> Self {
        match Table::from_json_rows(&json) {
            Some(table) => RecordSet::Tabular(table),
            None => RecordSet::Nested(Nested::from(json)),
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            RecordSet::Tabular(table) => Some(table),
            RecordSet::Nested(_) => None,
        }
    }

    pub fn is_tabular(&self) -> bool {
        matches!(self, RecordSet::Tabular(_))
    }
}

impl From<Table> for RecordSet {
    fn from(table: Table) -> Self {
        RecordSet::Tabular(table)
    }
}

impl From<Nested> for RecordSet {
    fn from(nested: Nested) -> Self {
        RecordSet::Nested(nested)
    }
}

/// A source's record set, already aligned to the common schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedItem {
    /// Source identifier (usually the file name)
    pub file: String,
    pub data: RecordSet,
}

impl AlignedItem {
    pub fn new(file: impl Into<String>, data: impl Into<RecordSet>) -> Self {
        Self {
            file: file.into(),
            data: data.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_records_fills_missing_cells_with_null() {
        let table = Table::from_records(vec![
            vec![("id", Value::from(1)), ("name", Value::from("a"))],
            vec![("id", Value::from(2)), ("age", Value::from(30))],
        ]);
        assert_eq!(
            table.column_names().collect::<Vec<_>>(),
            vec!["id", "name", "age"]
        );
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.get(1, "name"), Some(&Value::Null));
        assert_eq!(table.get(0, "age"), Some(&Value::Null));
        assert_eq!(table.column("age").unwrap().dtype, ColumnType::Int);
    }

    #[test]
    fn from_columns_rejects_ragged_and_duplicate() {
        let ragged = Table::from_columns(vec![
            Column::new("a", vec![Value::from(1)]),
            Column::new("b", vec![]),
        ]);
        assert!(matches!(ragged, Err(RecordSetError::RaggedColumn { .. })));

        let duplicate = Table::from_columns(vec![
            Column::new("a", vec![Value::from(1)]),
            Column::new("a", vec![Value::from(2)]),
        ]);
        assert_eq!(
            duplicate,
            Err(RecordSetError::DuplicateColumn("a".to_string()))
        );
    }

    #[test]
    fn infers_column_types() {
        assert_eq!(
            ColumnType::infer(&[Value::from(1), Value::from(2.5), Value::Null]),
            ColumnType::Float
        );
        assert_eq!(
            ColumnType::infer(&[Value::from(1), Value::from("x")]),
            ColumnType::Object
        );
        assert_eq!(ColumnType::infer(&[Value::Null]), ColumnType::Object);
    }

    #[test]
    fn json_classification() {
        let tabular = RecordSet::from_json(json!([{"id": 1}, {"id": 2, "v": "x"}]));
        assert!(tabular.is_tabular());

        let nested = RecordSet::from_json(json!([{"id": 1, "tags": ["a"]}]));
        assert!(!nested.is_tabular());
    }

    #[test]
    fn nested_serializes_in_key_order() {
        let nested = Nested::from(json!({"b": 1, "a": {"c": [true, null]}}));
        assert_eq!(
            serde_json::to_string(&nested).unwrap(),
            r#"{"b":1,"a":{"c":[true,null]}}"#
        );
    }

    #[test]
    fn table_serializes_as_rows() {
        let table = Table::from_records(vec![vec![("id", 1)], vec![("id", 2)]]);
        assert_eq!(
            serde_json::to_value(&table).unwrap(),
            json!([{"id": 1}, {"id": 2}])
        );
    }

    #[test]
    fn rename_column_refuses_collisions() {
        let mut table = Table::from_records(vec![vec![("a", 1), ("b", 2)]]);
        assert!(table.rename_column("a", "b").is_err());
        table.rename_column("a", "c").unwrap();
        assert!(table.has_column("c"));
    }
}
