//! Mapping dictionaries
//!
//! A mapping dictionary records how source fields align to the common schema: which
//! fields are renamed and which are converted to another type. Dictionaries are persisted
//! as versioned YAML snapshots by [`MappingStore`].

pub mod store;

pub use store::{MappingError, MappingResult, MappingStore};

use crate::convert::{
    ConversionReport, FieldConversions, FieldRenames, convert_data_types, rename_fields,
};
use crate::models::{AlignedItem, TargetType};
use crate::validation::{ValidationResult, validate_field_path};
use serde::{Deserialize, Serialize};

/// Field renames and type conversions aligning sources to a common schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingDictionary {
    /// Source field name -> common field name
    #[serde(default)]
    pub field_renames: FieldRenames,
    /// Common field path -> target type
    #[serde(default)]
    pub field_types: FieldConversions,
}

impl MappingDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.field_renames.insert(from.into(), to.into());
        self
    }

    pub fn with_type(mut self, field: impl Into<String>, target: TargetType) -> Self {
        self.field_types.insert(field.into(), target);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.field_renames.is_empty() && self.field_types.is_empty()
    }

    /// Check every field name the dictionary mentions.
    pub fn validate(&self) -> ValidationResult<()> {
        for (from, to) in &self.field_renames {
            validate_field_path(from)?;
            validate_field_path(to)?;
        }
        for field in self.field_types.keys() {
            validate_field_path(field)?;
        }
        Ok(())
    }

    /// Rename, then convert, every item.
    ///
    /// Type conversions are keyed by the renamed field names.
    ///
    /// # Example
    ///
    /// ```rust
    /// use data_unification_sdk::mapping::MappingDictionary;
    /// use data_unification_sdk::models::{AlignedItem, Table, TargetType, Value};
    ///
    /// let dictionary = MappingDictionary::new()
    ///     .with_rename("cust", "customer_id")
    ///     .with_type("customer_id", TargetType::Int);
    /// let table = Table::from_records(vec![vec![("cust", Value::from("17"))]]);
    ///
    /// let report = dictionary.apply(vec![AlignedItem::new("crm.csv", table)]);
    /// let table = report.items[0].data.as_table().unwrap();
    /// assert_eq!(table.get(0, "customer_id"), Some(&Value::from(17)));
    /// ```
    pub fn apply(&self, items: Vec<AlignedItem>) -> ConversionReport {
        let renamed = items
            .into_iter()
            .map(|item| AlignedItem {
                data: rename_fields(item.data, &self.field_renames),
                file: item.file,
            })
            .collect();
        convert_data_types(renamed, &self.field_types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Nested;
    use crate::validation::ValidationError;
    use serde_json::json;

    #[test]
    fn yaml_layout() {
        let dictionary = MappingDictionary::new()
            .with_rename("cust", "customer_id")
            .with_type("customer_id", TargetType::Int)
            .with_type("signup", TargetType::Datetime);
        let yaml = serde_yaml::to_string(&dictionary).unwrap();
        assert!(yaml.contains("field_renames:\n  cust: customer_id"));
        assert!(yaml.contains("customer_id: int"));
        assert!(yaml.contains("signup: datetime"));

        let parsed: MappingDictionary = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, dictionary);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let parsed: MappingDictionary = serde_yaml::from_str("field_types:\n  age: integer\n").unwrap();
        assert!(parsed.field_renames.is_empty());
        assert_eq!(parsed.field_types["age"], TargetType::Int);
    }

    #[test]
    fn validate_rejects_bad_names() {
        let dictionary = MappingDictionary::new().with_rename("a", "");
        assert_eq!(
            dictionary.validate(),
            Err(ValidationError::Empty("field path"))
        );
        assert!(MappingDictionary::new()
            .with_type("a..b", TargetType::Str)
            .validate()
            .is_err());
    }

    #[test]
    fn apply_renames_nested_keys_before_converting() {
        let dictionary = MappingDictionary::new()
            .with_rename("qty", "quantity")
            .with_type("orders.quantity", TargetType::Float);
        let item = AlignedItem::new("n", Nested::from(json!({"orders": [{"qty": "2"}]})));

        let report = dictionary.apply(vec![item]);
        assert!(!report.has_failures());
        let json = serde_json::to_value(&report.items[0].data).unwrap();
        assert_eq!(json["orders"][0]["quantity"], json!(2.0));
        assert_eq!(report.fields[0].converted, 1);
    }
}
