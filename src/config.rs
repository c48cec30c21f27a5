//! Reconciliation configuration file support
//!
//! Handles parsing of `.data-unify.toml` configuration files and
//! environment variable overrides.

use crate::conflict::ResolutionOptions;
use crate::convert::FieldConversions;
use crate::mapping::MappingStore;
use crate::mapping::store::DEFAULT_MAPPINGS_DIR;
use crate::models::ResolutionStrategy;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration filename
pub const CONFIG_FILENAME: &str = ".data-unify.toml";

/// Environment variable for the resolution strategy
pub const ENV_STRATEGY: &str = "DATA_UNIFY_STRATEGY";

/// Environment variable for the mappings directory
pub const ENV_MAPPINGS_DIR: &str = "DATA_UNIFY_MAPPINGS_DIR";

/// Error loading or saving configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Conflict resolution section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionSection {
    /// Strategy label, e.g. "hierarchy" or "Time-based"
    #[serde(default)]
    pub strategy: ResolutionStrategy,

    /// Sources by precedence, highest first
    #[serde(default)]
    pub hierarchy: Vec<String>,

    /// Columns identifying a record; every column shared by all sources when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_columns: Option<Vec<String>>,

    /// Source -> weight
    #[serde(default)]
    pub weights: IndexMap<String, f64>,
}

/// Mapping dictionary section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingsSection {
    /// Directory holding mapping dictionary snapshots (relative to workspace)
    #[serde(default = "default_mappings_dir")]
    pub dir: String,
}

fn default_mappings_dir() -> String {
    DEFAULT_MAPPINGS_DIR.to_string()
}

impl Default for MappingsSection {
    fn default() -> Self {
        Self {
            dir: default_mappings_dir(),
        }
    }
}

/// Main configuration structure
///
/// Represents the `.data-unify.toml` configuration file format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default)]
    pub resolution: ResolutionSection,

    /// Field -> target type applied after resolution
    #[serde(default)]
    pub conversions: FieldConversions,

    #[serde(default)]
    pub mappings: MappingsSection,
}

impl ReconcileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a workspace directory
    ///
    /// Looks for `.data-unify.toml` in the workspace directory.
    /// Falls back to defaults if not found.
    pub fn load(workspace_path: &Path) -> ConfigResult<Self> {
        let config_path = workspace_path.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(format!("Failed to read config: {}", e)))?;

            Self::parse(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a workspace directory
    pub fn save(&self, workspace_path: &Path) -> ConfigResult<()> {
        let config_path = workspace_path.join(CONFIG_FILENAME);
        let content = self.to_toml()?;

        std::fs::write(&config_path, content)
            .map_err(|e| ConfigError::IoError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to serialize config: {}", e))
        })
    }

    /// Apply environment variable overrides
    ///
    /// Fails on an unknown strategy name.
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        if let Ok(strategy) = std::env::var(ENV_STRATEGY) {
            self.resolution.strategy =
                strategy
                    .parse()
                    .map_err(|reason| ConfigError::InvalidValue {
                        key: ENV_STRATEGY.to_string(),
                        reason,
                    })?;
        }

        if let Ok(dir) = std::env::var(ENV_MAPPINGS_DIR) {
            self.mappings.dir = dir;
        }

        Ok(())
    }

    /// Resolution options for the configured strategy
    pub fn resolution_options(&self) -> ResolutionOptions {
        let options = ResolutionOptions::new(self.resolution.strategy)
            .with_hierarchy(self.resolution.hierarchy.iter().cloned())
            .with_weights(
                self.resolution
                    .weights
                    .iter()
                    .map(|(source, weight)| (source.clone(), *weight)),
            );
        match &self.resolution.key_columns {
            Some(keys) => options.with_key_columns(keys.iter().cloned()),
            None => options,
        }
    }

    /// Get the mappings directory for a workspace
    pub fn mappings_dir(&self, workspace_path: &Path) -> PathBuf {
        if self.mappings.dir.is_empty() {
            workspace_path.join(DEFAULT_MAPPINGS_DIR)
        } else if Path::new(&self.mappings.dir).is_absolute() {
            PathBuf::from(&self.mappings.dir)
        } else {
            workspace_path.join(&self.mappings.dir)
        }
    }

    /// Mapping dictionary store for a workspace
    pub fn mapping_store(&self, workspace_path: &Path) -> MappingStore {
        MappingStore::new(self.mappings_dir(workspace_path))
    }

    /// Check if configuration exists in a workspace
    pub fn exists(workspace_path: &Path) -> bool {
        workspace_path.join(CONFIG_FILENAME).exists()
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Data Unification SDK Configuration

[resolution]
# Strategy: "hierarchy" (default), "weight", "time" or "manual"
strategy = "hierarchy"

# Sources by precedence, highest first (hierarchy strategy)
hierarchy = ["crm.csv", "billing.json"]

# Columns identifying a record. When omitted, every column shared by all sources is used.
# key_columns = ["customer_id"]

# Source weights, higher wins (weight strategy); unlisted sources weigh 0
[resolution.weights]
"crm.csv" = 0.8
"billing.json" = 0.5

# Type conversions applied to resolved data: "int", "float", "str" or "datetime"
[conversions]
# age = "int"
# signup_date = "datetime"

[mappings]
# Directory for versioned mapping dictionaries (relative to workspace, or absolute)
dir = "mappings"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TargetType;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ReconcileConfig::new();
        assert_eq!(config.resolution.strategy, ResolutionStrategy::Hierarchy);
        assert!(config.conversions.is_empty());
        assert!(config.resolution.key_columns.is_none());
        assert_eq!(config.mappings.dir, DEFAULT_MAPPINGS_DIR);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[resolution]
strategy = "Weight-based"
key_columns = ["id"]

[resolution.weights]
a = 2.0
b = 0.5

[conversions]
age = "integer"
joined = "datetime"
"#;
        let config = ReconcileConfig::parse(toml).unwrap();
        assert_eq!(config.resolution.strategy, ResolutionStrategy::Weight);
        assert_eq!(config.resolution.weights["a"], 2.0);
        assert_eq!(config.conversions["age"], TargetType::Int);
        assert_eq!(config.conversions["joined"], TargetType::Datetime);

        let options = config.resolution_options();
        assert_eq!(options.strategy, ResolutionStrategy::Weight);
        assert_eq!(options.source_weights.get("b"), Some(&0.5));
        assert_eq!(options.key_columns, Some(vec!["id".to_string()]));
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let toml = r#"
[resolution]
strategy = "coin-flip"
"#;
        assert!(matches!(
            ReconcileConfig::parse(toml),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let mut config = ReconcileConfig::new();
        config.resolution.strategy = ResolutionStrategy::Time;
        config
            .conversions
            .insert("age".to_string(), TargetType::Int);

        config.save(dir.path()).unwrap();
        assert!(ReconcileConfig::exists(dir.path()));

        let loaded = ReconcileConfig::load(dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_mappings_dir() {
        let mut config = ReconcileConfig::new();
        let workspace = Path::new("/workspace");
        assert_eq!(
            config.mappings_dir(workspace),
            PathBuf::from("/workspace/mappings")
        );
        config.mappings.dir = "/abs/maps".to_string();
        assert_eq!(config.mappings_dir(workspace), PathBuf::from("/abs/maps"));
    }

    #[test]
    fn test_sample_config_is_valid() {
        let config = ReconcileConfig::parse(sample_config()).unwrap();
        assert_eq!(config.resolution.hierarchy, vec!["crm.csv", "billing.json"]);
        assert!(config.conversions.is_empty());
    }
}
