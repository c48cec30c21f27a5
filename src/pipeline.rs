//! End-to-end reconciliation
//!
//! Runs the stages over aligned items in order:
//! 1. align: apply the mapping dictionary, if one is loaded
//! 2. detect: report conflicting key groups
//! 3. resolve: keep one row per key with the configured strategy
//! 4. verify: report fields still carrying more than one type
//! 5. convert: apply the configured type conversions
//!
//! Overlap discovery runs separately, before a mapping dictionary exists.

use crate::config::ReconcileConfig;
use crate::conflict::{Conflicts, detect_conflicts, detect_conflicts_on, resolve_conflicts};
use crate::convert::{FieldConversion, convert_data_types};
use crate::mapping::{MappingDictionary, MappingError};
use crate::metadata::extract_all;
use crate::models::AlignedItem;
use crate::overlap::{OverlapRecord, identify_overlaps};
use crate::validation::{IncompatibilityReport, verify_data_types};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Outcome of one reconciliation run
#[derive(Debug, Clone, Serialize)]
#[must_use]
pub struct ReconciliationReport {
    /// Conflicts found before resolution
    pub conflicts: Conflicts,
    /// Items after resolution and conversion
    pub resolved: Vec<AlignedItem>,
    /// Fields with more than one type after resolution
    pub incompatibilities: IncompatibilityReport,
    /// Per-field outcomes of the mapping dictionary
    pub alignment: Vec<FieldConversion>,
    /// Per-field outcomes of the configured conversions
    pub conversions: Vec<FieldConversion>,
}

impl ReconciliationReport {
    /// Whether any mapping or configured conversion failed for some field
    pub fn has_conversion_failures(&self) -> bool {
        self.alignment
            .iter()
            .chain(&self.conversions)
            .any(|f| !f.is_success())
    }
}

/// Reconciles aligned sources into one dataset
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcileConfig,
    mapping: Option<MappingDictionary>,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Self {
            config,
            mapping: None,
        }
    }

    pub fn with_mapping(mut self, mapping: MappingDictionary) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// Load the workspace configuration and the latest mapping dictionary, if any.
    pub fn from_workspace(workspace_path: &Path) -> Result<Self> {
        let config = ReconcileConfig::load(workspace_path).with_context(|| {
            format!("Failed to load config from {}", workspace_path.display())
        })?;

        let store = config.mapping_store(workspace_path);
        let mapping = match store.load_latest() {
            Ok(mapping) => Some(mapping),
            Err(MappingError::NotFound(_)) => None,
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "Failed to load mapping dictionary from {}",
                        store.dir().display()
                    )
                });
            }
        };

        Ok(Self { config, mapping })
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn mapping(&self) -> Option<&MappingDictionary> {
        self.mapping.as_ref()
    }

    /// Extract metadata from every item and identify the shared fields.
    pub fn discover_overlaps(&self, items: &[AlignedItem]) -> Vec<OverlapRecord> {
        let overlaps = identify_overlaps(&extract_all(items));
        info!(
            "Found {} overlapping field(s) across {} source(s)",
            overlaps.len(),
            items.len()
        );
        overlaps
    }

    /// Run alignment, detection, resolution, verification and conversion.
    pub fn run(&self, items: Vec<AlignedItem>) -> ReconciliationReport {
        let (items, alignment) = match &self.mapping {
            Some(mapping) if !mapping.is_empty() => {
                let report = mapping.apply(items);
                info!("Applied mapping dictionary to {} item(s)", report.items.len());
                (report.items, report.fields)
            }
            _ => (items, Vec::new()),
        };

        let options = self.config.resolution_options();
        let conflicts = match options.key_columns.as_deref() {
            Some(keys) => detect_conflicts_on(&items, keys),
            None => detect_conflicts(&items),
        };
        let resolved = resolve_conflicts(items, &conflicts, &options);

        let incompatibilities = verify_data_types(&resolved);
        if !incompatibilities.is_empty() {
            info!(
                "{} field(s) carry more than one type after resolution",
                incompatibilities.len()
            );
        }

        let (resolved, conversions) = if self.config.conversions.is_empty() {
            (resolved, Vec::new())
        } else {
            let report = convert_data_types(resolved, &self.config.conversions);
            (report.items, report.fields)
        };

        ReconciliationReport {
            conflicts,
            resolved,
            incompatibilities,
            alignment,
            conversions,
        }
    }
}
