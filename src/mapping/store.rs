//! Versioned mapping dictionary storage
//!
//! File structure:
//! - Mappings directory (default `mappings/`)
//!   - `mapping_dictionary_v1.yaml`
//!   - `mapping_dictionary_v2.yaml`
//!   - ...
//!
//! Snapshots are never overwritten by [`MappingStore::save_next`]; the highest version is
//! the current dictionary.

use super::MappingDictionary;
use crate::validation::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default directory for mapping snapshots, relative to the workspace
pub const DEFAULT_MAPPINGS_DIR: &str = "mappings";

static SNAPSHOT_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^mapping_dictionary_v(\d+)\.yaml$").expect("Invalid regex")
});

/// Error during mapping dictionary storage
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// No snapshot exists yet
    #[error("No mapping dictionary found in {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Invalid mapping dictionary: {0}")]
    ValidationError(#[from] ValidationError),
}

pub type MappingResult<T> = Result<T, MappingError>;

/// Versioned mapping dictionary snapshots in one directory
#[derive(Debug, Clone)]
pub struct MappingStore {
    dir: PathBuf,
}

impl MappingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the snapshot for `version`
    pub fn snapshot_path(&self, version: u64) -> PathBuf {
        self.dir.join(format!("mapping_dictionary_v{}.yaml", version))
    }

    /// Save `dictionary` as the given version, creating the directory if needed.
    ///
    /// An existing snapshot with the same version is replaced.
    pub fn save(&self, dictionary: &MappingDictionary, version: u64) -> MappingResult<PathBuf> {
        dictionary.validate()?;

        std::fs::create_dir_all(&self.dir).map_err(|e| {
            MappingError::IoError(format!(
                "Failed to create {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let yaml = serde_yaml::to_string(dictionary).map_err(|e| {
            MappingError::SerializationError(format!(
                "Failed to serialize mapping dictionary: {}",
                e
            ))
        })?;

        let path = self.snapshot_path(version);
        std::fs::write(&path, yaml).map_err(|e| {
            MappingError::IoError(format!("Failed to write {}: {}", path.display(), e))
        })?;

        info!("Mapping dictionary saved as version {}", version);
        Ok(path)
    }

    /// Save `dictionary` as the next free version and return that version.
    pub fn save_next(&self, dictionary: &MappingDictionary) -> MappingResult<u64> {
        let version = self.next_version()?;
        self.save(dictionary, version)?;
        Ok(version)
    }

    /// Load the snapshot with the highest version.
    pub fn load_latest(&self) -> MappingResult<MappingDictionary> {
        let version = self
            .latest_version()?
            .ok_or_else(|| MappingError::NotFound(self.dir.display().to_string()))?;
        self.load(version)
    }

    /// Load a specific version.
    pub fn load(&self, version: u64) -> MappingResult<MappingDictionary> {
        let path = self.snapshot_path(version);
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MappingError::NotFound(path.display().to_string()),
            _ => MappingError::IoError(format!("Failed to read {}: {}", path.display(), e)),
        })?;
        let dictionary = serde_yaml::from_str(&content).map_err(|e| {
            MappingError::SerializationError(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        info!("Mapping dictionary version {} loaded", version);
        Ok(dictionary)
    }

    /// One past the highest saved version, or 1 when nothing is saved.
    pub fn next_version(&self) -> MappingResult<u64> {
        Ok(self.latest_version()?.map_or(1, |v| v.saturating_add(1)))
    }

    /// All saved versions in ascending order.
    pub fn versions(&self) -> MappingResult<Vec<u64>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            MappingError::IoError(format!("Failed to list {}: {}", self.dir.display(), e))
        })?;

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| MappingError::IoError(e.to_string()))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(caps) = SNAPSHOT_FILE.captures(name) else {
                debug!("Ignoring {} in mappings directory", name);
                continue;
            };
            match caps[1].parse::<u64>() {
                Ok(version) => versions.push(version),
                Err(e) => warn!("Ignoring snapshot {} with unusable version: {}", name, e),
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    fn latest_version(&self) -> MappingResult<Option<u64>> {
        Ok(self.versions()?.last().copied())
    }
}
