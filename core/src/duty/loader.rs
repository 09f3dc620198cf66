//! Duty descriptor loading from disk
//!
//! The live engine receives descriptors from the fetch service; this loader
//! backs the offline replay/check tooling and tests.

use std::fs;
use std::path::Path;

use super::{ConfigError, DutyDescriptor};

/// Load and validate a descriptor from a JSON file.
pub fn load_descriptor_from_file(path: &Path) -> Result<DutyDescriptor, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let descriptor: DutyDescriptor =
        serde_json::from_str(&content).map_err(|source| ConfigError::ParseJson {
            path: path.to_path_buf(),
            source,
        })?;

    descriptor.validate()?;
    Ok(descriptor)
}
