//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GateConfig;
use crate::error::ConfigError;

/// Load configuration from a TOML file.
///
/// Only syntax is checked here. Semantic validation, CIDRs, intervals,
/// URLs and header names, happens when the registry is compiled from the
/// returned value.
pub fn load_config(path: &Path) -> Result<GateConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GateConfig = toml::from_str(&content)?;
    Ok(config)
}
