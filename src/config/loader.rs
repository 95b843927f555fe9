// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

pub const DEFAULT_CONFIG_FILE: &str = "Buildgraph.toml";

/// Read and deserialize a config file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {}", path.display()))?;
    parse_str(&contents)
}

/// Deserialize config text.
pub fn parse_str(contents: &str) -> Result<RawConfigFile> {
    Ok(toml::from_str(contents)?)
}

/// Load a config file and validate it. This is the entry point for the rest
/// of the application.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw = load_from_path(&path)?;
    ConfigFile::try_from(raw)
}

/// `Buildgraph.toml` in the current directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Directory relative paths in a config file resolve against.
pub fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
