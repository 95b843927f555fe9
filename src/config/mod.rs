// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a config file from disk.
//! - `validate.rs`: semantic checks (`RawConfigFile -> ConfigFile`).
//! - `build.rs`: turning a validated config into a task graph, run requests
//!   and watch specs.

pub mod build;
pub mod loader;
pub mod model;
pub mod validate;

pub use build::{build_graph, resolve_request};
pub use loader::{default_config_path, load_and_validate, load_from_path, parse_str, project_root};
pub use model::{
    AliasConfig, ConfigFile, ConfigSection, DefaultSection, ManifestConfig, PipelineConfig,
    ProjectSection, RawConfigFile, TaskConfig, TestConfig, TransformConfig,
};
pub use validate::{parse_duration, validate_config};
