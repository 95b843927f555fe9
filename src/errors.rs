// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildgraphError {
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Cycle detected in task graph: {0}")]
    Cycle(String),

    #[error("Task '{task}' failed: {message}")]
    ActionFailure { task: String, message: String },

    #[error("Failed to spawn '{command}'")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read manifest: {0}")]
    ManifestRead(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildgraphError>;
