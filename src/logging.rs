// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Level priority:
//! 1. `--log-level`
//! 2. `BUILDGRAPH_LOG` (e.g. "info", "debug")
//! 3. `info`
//!
//! Logs go to stderr, together with the forwarded output of external tools.

use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "BUILDGRAPH_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = effective_level(cli_level, std::env::var(LOG_ENV_VAR).ok().as_deref());

    fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("cannot install log subscriber: {e}"))
}

/// Resolve the level from the CLI flag and the environment value.
pub fn effective_level(cli_level: Option<LogLevel>, env_value: Option<&str>) -> Level {
    match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => env_value
            .and_then(parse_level_str)
            .unwrap_or(Level::INFO),
    }
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
