// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::loader::DEFAULT_CONFIG_FILE;

/// Command-line arguments for `buildgraph`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "buildgraph",
    version,
    about = "Run build tasks in dependency order, once or on file changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Task or alias to run.
    #[arg(value_name = "TARGET", default_value = "default")]
    pub target: String,

    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Keep watching the target's sources and re-run on change.
    #[arg(long)]
    pub watch: bool,

    /// Stop everything on the first failing task.
    #[arg(long)]
    pub fail_fast: bool,

    /// Print the configured tasks and aliases, then exit.
    #[arg(long)]
    pub list: bool,

    /// Print the execution order of the target without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDGRAPH_LOG` or `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
