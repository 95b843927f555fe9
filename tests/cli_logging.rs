// tests/cli_logging.rs

use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

use buildgraph::cli::{CliArgs, LogLevel};
use buildgraph::logging::effective_level;

#[test]
fn defaults_run_the_default_target() {
    let args = CliArgs::try_parse_from(["buildgraph"]).expect("parse");
    assert_eq!(args.target, "default");
    assert_eq!(args.config, PathBuf::from("Buildgraph.toml"));
    assert!(!args.watch && !args.fail_fast && !args.list && !args.dry_run);
    assert_eq!(args.log_level, None);
}

#[test]
fn flags_and_target() {
    let args = CliArgs::try_parse_from([
        "buildgraph",
        "compile-ts",
        "--watch",
        "--fail-fast",
        "--config",
        "ci/Buildgraph.toml",
        "--log-level",
        "debug",
    ])
    .expect("parse");
    assert_eq!(args.target, "compile-ts");
    assert!(args.watch);
    assert!(args.fail_fast);
    assert_eq!(args.config, PathBuf::from("ci/Buildgraph.toml"));
    assert_eq!(args.log_level, Some(LogLevel::Debug));
}

#[test]
fn unknown_log_level_is_rejected() {
    assert!(CliArgs::try_parse_from(["buildgraph", "--log-level", "loud"]).is_err());
}

#[test]
fn cli_level_beats_environment() {
    assert_eq!(effective_level(Some(LogLevel::Warn), Some("trace")), Level::WARN);
    assert_eq!(effective_level(None, Some(" DEBUG ")), Level::DEBUG);
    assert_eq!(effective_level(None, Some("warning")), Level::WARN);
    assert_eq!(effective_level(None, Some("nonsense")), Level::INFO);
    assert_eq!(effective_level(None, None), Level::INFO);
}
