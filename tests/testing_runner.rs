// tests/testing_runner.rs

mod common;

use std::error::Error;

use buildgraph::exec::{Action, ActionContext, CommandAction, Environment};
use buildgraph::testing::{TestRunAction, TestRunnerConfig};

type TestResult = Result<(), Box<dyn Error>>;

fn karma() -> TestRunnerConfig {
    TestRunnerConfig {
        program: "node_modules/.bin/karma".to_string(),
        args: vec!["start".to_string()],
        config_file: Some("karma.conf.js".to_string()),
        ci_browsers: vec!["Chrome_travis_ci".to_string()],
        ..TestRunnerConfig::default()
    }
}

#[test]
fn local_single_run_command() {
    let spec = karma().command(Environment::default());
    assert_eq!(spec.program, "node_modules/.bin/karma");
    assert_eq!(spec.args, vec!["start", "karma.conf.js", "--single-run"]);
    assert_eq!(spec.env.get("NODE_ENV").map(String::as_str), Some("test"));
    assert_eq!(spec.env.get("ENV").map(String::as_str), Some("test"));
}

#[test]
fn ci_adds_browser_profiles() {
    let spec = karma().command(Environment { ci: true });
    assert_eq!(
        spec.args,
        vec!["start", "karma.conf.js", "--browsers", "Chrome_travis_ci", "--single-run"]
    );
}

#[test]
fn watch_mode_keeps_the_runner_alive() {
    let cfg = TestRunnerConfig {
        single_run: false,
        ci_browsers: Vec::new(),
        ..karma()
    };
    let spec = cfg.command(Environment { ci: true });
    assert_eq!(spec.args, vec!["start", "karma.conf.js", "--no-single-run"]);
    assert!(TestRunAction::new(cfg).describe().contains("watch"));
}

#[test]
fn unset_ci_variable_is_not_ci() {
    assert!(!Environment::detect("BUILDGRAPH_SURELY_UNSET_CI_FLAG").ci);
}

#[cfg(unix)]
#[tokio::test]
async fn runner_sees_its_environment_only_in_the_child() -> TestResult {
    let cfg = TestRunnerConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), "echo \"$NODE_ENV/$ENV $*\"".to_string(), "runner".to_string()],
        config_file: Some("karma.conf.js".to_string()),
        ..TestRunnerConfig::default()
    };
    let ctx = ActionContext::new("").for_task("test");

    let result = CommandAction::new(cfg.command(ctx.env)).execute(&ctx).await?;
    assert_eq!(result.stdout_lossy(), "test/test karma.conf.js --single-run\n");

    TestRunAction::new(cfg).run(&ctx).await?;
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn failing_suite_fails_the_task() {
    let cfg = TestRunnerConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), "exit 1".to_string()],
        ..TestRunnerConfig::default()
    };
    let ctx = ActionContext::new("").for_task("test");
    assert!(TestRunAction::new(cfg).run(&ctx).await.is_err());
}
