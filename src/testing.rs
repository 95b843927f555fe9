// src/testing.rs

//! Test runner invocation.
//!
//! The runner's environment (`NODE_ENV`, `ENV`) is set on the child
//! process only, and CI-specific browser profiles come from the
//! [`Environment`] detected at startup.

use anyhow::Result;

use crate::exec::{Action, ActionContext, BoxFuture, CommandAction, CommandSpec, Environment};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRunnerConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Runner configuration file, passed right after `args`.
    pub config_file: Option<String>,
    /// Run the suite once and exit, or keep watching.
    pub single_run: bool,
    /// Value for `NODE_ENV` and `ENV`.
    pub env_mode: String,
    /// Browser profiles used on CI (`--browsers a,b`).
    pub ci_browsers: Vec<String>,
}

impl Default for TestRunnerConfig {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            config_file: None,
            single_run: true,
            env_mode: "test".to_string(),
            ci_browsers: Vec::new(),
        }
    }
}

impl TestRunnerConfig {
    /// The concrete command for the given environment.
    pub fn command(&self, env: Environment) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.program).args(self.args.iter().cloned());
        if let Some(config_file) = &self.config_file {
            spec = spec.arg(config_file);
        }
        if env.ci && !self.ci_browsers.is_empty() {
            spec = spec.arg("--browsers").arg(self.ci_browsers.join(","));
        }
        spec = spec.arg(if self.single_run {
            "--single-run"
        } else {
            "--no-single-run"
        });
        spec.env("NODE_ENV", &self.env_mode)
            .env("ENV", &self.env_mode)
    }
}

#[derive(Debug, Clone)]
pub struct TestRunAction {
    pub config: TestRunnerConfig,
}

impl TestRunAction {
    pub fn new(config: TestRunnerConfig) -> Self {
        Self { config }
    }
}

impl Action for TestRunAction {
    fn describe(&self) -> String {
        format!(
            "test runner {} ({})",
            self.config.program,
            if self.config.single_run { "single run" } else { "watch" }
        )
    }

    fn run<'a>(&'a self, ctx: &'a ActionContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let action = CommandAction::new(self.config.command(ctx.env));
            action.execute(ctx).await?;
            Ok(())
        })
    }
}
