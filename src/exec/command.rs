// src/exec/command.rs

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::exec::action::{Action, ActionContext, BoxFuture};
use crate::exec::process::{invoke, CommandSpec, ProcessOptions, ProcessResult};

/// Run an external tool as a task.
///
/// Whether the exit status counts as success is decided here, not by the
/// invoker: some tools exit non-zero for warnings, so `success_codes` can
/// list more than `0`.
#[derive(Debug, Clone)]
pub struct CommandAction {
    pub command: CommandSpec,
    pub success_codes: Vec<i32>,
    /// Overrides the context's default process timeout.
    pub timeout: Option<Duration>,
    /// Paths removed after a successful run (intermediate build output).
    pub cleanup: Vec<PathBuf>,
}

impl CommandAction {
    pub fn new(command: CommandSpec) -> Self {
        Self {
            command,
            success_codes: vec![0],
            timeout: None,
            cleanup: Vec::new(),
        }
    }

    pub fn with_success_codes(mut self, codes: Vec<i32>) -> Self {
        self.success_codes = codes;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cleanup(mut self, paths: Vec<PathBuf>) -> Self {
        self.cleanup = paths;
        self
    }

    /// The task's success predicate over a finished process.
    pub fn is_success(&self, result: &ProcessResult) -> bool {
        !result.timed_out
            && result
                .exit_code
                .is_some_and(|code| self.success_codes.contains(&code))
    }

    pub async fn execute(&self, ctx: &ActionContext) -> Result<ProcessResult> {
        let opts = ProcessOptions {
            root: ctx.root.clone(),
            timeout: self.timeout.or(ctx.process_timeout),
            stdin: None,
            log_tag: ctx.task.clone(),
            log_stdout: true,
        };

        info!(task = %ctx.task, command = %self.command, "running command");
        let result = invoke(&self.command, &opts).await?;

        if result.timed_out {
            bail!("`{}` timed out", self.command);
        }
        if !self.is_success(&result) {
            match result.exit_code {
                Some(code) => bail!("`{}` exited with status {}", self.command, code),
                None => bail!("`{}` was terminated by a signal", self.command),
            }
        }

        for path in &self.cleanup {
            let abs = ctx.resolve(path);
            debug!(task = %ctx.task, path = ?abs, "removing intermediate output");
            ctx.fs.remove_all(&abs)?;
        }

        Ok(result)
    }
}

impl Action for CommandAction {
    fn describe(&self) -> String {
        self.command.to_string()
    }

    fn run<'a>(&'a self, ctx: &'a ActionContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.execute(ctx).await?;
            Ok(())
        })
    }
}
