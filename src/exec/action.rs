// src/exec/action.rs

//! The unit of work attached to a task.
//!
//! Every concrete action (external command, file pipeline, clean, manifest,
//! test runner) implements [`Action`]. The executor only sees the trait, so
//! tests can plug in recording or failing actions.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::engine::TaskName;
use crate::fs::{FileSystem, RealFileSystem};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A task's work. Errors are reported as the task's failure.
pub trait Action: Send + Sync {
    /// Short human-readable description for logs and `--dry-run`.
    fn describe(&self) -> String;

    fn run<'a>(&'a self, ctx: &'a ActionContext) -> BoxFuture<'a, Result<()>>;
}

impl fmt::Debug for dyn Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action({})", self.describe())
    }
}

/// Facts about the invoking environment, detected once at startup and
/// passed explicitly to the actions that care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Environment {
    /// Running on a CI server.
    pub ci: bool,
}

impl Environment {
    /// Detect CI from the given environment variable. Empty, `0` and
    /// `false` count as unset.
    pub fn detect(ci_env_var: &str) -> Self {
        let ci = std::env::var(ci_env_var)
            .map(|v| is_truthy(&v))
            .unwrap_or(false);
        Self { ci }
    }
}

fn is_truthy(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    !(v.is_empty() || v == "0" || v == "false")
}

/// Everything an action may touch while it runs.
#[derive(Debug, Clone)]
pub struct ActionContext {
    /// Task currently running; used to tag log lines.
    pub task: TaskName,
    /// Project root; relative paths in task definitions resolve against it.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub env: Environment,
    /// Default timeout for external processes (`None` = wait forever).
    pub process_timeout: Option<Duration>,
    /// Worker width for per-file pipeline processing.
    pub max_parallel_files: usize,
}

impl ActionContext {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            task: TaskName::new(),
            root: root.into(),
            fs: Arc::new(RealFileSystem),
            env: Environment::default(),
            process_timeout: None,
            max_parallel_files: 8,
        }
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Copy of this context tagged with the given task name.
    pub fn for_task(&self, task: &str) -> Self {
        let mut ctx = self.clone();
        ctx.task = task.to_string();
        ctx
    }

    /// Resolve a path from a task definition against the project root.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Action that removes files or directories (`del` in most build setups).
#[derive(Debug, Clone)]
pub struct CleanAction {
    pub paths: Vec<PathBuf>,
}

impl CleanAction {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl Action for CleanAction {
    fn describe(&self) -> String {
        let paths: Vec<String> = self.paths.iter().map(|p| p.display().to_string()).collect();
        format!("clean {}", paths.join(" "))
    }

    fn run<'a>(&'a self, ctx: &'a ActionContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            for path in &self.paths {
                let abs = ctx.resolve(path);
                tracing::debug!(task = %ctx.task, path = ?abs, "removing");
                ctx.fs.remove_all(&abs)?;
            }
            Ok(())
        })
    }
}
