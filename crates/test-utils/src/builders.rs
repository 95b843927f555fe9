#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use buildgraph::config::{
    AliasConfig, ConfigFile, PipelineConfig, RawConfigFile, TaskConfig, TestConfig,
};
use buildgraph::dag::{Task, TaskGraph};
use buildgraph::exec::{Action, ActionContext, BoxFuture};
use buildgraph::types::RunMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_alias(mut self, name: &str, targets: &[&str], mode: RunMode) -> Self {
        self.config.alias.insert(
            name.to_string(),
            AliasConfig {
                targets: targets.iter().map(|t| t.to_string()).collect(),
                mode,
            },
        );
        self
    }

    pub fn with_global_watch(mut self, pattern: &str) -> Self {
        self.config.default.watch.push(pattern.to_string());
        self
    }

    pub fn with_global_exclude(mut self, pattern: &str) -> Self {
        self.config.default.exclude.push(pattern.to_string());
        self
    }

    pub fn with_default_use_hash(mut self, val: bool) -> Self {
        self.config.default.use_hash = Some(val);
        self
    }

    pub fn fail_fast(mut self, val: bool) -> Self {
        self.config.config.fail_fast = val;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    /// A task running `cmd` through the shell.
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: Some(cmd.to_string()),
                ..TaskConfig::default()
            },
        }
    }

    /// A task without an action.
    pub fn group() -> Self {
        Self {
            task: TaskConfig::default(),
        }
    }

    pub fn program(program: &str, args: &[&str]) -> Self {
        Self {
            task: TaskConfig {
                program: Some(program.to_string()),
                args: args.iter().map(|a| a.to_string()).collect(),
                ..TaskConfig::default()
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn watch(mut self, pattern: &str) -> Self {
        self.task.watch.get_or_insert_with(Vec::new).push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.task.exclude.get_or_insert_with(Vec::new).push(pattern.to_string());
        self
    }

    pub fn append_default_watch(mut self, val: bool) -> Self {
        self.task.append_default_watch = val;
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.task.use_hash = Some(val);
        self
    }

    pub fn clean(mut self, paths: &[&str]) -> Self {
        self.task.clean = Some(paths.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.task.pipeline = Some(pipeline);
        self
    }

    pub fn test(mut self, test: TestConfig) -> Self {
        self.task.test = Some(test);
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Shared, ordered log of action invocations.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Action that appends its label to a shared log, optionally after a delay.
pub struct RecordingAction {
    label: String,
    log: CallLog,
    delay: Option<Duration>,
}

impl RecordingAction {
    pub fn new(label: &str, log: &CallLog) -> Self {
        Self {
            label: label.to_string(),
            log: Arc::clone(log),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Action for RecordingAction {
    fn describe(&self) -> String {
        format!("record {}", self.label)
    }

    fn run<'a>(&'a self, _ctx: &'a ActionContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.log.lock().unwrap().push(self.label.clone());
            Ok(())
        })
    }
}

/// Action that always fails with the given message.
pub struct FailingAction {
    message: String,
}

impl FailingAction {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl Action for FailingAction {
    fn describe(&self) -> String {
        "fail".to_string()
    }

    fn run<'a>(&'a self, _ctx: &'a ActionContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move { Err(anyhow::anyhow!("{}", self.message)) })
    }
}

/// Build a graph of recording actions from `(name, deps)` pairs.
pub fn recording_graph(spec: &[(&str, &[&str])], log: &CallLog) -> TaskGraph {
    let mut builder = TaskGraph::builder();
    for (name, deps) in spec {
        builder.add(
            Task::new(*name)
                .after_all(deps.iter().copied())
                .action(Arc::new(RecordingAction::new(name, log))),
        );
    }
    builder.build().expect("valid test graph")
}

/// Build a graph of group tasks from `(name, deps)` pairs.
pub fn group_graph(spec: &[(&str, &[&str])]) -> TaskGraph {
    let mut builder = TaskGraph::builder();
    for (name, deps) in spec {
        builder.add(Task::new(*name).after_all(deps.iter().copied()));
    }
    builder.build().expect("valid test graph")
}
