// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{RunMode, TriggerWhileRunningBehaviour};

/// Configuration as read from `Buildgraph.toml`, before semantic checks.
///
/// ```toml
/// [project]
/// name = "@acme/widgets"
///
/// [config]
/// fail_fast = false
///
/// [alias.watch]
/// targets = ["compile-ts", "styles"]
/// mode = "watch"
///
/// [task.clean-dist]
/// clean = ["${dist_dir}"]
///
/// [task.ngc]
/// after = ["clean-dist"]
/// program = "node_modules/.bin/ngc"
/// args = ["-p", "tsconfig-aot.json"]
/// ```
///
/// Every section is optional except that at least one task must exist.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub default: DefaultSection,

    /// `[alias.<name>]`: named target groups with a run mode.
    #[serde(default)]
    pub alias: BTreeMap<String, AliasConfig>,

    /// `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[project]`: facts about the package being built.
///
/// `dist_dir` and `coverage_dir` can be referenced from task strings as
/// `${dist_dir}` and `${coverage_dir}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Published package name (defaults to the source manifest's name).
    #[serde(default)]
    pub name: Option<String>,

    /// Source manifest, relative to the root.
    #[serde(default = "default_manifest")]
    pub manifest: String,

    #[serde(default = "default_dist_dir")]
    pub dist_dir: String,

    #[serde(default = "default_coverage_dir")]
    pub coverage_dir: String,
}

fn default_manifest() -> String {
    "package.json".to_string()
}

fn default_dist_dir() -> String {
    "dist".to_string()
}

fn default_coverage_dir() -> String {
    "coverage".to_string()
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            name: None,
            manifest: default_manifest(),
            dist_dir: default_dist_dir(),
            coverage_dir: default_coverage_dir(),
        }
    }
}

impl ProjectSection {
    /// Substitute `${dist_dir}` and `${coverage_dir}`.
    pub fn expand(&self, value: &str) -> String {
        value
            .replace("${dist_dir}", &self.dist_dir)
            .replace("${coverage_dir}", &self.coverage_dir)
    }
}

/// `[config]`: global behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Stop everything on the first failing task.
    #[serde(default)]
    pub fail_fast: bool,

    /// Files a pipeline processes at the same time.
    #[serde(default = "default_max_parallel_files")]
    pub max_parallel_files: usize,

    /// Quiet period that closes a batch of file changes.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// `"queue"` (default) or `"cancel"`.
    ///
    /// - `"queue"`: remember triggers and run them after the current run.
    /// - `"cancel"`: keep only the latest trigger.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Follow-up runs kept while a run is active (`queue` behaviour). Later
    /// triggers merge into the newest one.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// Default timeout for external processes, e.g. `"10m"`.
    #[serde(default)]
    pub process_timeout: Option<String>,

    /// Environment variable that signals a CI build.
    #[serde(default = "default_ci_env_var")]
    pub ci_env_var: String,

    /// Run the watch targets once before waiting for changes.
    #[serde(default = "default_true")]
    pub watch_initial_run: bool,
}

fn default_max_parallel_files() -> usize {
    8
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_queue_length() -> usize {
    1
}

fn default_ci_env_var() -> String {
    "CI".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            fail_fast: false,
            max_parallel_files: default_max_parallel_files(),
            debounce_ms: default_debounce_ms(),
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
            process_timeout: None,
            ci_env_var: default_ci_env_var(),
            watch_initial_run: true,
        }
    }
}

/// `[default]`: watch lists and hashing for tasks that do not override them.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultSection {
    #[serde(default)]
    pub watch: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub use_hash: Option<bool>,
}

/// `[alias.<name>]`.
#[derive(Debug, Clone, Deserialize)]
pub struct AliasConfig {
    pub targets: Vec<String>,

    #[serde(default)]
    pub mode: RunMode,
}

/// `[task.<name>]`.
///
/// At most one action kind may be given: a command (`cmd` or `program`),
/// `pipeline`, `clean`, `manifest` or `test`. A task without any is a group.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Tasks that must succeed before this one starts.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub description: Option<String>,

    // Watching.
    #[serde(default)]
    pub watch: Option<Vec<String>>,
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
    #[serde(default)]
    pub append_default_watch: bool,
    #[serde(default)]
    pub append_default_exclude: bool,
    #[serde(default)]
    pub use_hash: Option<bool>,

    // Command action.
    /// Command line run through the platform shell.
    #[serde(default)]
    pub cmd: Option<String>,
    /// Executable run directly with `args`.
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub success_codes: Option<Vec<i32>>,
    #[serde(default)]
    pub timeout: Option<String>,
    /// Paths removed after the command succeeded.
    #[serde(default)]
    pub cleanup: Vec<String>,

    // Other actions.
    #[serde(default)]
    pub pipeline: Option<PipelineConfig>,
    #[serde(default)]
    pub clean: Option<Vec<String>>,
    #[serde(default)]
    pub manifest: Option<ManifestConfig>,
    #[serde(default)]
    pub test: Option<TestConfig>,
}

impl TaskConfig {
    pub fn effective_use_hash(&self, default_use_hash: bool) -> bool {
        self.use_hash.unwrap_or(default_use_hash)
    }

    /// Command-only keys set on this task.
    pub fn command_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if !self.args.is_empty() {
            keys.push("args");
        }
        if self.cwd.is_some() {
            keys.push("cwd");
        }
        if !self.env.is_empty() {
            keys.push("env");
        }
        if self.success_codes.is_some() {
            keys.push("success_codes");
        }
        if self.timeout.is_some() {
            keys.push("timeout");
        }
        if !self.cleanup.is_empty() {
            keys.push("cleanup");
        }
        keys
    }

    /// Names of the action kinds configured on this task.
    pub fn action_kinds(&self) -> Vec<&'static str> {
        let mut kinds = Vec::new();
        if self.cmd.is_some() {
            kinds.push("cmd");
        }
        if self.program.is_some() {
            kinds.push("program");
        }
        if self.pipeline.is_some() {
            kinds.push("pipeline");
        }
        if self.clean.is_some() {
            kinds.push("clean");
        }
        if self.manifest.is_some() {
            kinds.push("manifest");
        }
        if self.test.is_some() {
            kinds.push("test");
        }
        kinds
    }
}

/// `pipeline = { ... }` on a task.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub src: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Directory patterns and output paths are relative to (default: root).
    #[serde(default)]
    pub base: Option<String>,
    pub dest: String,
    #[serde(default)]
    pub transforms: Vec<TransformConfig>,
}

/// One pipeline step, e.g. `{ type = "rename_extension", extension = "css" }`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformConfig {
    Command {
        #[serde(default)]
        cmd: Option<String>,
        #[serde(default)]
        program: Option<String>,
        #[serde(default)]
        args: Vec<String>,
    },
    StripLineComments,
    RenameExtension {
        extension: String,
    },
    InlineTemplates,
    Copy,
}

/// `manifest = { ... }` on a task.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ManifestConfig {
    /// Source manifest (default `[project].manifest`).
    #[serde(default)]
    pub source: Option<String>,
    /// Output directory (default `[project].dist_dir`).
    #[serde(default)]
    pub dest: Option<String>,
    /// Published name (default `[project].name`, then the source's name).
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub typings: Option<String>,
    #[serde(default = "default_extra_files")]
    pub extra_files: Vec<String>,
}

fn default_extra_files() -> Vec<String> {
    vec![
        "README.md".to_string(),
        "LICENSE".to_string(),
        "CHANGELOG.md".to_string(),
    ]
}

/// `test = { ... }` on a task.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub config_file: Option<String>,
    #[serde(default = "default_true")]
    pub single_run: bool,
    #[serde(default = "default_env_mode")]
    pub env_mode: String,
    #[serde(default)]
    pub ci_browsers: Vec<String>,
}

fn default_env_mode() -> String {
    "test".to_string()
}

/// A [`RawConfigFile`] that passed semantic validation.
///
/// Only obtainable through `TryFrom<RawConfigFile>`, so holding one means
/// dependencies exist, the graph is acyclic and every task has at most one
/// action.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    raw: RawConfigFile,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self { raw }
    }

    pub fn project(&self) -> &ProjectSection {
        &self.raw.project
    }

    pub fn config(&self) -> &ConfigSection {
        &self.raw.config
    }

    pub fn defaults(&self) -> &DefaultSection {
        &self.raw.default
    }

    pub fn aliases(&self) -> &BTreeMap<String, AliasConfig> {
        &self.raw.alias
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.raw.task
    }
}
