// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};

use crate::engine::TaskName;
use crate::pipeline::GlobResolver;

/// Watch lists from `[default]` in the config.
///
/// ```toml
/// [default]
/// watch = ["src/**/*.ts"]
/// exclude = ["src/**/*.spec.ts"]
/// ```
#[derive(Debug, Clone, Default)]
pub struct WatchDefaults {
    pub watch: Vec<String>,
    pub exclude: Vec<String>,
}

/// Per-task pattern lists as written in the config.
///
/// `append_default_*` merge the task list with the default list instead of
/// replacing it. The effective patterns are computed by
/// [`build_task_watch_profiles`].
#[derive(Debug, Clone, Default)]
pub struct TaskPatternSpec {
    pub name: TaskName,
    pub watch: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub append_default_watch: bool,
    pub append_default_exclude: bool,
    /// Only trigger when the content of the matched files changed.
    pub use_hash: bool,
}

/// Compiled watch/exclude patterns for one task, relative to the project
/// root.
#[derive(Clone)]
pub struct TaskWatchProfile {
    name: TaskName,
    resolver: GlobResolver,
    use_hash: bool,
}

impl fmt::Debug for TaskWatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskWatchProfile")
            .field("name", &self.name)
            .field("patterns", &self.resolver.patterns())
            .field("use_hash", &self.use_hash)
            .finish()
    }
}

impl TaskWatchProfile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    pub fn resolver(&self) -> &GlobResolver {
        &self.resolver
    }

    /// Whether a root-relative path such as `src/app/a.ts` concerns this task.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.resolver.matches(rel_path)
    }
}

/// Build a profile for every task whose effective watch list is non-empty.
///
/// - `append_default_watch = true`: `task.watch + default.watch`.
/// - Else, if `task.watch` is set, only that.
/// - Else, `default.watch`.
///
/// Same rules for `exclude`.
pub fn build_task_watch_profiles(
    defaults: &WatchDefaults,
    specs: &[TaskPatternSpec],
) -> Result<Vec<TaskWatchProfile>> {
    let mut profiles = Vec::with_capacity(specs.len());

    for spec in specs {
        let watch = effective_patterns(
            spec.watch.as_deref(),
            &defaults.watch,
            spec.append_default_watch,
        );
        if watch.is_empty() {
            continue;
        }
        let exclude = effective_patterns(
            spec.exclude.as_deref(),
            &defaults.exclude,
            spec.append_default_exclude,
        );

        let resolver = GlobResolver::new(&watch, &exclude)
            .with_context(|| format!("building watch patterns for task {}", spec.name))?;

        profiles.push(TaskWatchProfile {
            name: spec.name.clone(),
            resolver,
            use_hash: spec.use_hash,
        });
    }

    Ok(profiles)
}

fn effective_patterns(
    task_list: Option<&[String]>,
    default_list: &[String],
    append_default: bool,
) -> Vec<String> {
    match (task_list, append_default) {
        (Some(list), true) => {
            let mut combined = list.to_vec();
            combined.extend(default_list.iter().cloned());
            combined
        }
        (Some(list), false) => list.to_vec(),
        (None, _) => default_list.to_vec(),
    }
}
