// src/config/build.rs

//! Turning a validated [`ConfigFile`] into runtime structures: the task
//! graph with concrete actions, run requests and watch pattern specs.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::model::{ConfigFile, PipelineConfig, TaskConfig, TransformConfig};
use crate::config::validate::parse_duration;
use crate::dag::{Task, TaskGraph, TaskGraphBuilder};
use crate::errors::{BuildgraphError, Result};
use crate::exec::{Action, CleanAction, CommandAction, CommandSpec};
use crate::manifest::{ManifestAction, ManifestSpec};
use crate::pipeline::{
    CommandTransform, CopyFile, GlobResolver, InlineTemplates, PipelineAction, RenameExtension,
    StripLineComments, Transform,
};
use crate::testing::{TestRunAction, TestRunnerConfig};
use crate::types::{RunMode, RunRequest};
use crate::watch::{TaskPatternSpec, WatchDefaults};

/// Build the task graph, one node per `[task.<name>]`.
pub fn build_graph(cfg: &ConfigFile) -> Result<TaskGraph> {
    let mut builder = TaskGraphBuilder::new();
    for (name, task) in cfg.tasks() {
        let mut node = Task::new(name.clone()).after_all(task.after.iter().cloned());
        if let Some(action) = build_action(cfg, name, task)? {
            node = node.action(action);
        }
        builder.add(node);
    }
    builder.build()
}

/// The action configured on a task, or `None` for a group task.
pub fn build_action(
    cfg: &ConfigFile,
    name: &str,
    task: &TaskConfig,
) -> Result<Option<Arc<dyn Action>>> {
    let project = cfg.project();

    if let Some(spec) = command_spec(cfg, task.cmd.as_deref(), task.program.as_deref(), &task.args)
    {
        let mut spec = task
            .env
            .iter()
            .fold(spec, |spec, (k, v)| spec.env(k, project.expand(v)));
        if let Some(cwd) = &task.cwd {
            spec = spec.cwd(project.expand(cwd));
        }
        let timeout = task.timeout.as_deref().map(duration).transpose()?;
        let mut action = CommandAction::new(spec)
            .with_timeout(timeout)
            .with_cleanup(task.cleanup.iter().map(|p| expand_path(cfg, p)).collect());
        if let Some(codes) = &task.success_codes {
            action = action.with_success_codes(codes.clone());
        }
        return Ok(Some(Arc::new(action)));
    }

    if let Some(pipeline) = &task.pipeline {
        return Ok(Some(Arc::new(build_pipeline(cfg, name, pipeline)?)));
    }

    if let Some(paths) = &task.clean {
        let paths = paths.iter().map(|p| expand_path(cfg, p));
        return Ok(Some(Arc::new(CleanAction::new(paths))));
    }

    if let Some(manifest) = &task.manifest {
        let spec = ManifestSpec {
            name: manifest
                .name
                .clone()
                .or_else(|| project.name.clone())
                .unwrap_or_default(),
            fields: manifest.fields.clone(),
            main: manifest.main.clone(),
            module: manifest.module.clone(),
            typings: manifest.typings.clone(),
        };
        let action = ManifestAction {
            spec,
            source: expand_path(cfg, manifest.source.as_deref().unwrap_or(&project.manifest)),
            dest: expand_path(cfg, manifest.dest.as_deref().unwrap_or(&project.dist_dir)),
            extra_files: manifest.extra_files.iter().map(|p| expand_path(cfg, p)).collect(),
        };
        return Ok(Some(Arc::new(action)));
    }

    if let Some(test) = &task.test {
        let config = TestRunnerConfig {
            program: project.expand(&test.program),
            args: test.args.iter().map(|a| project.expand(a)).collect(),
            config_file: test.config_file.as_deref().map(|c| project.expand(c)),
            single_run: test.single_run,
            env_mode: test.env_mode.clone(),
            ci_browsers: test.ci_browsers.clone(),
        };
        return Ok(Some(Arc::new(TestRunAction::new(config))));
    }

    Ok(None)
}

fn build_pipeline(cfg: &ConfigFile, name: &str, pipeline: &PipelineConfig) -> Result<PipelineAction> {
    let project = cfg.project();
    let src: Vec<String> = pipeline.src.iter().map(|p| project.expand(p)).collect();
    let exclude: Vec<String> = pipeline.exclude.iter().map(|p| project.expand(p)).collect();
    let resolver = GlobResolver::new(&src, &exclude).map_err(|e| {
        BuildgraphError::Config(format!("task '{name}' pipeline: {e}"))
    })?;

    let mut transforms: Vec<Arc<dyn Transform>> = Vec::with_capacity(pipeline.transforms.len());
    for transform in &pipeline.transforms {
        let built: Arc<dyn Transform> = match transform {
            TransformConfig::Command { cmd, program, args } => {
                let command = command_spec(cfg, cmd.as_deref(), program.as_deref(), args)
                    .ok_or_else(|| {
                        BuildgraphError::Config(format!(
                            "task '{name}': command transform without a command"
                        ))
                    })?;
                Arc::new(CommandTransform { command })
            }
            TransformConfig::StripLineComments => Arc::new(StripLineComments),
            TransformConfig::RenameExtension { extension } => Arc::new(RenameExtension {
                extension: extension.clone(),
            }),
            TransformConfig::InlineTemplates => Arc::new(InlineTemplates::new()?),
            TransformConfig::Copy => Arc::new(CopyFile),
        };
        transforms.push(built);
    }

    let base = pipeline
        .base
        .as_deref()
        .map(|b| expand_path(cfg, b))
        .unwrap_or_default();

    Ok(PipelineAction::new(
        resolver,
        base,
        expand_path(cfg, &pipeline.dest),
        transforms,
    ))
}

fn command_spec(
    cfg: &ConfigFile,
    cmd: Option<&str>,
    program: Option<&str>,
    args: &[String],
) -> Option<CommandSpec> {
    let project = cfg.project();
    match (cmd, program) {
        (Some(line), _) => Some(CommandSpec::shell(project.expand(line))),
        (None, Some(program)) => Some(
            CommandSpec::new(project.expand(program))
                .args(args.iter().map(|a| project.expand(a))),
        ),
        (None, None) => None,
    }
}

fn expand_path(cfg: &ConfigFile, path: &str) -> PathBuf {
    PathBuf::from(cfg.project().expand(path))
}

fn duration(s: &str) -> Result<Duration> {
    parse_duration(s).map_err(BuildgraphError::Config)
}

/// Default process timeout from `[config].process_timeout`.
pub fn process_timeout(cfg: &ConfigFile) -> Result<Option<Duration>> {
    cfg.config().process_timeout.as_deref().map(duration).transpose()
}

/// Resolve a CLI target (task or alias) into a run request. `force_watch`
/// is the `--watch` flag.
pub fn resolve_request(cfg: &ConfigFile, target: &str, force_watch: bool) -> Result<RunRequest> {
    let mut request = if let Some(alias) = cfg.aliases().get(target) {
        RunRequest {
            targets: alias.targets.clone(),
            mode: alias.mode,
        }
    } else if cfg.tasks().contains_key(target) {
        RunRequest::once(target)
    } else {
        return Err(BuildgraphError::UnknownTask(target.to_string()));
    };

    if force_watch {
        request.mode = RunMode::Watch;
    }
    Ok(request)
}

pub fn watch_defaults(cfg: &ConfigFile) -> WatchDefaults {
    WatchDefaults {
        watch: cfg.defaults().watch.clone(),
        exclude: cfg.defaults().exclude.clone(),
    }
}

/// Pattern specs for the given tasks (normally the closure of the watch
/// targets), in name order.
pub fn watch_specs<'a, I>(cfg: &ConfigFile, tasks: I) -> Vec<TaskPatternSpec>
where
    I: IntoIterator<Item = &'a String>,
{
    let default_use_hash = cfg.defaults().use_hash.unwrap_or(false);
    let project = cfg.project();
    let expand_all = |list: &Option<Vec<String>>| {
        list.as_ref()
            .map(|l| l.iter().map(|p| project.expand(p)).collect::<Vec<_>>())
    };

    tasks
        .into_iter()
        .filter_map(|name| cfg.tasks().get(name).map(|task| (name, task)))
        .map(|(name, task)| TaskPatternSpec {
            name: name.clone(),
            watch: expand_all(&task.watch),
            exclude: expand_all(&task.exclude),
            append_default_watch: task.append_default_watch,
            append_default_exclude: task.append_default_exclude,
            use_hash: task.effective_use_hash(default_use_hash),
        })
        .collect()
}
