// src/config/validate.rs

use std::time::Duration;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile, TransformConfig};
use crate::errors::{BuildgraphError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = BuildgraphError;

    fn try_from(raw: RawConfigFile) -> Result<Self> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

/// Semantic checks on a parsed configuration:
///
/// - there is at least one task
/// - `queue_length >= 1` and `max_parallel_files >= 1`
/// - duration strings parse
/// - every task has at most one action, command-only keys sit on command
///   tasks, and command transforms name a command
/// - `after` and alias targets refer to existing tasks
/// - the task graph has no cycles
///
/// Glob syntax is checked later, when patterns are compiled.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_actions(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_aliases(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn config_err(msg: impl Into<String>) -> BuildgraphError {
    BuildgraphError::Config(msg.into())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(config_err(
            "config must contain at least one [task.<name>] section",
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.queue_length == 0 {
        return Err(config_err("[config].queue_length must be >= 1 (got 0)"));
    }
    if cfg.config.max_parallel_files == 0 {
        return Err(config_err("[config].max_parallel_files must be >= 1 (got 0)"));
    }
    if let Some(timeout) = &cfg.config.process_timeout {
        parse_duration(timeout)
            .map_err(|e| config_err(format!("[config].process_timeout: {e}")))?;
    }
    Ok(())
}

fn validate_actions(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in &cfg.task {
        let kinds = task.action_kinds();
        if kinds.len() > 1 {
            return Err(config_err(format!(
                "task '{name}' has more than one action ({})",
                kinds.join(", ")
            )));
        }

        let command_keys = task.command_keys();
        if task.cmd.is_none() && task.program.is_none() && !command_keys.is_empty() {
            return Err(config_err(format!(
                "task '{name}' sets {} but has no `cmd` or `program`",
                command_keys.join(", ")
            )));
        }
        if task.cmd.is_some() && !task.args.is_empty() {
            return Err(config_err(format!(
                "task '{name}': `args` only applies to `program`; put the arguments into `cmd`"
            )));
        }

        if let Some(timeout) = &task.timeout {
            parse_duration(timeout)
                .map_err(|e| config_err(format!("task '{name}' timeout: {e}")))?;
        }

        if let Some(pipeline) = &task.pipeline {
            if pipeline.src.is_empty() {
                return Err(config_err(format!("task '{name}' pipeline has no `src` patterns")));
            }
            for transform in &pipeline.transforms {
                if let TransformConfig::Command { cmd, program, .. } = transform {
                    if cmd.is_some() == program.is_some() {
                        return Err(config_err(format!(
                            "task '{name}': a command transform needs exactly one of `cmd` or `program`"
                        )));
                    }
                }
            }
        }
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in &cfg.task {
        for dep in &task.after {
            if dep == name {
                return Err(BuildgraphError::Cycle(format!(
                    "task '{name}' cannot depend on itself in `after`"
                )));
            }
            if !cfg.task.contains_key(dep) {
                return Err(BuildgraphError::UnknownTask(format!(
                    "'{dep}' (dependency of '{name}' in `after`)"
                )));
            }
        }
    }
    Ok(())
}

fn validate_aliases(cfg: &RawConfigFile) -> Result<()> {
    for (name, alias) in &cfg.alias {
        if cfg.task.contains_key(name) {
            return Err(config_err(format!(
                "alias '{name}' has the same name as a task"
            )));
        }
        if alias.targets.is_empty() {
            return Err(config_err(format!("alias '{name}' has no targets")));
        }
        for target in &alias.targets {
            if !cfg.task.contains_key(target) {
                return Err(config_err(format!(
                    "alias '{name}' refers to unknown task '{target}'"
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }
    for (name, task) in &cfg.task {
        for dep in &task.after {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_) => Ok(()),
        Err(cycle) => Err(BuildgraphError::Cycle(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}

/// Parse `500ms`, `30s`, `2m` or `1h`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;

    let secs_per_unit = match unit_part.trim().to_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        unit => {
            return Err(format!(
                "unsupported duration unit '{unit}'; expected ms, s, m, or h"
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
