// src/dag/state_manager.rs

//! Per-run state management for tasks in the scheduler.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info, warn};

use crate::dag::graph::TaskGraph;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::engine::TaskName;

/// Manages per-run state transitions for tasks.
pub struct StateManager<'a> {
    graph: &'a TaskGraph,
    tasks: &'a mut BTreeMap<TaskName, TaskInfo>,
    current_run_id: Option<u64>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a TaskGraph,
        tasks: &'a mut BTreeMap<TaskName, TaskInfo>,
        current_run_id: Option<u64>,
    ) -> Self {
        Self {
            graph,
            tasks,
            current_run_id,
        }
    }

    /// Include a target and everything it transitively depends on in this run.
    ///
    /// Tasks already participating in this run keep their current state, so a
    /// task reachable through several paths is only run once.
    pub fn mark_closure_pending(&mut self, target: &str) {
        let mut stack: Vec<TaskName> = vec![target.to_string()];
        let mut visited: HashSet<TaskName> = HashSet::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }

            if let Some(info) = self.tasks.get_mut(&name) {
                if info.run_state.is_none() {
                    info.run_state = Some(RunState::Pending);
                    debug!(task = %info.name, "marked Pending for this run");
                }
                stack.extend(self.graph.dependencies_of(&name).iter().cloned());
            } else {
                warn!(task = %name, "node in graph not present in tasks map");
            }
        }
    }

    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        ReadOnlyStateManager::new(self.tasks).deps_satisfied_for_info(info)
    }

    /// Mark every pending dependent (transitively) of a failed task as
    /// `Skipped` for this run.
    ///
    /// Returns the newly skipped tasks (excluding the failed task itself).
    pub fn mark_dependents_skipped(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();
        let mut skipped = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&name) {
                if info.run_state == Some(RunState::Pending) {
                    info.run_state = Some(RunState::Skipped);
                    debug!(
                        task = %info.name,
                        upstream = %failed_task,
                        "skipping dependent due to upstream failure"
                    );
                    skipped.push(info.name.clone());
                    stack.extend(self.graph.dependents_of(&name).iter().cloned());
                }
            }
        }

        skipped
    }

    /// Fail-fast: move every pending or running task to `Skipped`.
    pub fn skip_all_unfinished(&mut self) -> Vec<TaskName> {
        let mut skipped = Vec::new();
        for info in self.tasks.values_mut() {
            if matches!(info.run_state, Some(RunState::Pending) | Some(RunState::Running)) {
                info.run_state = Some(RunState::Skipped);
                skipped.push(info.name.clone());
            }
        }
        skipped
    }

    /// Collect tasks that are `Pending` and whose dependencies succeeded,
    /// mark them `Running`, and return them in name order.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let candidates: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| {
                info.run_state == Some(RunState::Pending) && self.deps_satisfied_for_info(info)
            })
            .map(|info| info.name.clone())
            .collect();

        let mut ready = Vec::with_capacity(candidates.len());
        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                match info.last_finished {
                    Some(last) => info!(
                        task = %info.name,
                        run_id = self.current_run_id,
                        previous_run = last.run_id,
                        previous_ok = last.succeeded,
                        "scheduling task again"
                    ),
                    None => info!(task = %info.name, run_id = self.current_run_id, "scheduling task"),
                }

                info.run_state = Some(RunState::Running);
                ready.push(ScheduledTask::from_task_info(
                    info,
                    self.current_run_id.unwrap_or(0),
                ));
            }
        }

        ready
    }

    pub fn all_tasks_terminal(&self) -> bool {
        !self.tasks.values().any(|info| {
            matches!(
                info.run_state,
                Some(RunState::Pending) | Some(RunState::Running)
            )
        })
    }
}

/// Read-only view used when only shared access to the tasks map is available.
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a BTreeMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a BTreeMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    /// All direct dependencies finished successfully in the current run.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep_name| match self.tasks.get(dep_name) {
            Some(dep) => dep.run_state == Some(RunState::DoneSuccess),
            None => {
                warn!(
                    task = %info.name,
                    dep = %dep_name,
                    "dependency missing from tasks map"
                );
                false
            }
        })
    }
}
