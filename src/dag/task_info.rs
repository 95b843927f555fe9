// src/dag/task_info.rs

//! Task metadata and per-run state.

use std::fmt;
use std::sync::Arc;

use crate::engine::TaskName;
use crate::exec::Action;

/// Per-run state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Part of this run, waiting on dependencies.
    Pending,
    /// Dispatched to the executor and currently running.
    Running,
    /// Action finished successfully in this run.
    DoneSuccess,
    /// Action failed in this run.
    DoneFailed,
    /// Never started (a dependency failed) or abandoned by fail-fast.
    Skipped,
}

/// Public, read-only view of a task's per-run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task is not participating in this run.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
    Skipped,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
            Some(RunState::Skipped) => TaskRunState::Skipped,
        }
    }
}

/// Static task information from the graph, plus per-run state.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    pub action: Option<Arc<dyn Action>>,
    /// Direct dependencies for this task.
    pub deps: Vec<TaskName>,

    /// Per-run state (None if not participating in the current run).
    pub run_state: Option<RunState>,

    /// How the task ended the last time it actually ran.
    pub last_finished: Option<Finished>,
}

/// Run id and result of a finished execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finished {
    pub run_id: u64,
    pub succeeded: bool,
}

impl TaskInfo {
    pub fn new(name: TaskName, deps: Vec<TaskName>, action: Option<Arc<dyn Action>>) -> Self {
        Self {
            name,
            action,
            deps,
            run_state: None,
            last_finished: None,
        }
    }
}

/// A task the scheduler wants the executor to run now.
#[derive(Clone)]
pub struct ScheduledTask {
    pub name: TaskName,
    /// `None` for group tasks, which succeed without doing anything.
    pub action: Option<Arc<dyn Action>>,
    /// All tasks dispatched for the same run share the same `run_id`.
    pub run_id: u64,
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("name", &self.name)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

impl ScheduledTask {
    pub fn from_task_info(info: &TaskInfo, run_id: u64) -> Self {
        Self {
            name: info.name.clone(),
            action: info.action.clone(),
            run_id,
        }
    }
}
