// src/dag/scheduler_step.rs

use crate::dag::report::RunReport;
use crate::dag::task_info::ScheduledTask;
use crate::engine::TaskName;

/// Result of a single scheduler step.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks whose dependencies are now satisfied; dispatch them.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Tasks newly marked as skipped because of an upstream failure.
    pub newly_skipped: Vec<TaskName>,
    /// Fail-fast halted the run: abort whatever is still running.
    pub cancel_running: bool,
    /// Set when this step moved the last task of the run to a terminal state.
    pub finished: Option<RunReport>,
}
