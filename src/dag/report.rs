// src/dag/report.rs

use crate::engine::TaskName;
use crate::errors::{BuildgraphError, Result};

/// Outcome of one run of the executor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: u64,
    /// Tasks that succeeded, in completion order.
    pub succeeded: Vec<TaskName>,
    /// Failed tasks with the failure message, in completion order.
    pub failed: Vec<(TaskName, String)>,
    /// Tasks that never ran because a dependency failed or the run halted.
    pub skipped: Vec<TaskName>,
}

impl RunReport {
    pub fn new(run_id: u64) -> Self {
        Self {
            run_id,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Convert into an error for the first failed task, if any.
    pub fn into_result(self) -> Result<RunReport> {
        match self.failed.first() {
            None => Ok(self),
            Some((task, message)) => Err(BuildgraphError::ActionFailure {
                task: task.clone(),
                message: message.clone(),
            }),
        }
    }
}
