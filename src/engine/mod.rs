// src/engine/mod.rs

//! Run orchestration.
//!
//! Events from the CLI, the file watcher and finished actions all arrive as
//! [`RuntimeEvent`]s. [`core`] folds them into scheduler state without any
//! IO and answers with commands; [`runtime`] is the tokio loop that executes
//! those commands. Triggers that arrive mid-run wait in [`queue`].

/// Tasks are identified by their configured name.
pub type TaskName = String;

/// Outcome of a task's action for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The action failed; the message is reported to the user.
    Failed(String),
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Requested on the command line (or the initial run in watch mode).
    Manual,
    /// A watched file changed.
    FileWatch,
}

/// Behaviour switches shared by the core and the shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once the scheduler is idle and there are no
    /// queued triggers (one-shot mode).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the CLI, watcher and executor.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Run these tasks, with their dependencies, together in one run.
    TaskTriggered {
        tasks: Vec<TaskName>,
        reason: TriggerReason,
    },
    /// A task's action finished.
    TaskCompleted {
        task: TaskName,
        run_id: u64,
        outcome: TaskOutcome,
    },
    /// Stop after the current event (Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use crate::types::TriggerWhileRunningBehaviour;
pub use runtime::Runtime;
