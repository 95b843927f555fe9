// src/dag/mod.rs

//! Task graph representation and scheduling.
//!
//! - [`graph`] holds the validated, immutable task graph and its builder.
//! - [`scheduler`] contains the per-run state machine that decides
//!   which tasks are ready to run and what happens when one fails.
//! - [`task_info`] provides task metadata and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.
//! - [`report`] summarises a finished run.

pub mod graph;
pub mod report;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::{Task, TaskGraph, TaskGraphBuilder};
pub use report::RunReport;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskRunState};
