#![allow(dead_code, unused_imports)]

pub use buildgraph_test_utils::builders;
pub use buildgraph_test_utils::fake_executor::FakeExecutor;
pub use buildgraph_test_utils::{init_tracing, with_timeout};

use buildgraph::dag::{SchedulerStep, Scheduler};
use buildgraph::engine::TaskOutcome;

/// Names of the tasks a step dispatched.
pub fn scheduled_names(step: &SchedulerStep) -> Vec<String> {
    step.newly_scheduled.iter().map(|t| t.name.clone()).collect()
}

/// Complete `task` successfully in the scheduler's current run.
pub fn succeed(scheduler: &mut Scheduler, task: &str) -> SchedulerStep {
    let run_id = scheduler.current_run_id().expect("run active");
    scheduler.handle_completion(task, run_id, TaskOutcome::Success)
}

/// Fail `task` in the scheduler's current run.
pub fn fail(scheduler: &mut Scheduler, task: &str) -> SchedulerStep {
    let run_id = scheduler.current_run_id().expect("run active");
    scheduler.handle_completion(task, run_id, TaskOutcome::Failed(format!("{task} broke")))
}
