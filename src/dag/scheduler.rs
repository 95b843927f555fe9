use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::graph::TaskGraph;
use crate::dag::report::RunReport;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{Finished, RunState, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};
use crate::errors::{BuildgraphError, Result};

/// Scheduler holds the immutable graph plus mutable per-run state.
///
/// It is responsible for:
/// - marking the targets' dependency closure as part of a run
/// - deciding when a pending task is ready (all deps succeeded)
/// - recording successes and failures
/// - skipping dependents of failed tasks (or everything, in fail-fast mode)
/// - producing a [`RunReport`] when the last task reaches a terminal state
#[derive(Debug)]
pub struct Scheduler {
    graph: Arc<TaskGraph>,
    tasks: BTreeMap<TaskName, TaskInfo>,
    fail_fast: bool,
    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,
    report: RunReport,
}

impl Scheduler {
    pub fn new(graph: Arc<TaskGraph>) -> Self {
        let tasks = graph
            .tasks()
            .map(|name| {
                let info = TaskInfo::new(
                    name.to_string(),
                    graph.dependencies_of(name).to_vec(),
                    graph.action_of(name),
                );
                (name.to_string(), info)
            })
            .collect();

        Self {
            graph,
            tasks,
            fail_fast: false,
            run_counter: 0,
            current_run_id: None,
            report: RunReport::default(),
        }
    }

    /// On the first failure, skip everything pending and cancel running tasks.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn graph(&self) -> &Arc<TaskGraph> {
        &self.graph
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    /// Read-only view of the given task's run state; `None` for unknown tasks.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Names of tasks participating in the active run.
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        if self.current_run_id.is_none() {
            return Vec::new();
        }

        self.tasks
            .values()
            .filter(|info| info.run_state.is_some())
            .map(|info| info.name.clone())
            .collect()
    }

    /// Whether the dependencies of `task` are satisfied for the current run.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        Some(ReadOnlyStateManager::new(&self.tasks).deps_satisfied_for_info(info))
    }

    /// Start a new run for the given targets and return the first ready tasks.
    ///
    /// Every target must be a registered task; the check happens before any
    /// state changes, so an unknown name leaves the scheduler idle.
    pub fn start_run<S: AsRef<str>>(&mut self, targets: &[S]) -> Result<SchedulerStep> {
        if let Some(run_id) = self.current_run_id {
            return Err(BuildgraphError::Other(anyhow::anyhow!(
                "cannot start a run while run {run_id} is active"
            )));
        }
        for target in targets {
            if !self.tasks.contains_key(target.as_ref()) {
                return Err(BuildgraphError::UnknownTask(target.as_ref().to_string()));
            }
        }

        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);
        self.report = RunReport::new(self.run_counter);
        for info in self.tasks.values_mut() {
            info.run_state = None;
        }

        let names: Vec<&str> = targets.iter().map(|t| t.as_ref()).collect();
        info!(run_id = self.run_counter, targets = ?names, "scheduler: starting run");

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        for target in &names {
            manager.mark_closure_pending(target);
        }
        let newly_scheduled = manager.collect_new_ready_tasks();
        let finished = self.maybe_finish_run();

        Ok(SchedulerStep {
            newly_scheduled,
            finished,
            ..SchedulerStep::default()
        })
    }

    /// Record the outcome of a running task.
    ///
    /// Completions for tasks that are not running in the given run (stale
    /// events from an earlier run, or tasks abandoned by fail-fast) are
    /// ignored.
    pub fn handle_completion(&mut self, task: &str, run_id: u64, outcome: TaskOutcome) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        if self.current_run_id != Some(run_id) {
            debug!(task = %task, run_id, "completion for inactive run; ignoring");
            return step;
        }

        let Some(info) = self.tasks.get_mut(task) else {
            warn!(task = %task, "completion for unknown task; ignoring");
            return step;
        };

        if info.run_state != Some(RunState::Running) {
            debug!(task = %task, run_id, state = ?info.run_state, "completion for task that is not running; ignoring");
            return step;
        }

        match outcome {
            TaskOutcome::Success => {
                info.run_state = Some(RunState::DoneSuccess);
                info.last_finished = Some(Finished {
                    run_id,
                    succeeded: true,
                });
                self.report.succeeded.push(info.name.clone());
                debug!(task = %task, run_id, "task completed successfully");

                let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                step.newly_scheduled = manager.collect_new_ready_tasks();
            }
            TaskOutcome::Failed(message) => {
                info.run_state = Some(RunState::DoneFailed);
                info.last_finished = Some(Finished {
                    run_id,
                    succeeded: false,
                });
                warn!(task = %task, run_id, error = %message, "task failed");
                self.report.failed.push((info.name.clone(), message));

                let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                step.newly_skipped = manager.mark_dependents_skipped(task);

                if self.fail_fast {
                    info!(run_id, "fail-fast: halting run");
                    step.newly_skipped.extend(manager.skip_all_unfinished());
                    step.cancel_running = true;
                } else {
                    // Independent branches keep going.
                    step.newly_scheduled = manager.collect_new_ready_tasks();
                }
                self.report.skipped.extend(step.newly_skipped.iter().cloned());
            }
        }

        step.finished = self.maybe_finish_run();
        step
    }

    /// If every task of the active run is terminal, close the run and return
    /// its report.
    fn maybe_finish_run(&mut self) -> Option<RunReport> {
        let run_id = self.current_run_id?;

        let manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        if !manager.all_tasks_terminal() {
            return None;
        }

        info!(run_id, "scheduler: all tasks terminal; run finished");
        self.current_run_id = None;
        Some(std::mem::take(&mut self.report))
    }
}
