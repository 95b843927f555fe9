// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use crate::dag::{RunReport, ScheduledTask, Scheduler, SchedulerStep};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeOptions, TaskName, TaskOutcome, TriggerReason};
use crate::errors::Result;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Abort every running action (fail-fast).
    CancelRunning,
    /// A run reached its end; report it.
    RunFinished(RunReport),
    /// Request that the runtime exits (one-shot mode when idle).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle a trigger for one or more tasks.
///
/// - Idle scheduler: start a new run with these tasks plus anything queued.
/// - Active run: park the triggers in the queue; they become part of the
///   next run. Runs are never merged or overlapped.
pub fn handle_task_trigger(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    tasks: Vec<TaskName>,
    reason: TriggerReason,
) -> Result<CoreStep> {
    if !scheduler.is_idle() {
        tracing::debug!(?tasks, ?reason, "run active; queueing trigger");
        queue.record_trigger(&tasks);
        return Ok(CoreStep::running(Vec::new()));
    }

    let mut targets = queue.next_batch();
    for task in tasks {
        if !targets.contains(&task) {
            targets.push(task);
        }
    }

    let step = scheduler.start_run(&targets)?;
    Ok(finish_step(scheduler, queue, options, step))
}

/// Handle a task completion event.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    task: TaskName,
    run_id: u64,
    outcome: TaskOutcome,
) -> Result<CoreStep> {
    let step = scheduler.handle_completion(&task, run_id, outcome);
    Ok(finish_step(scheduler, queue, options, step))
}

/// Turn a scheduler step into commands, starting a queued run if the
/// scheduler went idle and deciding whether a one-shot runtime can exit.
fn finish_step(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    step: SchedulerStep,
) -> CoreStep {
    let mut commands = Vec::new();

    if step.cancel_running {
        commands.push(CoreCommand::CancelRunning);
    }
    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }
    if let Some(report) = step.finished {
        commands.push(CoreCommand::RunFinished(report));
        commands.extend(maybe_start_queued_run(scheduler, queue));
    }

    let mut keep_running = true;
    if options.exit_when_idle && scheduler.is_idle() && queue.is_empty() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}

/// If the scheduler is idle and there are queued triggers, start a new run.
fn maybe_start_queued_run(scheduler: &mut Scheduler, queue: &mut TriggerQueue) -> Vec<CoreCommand> {
    if !scheduler.is_idle() {
        return Vec::new();
    }

    let targets = queue.next_batch();
    if targets.is_empty() {
        return Vec::new();
    }

    match scheduler.start_run(&targets) {
        Ok(step) => {
            let mut commands = Vec::new();
            if !step.newly_scheduled.is_empty() {
                commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
            }
            commands
        }
        Err(err) => {
            // Queued names come from the watcher, which only knows graph tasks.
            tracing::error!(error = %err, ?targets, "failed to start queued run");
            Vec::new()
        }
    }
}
