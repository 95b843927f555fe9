// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of running actions
//! itself. Production uses [`ActionBackend`]; tests provide backends that
//! record dispatches and complete tasks without touching the filesystem.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, error, info};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskName, TaskOutcome};
use crate::errors::Result;
use crate::exec::action::ActionContext;

/// Trait abstracting how scheduled tasks are executed.
pub trait ExecutorBackend: Send {
    /// Start the given tasks. Each must eventually produce a
    /// `RuntimeEvent::TaskCompleted`, unless cancelled.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Abort everything still running. Cancelled tasks report nothing.
    fn cancel_running(&mut self) {}
}

/// Runs each scheduled task's action on its own Tokio task and reports the
/// outcome back over the runtime channel.
pub struct ActionBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    ctx: ActionContext,
    running: HashMap<TaskName, AbortHandle>,
}

impl ActionBackend {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, ctx: ActionContext) -> Self {
        Self {
            runtime_tx,
            ctx,
            running: HashMap::new(),
        }
    }
}

impl ExecutorBackend for ActionBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.running.retain(|_, handle| !handle.is_finished());

            for task in tasks {
                let tx = self.runtime_tx.clone();
                let ctx = self.ctx.for_task(&task.name);
                let name = task.name.clone();

                let handle = tokio::spawn(async move {
                    let outcome = run_scheduled(&task, &ctx).await;
                    let event = RuntimeEvent::TaskCompleted {
                        task: task.name.clone(),
                        run_id: task.run_id,
                        outcome,
                    };
                    if tx.send(event).await.is_err() {
                        debug!(task = %task.name, "runtime gone; dropping completion");
                    }
                });

                self.running.insert(name, handle.abort_handle());
            }
            Ok(())
        })
    }

    fn cancel_running(&mut self) {
        for (name, handle) in self.running.drain() {
            if !handle.is_finished() {
                info!(task = %name, "aborting running task");
                handle.abort();
            }
        }
    }
}

async fn run_scheduled(task: &ScheduledTask, ctx: &ActionContext) -> TaskOutcome {
    let Some(action) = &task.action else {
        debug!(task = %task.name, "group task; nothing to run");
        return TaskOutcome::Success;
    };

    info!(task = %task.name, run_id = task.run_id, action = %action.describe(), "starting task");
    match action.run(ctx).await {
        Ok(()) => {
            info!(task = %task.name, run_id = task.run_id, "task finished");
            TaskOutcome::Success
        }
        Err(err) => {
            error!(task = %task.name, run_id = task.run_id, error = %format!("{err:#}"), "task failed");
            TaskOutcome::Failed(format!("{err:#}"))
        }
    }
}
