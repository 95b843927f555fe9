// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::dag::{RunReport, ScheduledTask};
use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Drives the scheduler in response to `RuntimeEvent`s and delegates action
/// execution to an `ExecutorBackend`.
///
/// All semantics live in `CoreRuntime`; this shell only reads events,
/// dispatches tasks and collects finished run reports.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    reports: Vec<RunReport>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            reports: Vec::new(),
        }
    }

    /// Main event loop.
    ///
    /// Returns the reports of every run that finished, in order. Task
    /// failures are part of the reports, not errors of the loop itself.
    pub async fn run(mut self) -> Result<Vec<RunReport>> {
        info!("runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event)?;

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        self.executor.cancel_running();
        Ok(self.reports)
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => self.spawn_ready(tasks).await?,
            CoreCommand::CancelRunning => {
                info!("cancelling running tasks");
                self.executor.cancel_running();
            }
            CoreCommand::RunFinished(report) => {
                log_report(&report);
                self.reports.push(report);
            }
            CoreCommand::RequestExit => debug!("core issued RequestExit command"),
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, "dispatching ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}

fn log_report(report: &RunReport) {
    if report.is_success() {
        info!(
            run_id = report.run_id,
            tasks = report.succeeded.len(),
            "run finished successfully"
        );
        return;
    }

    for (task, message) in &report.failed {
        error!(run_id = report.run_id, task = %task, "{message}");
    }
    if !report.skipped.is_empty() {
        warn!(run_id = report.run_id, skipped = ?report.skipped, "tasks skipped after failure");
    }
}
