// src/engine/core.rs

//! Event reducer for the runtime.
//!
//! [`CoreRuntime::step`] takes one event and returns a [`CoreStep`]: the
//! commands for the shell (dispatch, cancel, report) and whether to keep
//! going. Nothing here awaits or touches channels, so tests can feed events
//! by hand and inspect the commands.

use crate::dag::Scheduler;
use crate::engine::event_handlers::{handle_task_completion, handle_task_trigger, CoreStep};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::errors::Result;
use crate::types::TriggerWhileRunningBehaviour;

#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(
        scheduler: Scheduler,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            scheduler,
            queue: TriggerQueue::new(behaviour, queue_length),
            options,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Apply one event.
    ///
    /// Errors only come from triggers naming unknown tasks.
    pub fn step(&mut self, event: RuntimeEvent) -> Result<CoreStep> {
        match event {
            RuntimeEvent::TaskTriggered { tasks, reason } => handle_task_trigger(
                &mut self.scheduler,
                &mut self.queue,
                &self.options,
                tasks,
                reason,
            ),
            RuntimeEvent::TaskCompleted {
                task,
                run_id,
                outcome,
            } => handle_task_completion(
                &mut self.scheduler,
                &mut self.queue,
                &self.options,
                task,
                run_id,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => Ok(CoreStep {
                commands: Vec::new(),
                keep_running: false,
            }),
        }
    }
}
