// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use crate::engine::TaskName;
use crate::types::TriggerWhileRunningBehaviour;

/// Triggers that arrive while a run is executing.
///
/// Runs never overlap: a trigger for a busy scheduler is parked here and
/// replayed as a fresh run once the current one finishes.
///
/// - Each queued entry is a *batch* of task names that become the targets of
///   one future run.
/// - `max_runs` bounds how many follow-up runs are kept (default 1). Once
///   the bound is reached, later triggers merge into the newest batch, so no
///   trigger is lost.
/// - `next_batch()` hands out one batch per finished run, oldest first.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    runs: VecDeque<BTreeSet<TaskName>>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    /// Record a trigger batch that arrived while a run is in progress.
    ///
    /// - `Queue`: start a new batch while fewer than `max_runs` are queued,
    ///   otherwise merge into the newest one.
    /// - `Cancel`: replace everything queued with this batch.
    pub fn record_trigger<S: AsRef<str>>(&mut self, tasks: &[S]) {
        let batch: BTreeSet<TaskName> = tasks.iter().map(|t| t.as_ref().to_string()).collect();
        if batch.is_empty() {
            return;
        }

        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                if self.runs.len() < self.max_runs {
                    debug!(tasks = ?batch, queued = self.runs.len() + 1, "queued trigger as a new batch");
                    self.runs.push_back(batch);
                } else if let Some(last_batch) = self.runs.back_mut() {
                    debug!(
                        tasks = ?batch,
                        max_runs = self.max_runs,
                        "queue_length reached; merged trigger into newest batch"
                    );
                    last_batch.extend(batch);
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                debug!(tasks = ?batch, "replacing queued batches (cancel mode)");
                self.runs.clear();
                self.runs.push_back(batch);
            }
        }
    }

    /// Take the oldest queued batch as a sorted target list. Empty when
    /// nothing is queued.
    pub fn next_batch(&mut self) -> Vec<TaskName> {
        let batch = self.runs.pop_front().unwrap_or_default();
        if !batch.is_empty() {
            debug!(targets = batch.len(), remaining = self.runs.len(), "took queued batch for next run");
        }
        batch.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }
}
