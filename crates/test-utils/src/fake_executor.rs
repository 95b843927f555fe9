use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use buildgraph::dag::ScheduledTask;
use buildgraph::engine::{RuntimeEvent, TaskOutcome};
use buildgraph::errors::Result;
use buildgraph::exec::ExecutorBackend;
use tokio::sync::mpsc;

/// An executor that never runs actions. It:
/// - records which tasks were dispatched, in order
/// - immediately reports `TaskCompleted` for each, failing the tasks in
///   `failing` and succeeding the rest.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: BTreeSet<String>,
    cancellations: Arc<Mutex<usize>>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: BTreeSet::new(),
            cancellations: Arc::new(Mutex::new(0)),
        }
    }

    /// Report these tasks as failed.
    pub fn with_failures<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing.extend(tasks.into_iter().map(Into::into));
        self
    }

    /// Shared counter of `cancel_running` calls.
    pub fn cancellations(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.cancellations)
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            for t in tasks {
                executed.lock().unwrap().push(t.name.clone());

                let outcome = if failing.contains(&t.name) {
                    TaskOutcome::Failed(format!("{} failed", t.name))
                } else {
                    TaskOutcome::Success
                };

                // The runtime is blocked on this future, so hand the event
                // off instead of awaiting channel capacity here.
                let tx = tx.clone();
                let event = RuntimeEvent::TaskCompleted {
                    task: t.name.clone(),
                    run_id: t.run_id,
                    outcome,
                };
                tokio::spawn(async move {
                    let _ = tx.send(event).await;
                });
            }
            Ok(())
        })
    }

    fn cancel_running(&mut self) {
        *self.cancellations.lock().unwrap() += 1;
    }
}
