// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::watch::filter::TriggerFilter;

/// Keeps the underlying `notify` watcher alive. Dropping it stops watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch the filter's root recursively and send one
/// `RuntimeEvent::TaskTriggered` per debounced batch of changes.
///
/// After the first event of a batch, further events are collected until
/// nothing arrives for `debounce`.
pub fn spawn_watcher(
    mut filter: TriggerFilter,
    debounce: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = filter.root().to_path_buf();

    // notify calls back on its own thread; bridge into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event_tx.send(event).is_err() {
                    debug!("watch loop gone; dropping notify event");
                }
            }
            Err(err) => error!("file watch error: {err}"),
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!(root = %root.display(), profiles = filter.profiles().len(), "file watcher started");

    filter.prime_hashes();

    tokio::spawn(async move {
        while let Some(first) = event_rx.recv().await {
            let mut batch = BTreeSet::new();
            collect_paths(&first, &mut batch);

            loop {
                match tokio::time::timeout(debounce, event_rx.recv()).await {
                    Ok(Some(event)) => collect_paths(&event, &mut batch),
                    Ok(None) => break,
                    Err(_) => break,
                }
            }

            if batch.is_empty() {
                continue;
            }

            let paths: Vec<PathBuf> = batch.into_iter().collect();
            debug!(changed = paths.len(), "debounced change batch");

            let tasks = filter.tasks_for_paths(&paths);
            if tasks.is_empty() {
                continue;
            }

            info!(?tasks, "change detected; triggering");
            let event = RuntimeEvent::TaskTriggered {
                tasks,
                reason: TriggerReason::FileWatch,
            };
            if let Err(err) = runtime_tx.send(event).await {
                warn!("runtime channel closed; stopping watcher: {err}");
                return;
            }
        }

        debug!("file watcher loop ended");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Add the paths of a relevant event to the batch. Access events (reads,
/// opens) never count as changes.
fn collect_paths(event: &Event, batch: &mut BTreeSet<PathBuf>) {
    match event.kind {
        EventKind::Access(_) => {}
        _ => batch.extend(event.paths.iter().cloned()),
    }
}
