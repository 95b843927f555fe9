// tests/watcher.rs

mod common;
use crate::common::builders::group_graph;
use crate::common::init_tracing;

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use buildgraph::engine::{RuntimeEvent, TriggerReason};
use buildgraph::fs::RealFileSystem;
use buildgraph::watch::{
    build_task_watch_profiles, spawn_watcher, TaskPatternSpec, TriggerFilter, WatchDefaults,
    WatcherHandle,
};
use tokio::sync::mpsc;

type TestResult = Result<(), Box<dyn Error>>;

const DEBOUNCE: Duration = Duration::from_millis(200);

fn spec(name: &str, watch: &str) -> TaskPatternSpec {
    TaskPatternSpec {
        name: name.to_string(),
        watch: Some(vec![watch.to_string()]),
        ..TaskPatternSpec::default()
    }
}

/// Watch `root` with `compile` on `src/**/*.ts` and `styles` on
/// `src/**/*.scss`.
fn start(root: &Path) -> Result<(WatcherHandle, mpsc::Receiver<RuntimeEvent>), Box<dyn Error>> {
    let graph = Arc::new(group_graph(&[("compile", &[]), ("styles", &[])]));
    let profiles = build_task_watch_profiles(
        &WatchDefaults::default(),
        &[spec("compile", "src/**/*.ts"), spec("styles", "src/**/*.scss")],
    )?;
    let filter = TriggerFilter::new(root, profiles, graph, Arc::new(RealFileSystem));

    let (tx, rx) = mpsc::channel(16);
    let handle = spawn_watcher(filter, DEBOUNCE, tx)?;
    Ok((handle, rx))
}

async fn next_event(rx: &mut mpsc::Receiver<RuntimeEvent>, within: Duration) -> Option<RuntimeEvent> {
    tokio::time::timeout(within, rx.recv()).await.ok().flatten()
}

#[tokio::test]
async fn burst_of_writes_becomes_one_trigger() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    std::fs::create_dir_all(root.join("src/app"))?;

    let (_handle, mut rx) = start(&root)?;

    std::fs::write(root.join("src/app/a.ts"), "export const a = 1;")?;
    std::fs::write(root.join("src/app/b.ts"), "export const b = 2;")?;

    match next_event(&mut rx, Duration::from_secs(5)).await {
        Some(RuntimeEvent::TaskTriggered { tasks, reason }) => {
            assert_eq!(tasks, vec!["compile".to_string()]);
            assert_eq!(reason, TriggerReason::FileWatch);
        }
        other => panic!("expected one file-watch trigger, got {other:?}"),
    }

    let extra = next_event(&mut rx, DEBOUNCE * 3).await;
    assert!(extra.is_none(), "unexpected second event: {extra:?}");
    Ok(())
}

#[tokio::test]
async fn reads_and_unmatched_paths_trigger_nothing() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    std::fs::create_dir_all(root.join("src/app"))?;
    std::fs::write(root.join("src/app/a.ts"), "export const a = 1;")?;

    let (_handle, mut rx) = start(&root)?;

    let _ = std::fs::read_to_string(root.join("src/app/a.ts"))?;
    std::fs::write(root.join("README.md"), "# notes")?;

    let event = next_event(&mut rx, DEBOUNCE * 4).await;
    assert!(event.is_none(), "unexpected event: {event:?}");

    std::fs::write(root.join("src/app/theme.scss"), ".a{}")?;
    match next_event(&mut rx, Duration::from_secs(5)).await {
        Some(RuntimeEvent::TaskTriggered { tasks, .. }) => {
            assert_eq!(tasks, vec!["styles".to_string()]);
        }
        other => panic!("expected a styles trigger, got {other:?}"),
    }
    Ok(())
}
