// tests/scheduler.rs

mod common;
use crate::common::builders::group_graph;
use crate::common::{fail, init_tracing, scheduled_names, succeed};

use std::sync::Arc;

use buildgraph::dag::{Scheduler, TaskRunState};
use buildgraph::engine::TaskOutcome;
use buildgraph::errors::BuildgraphError;

/// A <- B, A <- C, B <- D, C <- D
fn diamond() -> Scheduler {
    Scheduler::new(Arc::new(group_graph(&[
        ("A", &[]),
        ("B", &["A"]),
        ("C", &["A"]),
        ("D", &["B", "C"]),
    ])))
}

#[test]
fn diamond_runs_shared_dependency_once_and_join_last() {
    init_tracing();
    let mut s = diamond();

    let step = s.start_run(&["D"]).unwrap();
    assert_eq!(scheduled_names(&step), vec!["A"]);

    let step = succeed(&mut s, "A");
    assert_eq!(scheduled_names(&step), vec!["B", "C"]);

    let step = succeed(&mut s, "B");
    assert!(step.newly_scheduled.is_empty(), "D must wait for C");

    let step = succeed(&mut s, "C");
    assert_eq!(scheduled_names(&step), vec!["D"]);

    let step = succeed(&mut s, "D");
    let report = step.finished.expect("run finished");
    assert!(report.is_success());
    assert_eq!(report.succeeded, vec!["A", "B", "C", "D"]);
    assert!(s.is_idle());
}

#[test]
fn run_only_includes_target_closure() {
    let mut s = diamond();

    let step = s.start_run(&["B"]).unwrap();
    assert_eq!(scheduled_names(&step), vec!["A"]);
    assert_eq!(s.run_state_of("C"), Some(TaskRunState::NotInRun));
    assert_eq!(s.run_state_of("D"), Some(TaskRunState::NotInRun));

    succeed(&mut s, "A");
    let step = succeed(&mut s, "B");
    let report = step.finished.expect("run finished");
    assert_eq!(report.succeeded, vec!["A", "B"]);
}

#[test]
fn failure_skips_dependents_but_independent_branch_continues() {
    let mut s = Scheduler::new(Arc::new(group_graph(&[
        ("lint", &[]),
        ("compile", &[]),
        ("bundle", &["compile"]),
        ("build", &["lint", "bundle"]),
    ])));

    let step = s.start_run(&["build"]).unwrap();
    assert_eq!(scheduled_names(&step), vec!["compile", "lint"]);

    let step = fail(&mut s, "lint");
    assert_eq!(step.newly_skipped, vec!["build"]);
    assert!(!step.cancel_running);
    assert_eq!(s.run_state_of("compile"), Some(TaskRunState::Running));

    let step = succeed(&mut s, "compile");
    assert_eq!(scheduled_names(&step), vec!["bundle"]);

    let step = succeed(&mut s, "bundle");
    let report = step.finished.expect("run finished");
    assert_eq!(report.succeeded, vec!["compile", "bundle"]);
    assert_eq!(report.failed, vec![("lint".to_string(), "lint broke".to_string())]);
    assert_eq!(report.skipped, vec!["build"]);
    assert_eq!(s.run_state_of("build"), Some(TaskRunState::Skipped));

    match report.into_result() {
        Err(BuildgraphError::ActionFailure { task, .. }) => assert_eq!(task, "lint"),
        other => panic!("expected ActionFailure, got {other:?}"),
    }
}

#[test]
fn fail_fast_skips_everything_and_cancels_running() {
    let mut s = Scheduler::new(Arc::new(group_graph(&[
        ("a", &[]),
        ("b", &[]),
        ("c", &["b"]),
        ("all", &["a", "c"]),
    ])))
    .with_fail_fast(true);

    s.start_run(&["all"]).unwrap();
    let step = fail(&mut s, "a");

    assert!(step.cancel_running);
    let mut skipped = step.newly_skipped.clone();
    skipped.sort();
    assert_eq!(skipped, vec!["all", "b", "c"]);

    let report = step.finished.expect("fail-fast closes the run");
    assert_eq!(report.failed.len(), 1);
    assert!(s.is_idle());

    // Late completion of the abandoned task is ignored.
    let late = s.handle_completion("b", report.run_id, TaskOutcome::Success);
    assert!(late.newly_scheduled.is_empty());
    assert!(late.finished.is_none());
}

#[test]
fn unknown_target_is_rejected_before_anything_runs() {
    let mut s = diamond();
    match s.start_run(&["nope"]) {
        Err(BuildgraphError::UnknownTask(name)) => assert_eq!(name, "nope"),
        other => panic!("expected UnknownTask, got {other:?}"),
    }
    assert!(s.is_idle());
}

#[test]
fn start_run_while_active_is_an_error() {
    let mut s = diamond();
    s.start_run(&["A"]).unwrap();
    assert!(s.start_run(&["B"]).is_err());
}

#[test]
fn stale_completion_from_previous_run_is_ignored() {
    let mut s = diamond();
    s.start_run(&["A"]).unwrap();
    let first = succeed(&mut s, "A").finished.expect("finished");

    s.start_run(&["A"]).unwrap();
    let stale = s.handle_completion("A", first.run_id, TaskOutcome::Success);
    assert!(stale.finished.is_none());
    assert_eq!(s.run_state_of("A"), Some(TaskRunState::Running));
}

#[test]
fn multiple_targets_share_one_run() {
    let mut s = diamond();
    let step = s.start_run(&["B", "C"]).unwrap();
    assert_eq!(scheduled_names(&step), vec!["A"]);

    let step = succeed(&mut s, "A");
    assert_eq!(scheduled_names(&step), vec!["B", "C"]);
    succeed(&mut s, "B");
    let report = succeed(&mut s, "C").finished.expect("finished");
    assert_eq!(report.succeeded.len(), 3);
    assert_eq!(s.run_state_of("D"), Some(TaskRunState::NotInRun));
}
