// tests/graph.rs

mod common;
use crate::common::builders::group_graph;

use buildgraph::dag::{Task, TaskGraph};
use buildgraph::errors::BuildgraphError;

#[test]
fn cycle_is_rejected_at_build() {
    let result = TaskGraph::builder()
        .task(Task::new("a").after("c"))
        .task(Task::new("b").after("a"))
        .task(Task::new("c").after("b"))
        .build();

    match result {
        Err(BuildgraphError::Cycle(msg)) => assert!(msg.contains("cycle"), "{msg}"),
        other => panic!("expected Cycle, got {other:?}"),
    }
}

#[test]
fn self_dependency_is_a_cycle() {
    let result = TaskGraph::builder().task(Task::new("a").after("a")).build();
    assert!(matches!(result, Err(BuildgraphError::Cycle(_))));
}

#[test]
fn unknown_dependency_names_the_missing_task() {
    let result = TaskGraph::builder()
        .task(Task::new("build").after("compile"))
        .build();

    match result {
        Err(BuildgraphError::UnknownTask(msg)) => {
            assert!(msg.contains("compile"));
            assert!(msg.contains("build"));
        }
        other => panic!("expected UnknownTask, got {other:?}"),
    }
}

#[test]
fn duplicate_task_is_a_config_error() {
    let result = TaskGraph::builder()
        .task(Task::new("a"))
        .task(Task::new("a"))
        .build();
    assert!(matches!(result, Err(BuildgraphError::Config(_))));
}

#[test]
fn closure_and_dependents() {
    let graph = group_graph(&[
        ("clean", &[]),
        ("styles", &["clean"]),
        ("ngc", &["clean", "styles"]),
        ("test", &[]),
    ]);

    let closure: Vec<String> = graph.closure(&["ngc"]).unwrap().into_iter().collect();
    assert_eq!(closure, vec!["clean", "ngc", "styles"]);

    let mut dependents = graph.dependents_of("clean").to_vec();
    dependents.sort();
    assert_eq!(dependents, vec!["ngc", "styles"]);

    assert!(matches!(
        graph.closure(&["missing"]),
        Err(BuildgraphError::UnknownTask(_))
    ));
}

#[test]
fn execution_order_is_deterministic() {
    let graph = group_graph(&[
        ("d", &["b", "c"]),
        ("c", &["a"]),
        ("b", &["a"]),
        ("a", &[]),
        ("unrelated", &[]),
    ]);
    assert_eq!(graph.execution_order(&["d"]).unwrap(), vec!["a", "b", "c", "d"]);
}

#[test]
fn duplicate_dependency_entries_are_collapsed() {
    let graph = TaskGraph::builder()
        .task(Task::new("a"))
        .task(Task::new("b").after("a").after("a"))
        .build()
        .unwrap();
    assert_eq!(graph.dependencies_of("b"), ["a".to_string()]);
    assert_eq!(graph.execution_order(&["b"]).unwrap(), vec!["a", "b"]);
}
