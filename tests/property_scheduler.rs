// tests/property_scheduler.rs

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use proptest::prelude::*;

use buildgraph::dag::{Scheduler, Task, TaskGraph, TaskRunState};
use buildgraph::engine::TaskOutcome;

// Acyclic by construction: task N may only depend on tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, deps)| {
                    let unique: BTreeSet<usize> =
                        deps.into_iter().filter(|_| i > 0).map(|d| d % i.max(1)).collect();
                    unique.into_iter().collect()
                })
                .collect()
        })
    })
}

fn task_name(i: usize) -> String {
    format!("task_{i}")
}

fn build_graph(deps: &[Vec<usize>]) -> TaskGraph {
    let mut builder = TaskGraph::builder();
    for (i, task_deps) in deps.iter().enumerate() {
        builder = builder.task(Task::new(task_name(i)).after_all(task_deps.iter().map(|d| task_name(*d))));
    }
    builder.build().expect("generated graph is acyclic")
}

proptest! {
    #[test]
    fn execution_order_respects_dependencies(deps in dag_strategy(12), target in 0..12usize) {
        let graph = build_graph(&deps);
        let target = task_name(target % deps.len());
        let order = graph.execution_order(&[target.as_str()]).expect("known target");

        let closure = graph.closure(&[target.as_str()]).expect("known target");
        prop_assert_eq!(order.iter().cloned().collect::<BTreeSet<_>>(), closure);
        prop_assert_eq!(order.last(), Some(&target));

        for (pos, task) in order.iter().enumerate() {
            for dep in graph.dependencies_of(task) {
                let dep_pos = order.iter().position(|t| t == dep);
                prop_assert!(dep_pos.is_some_and(|p| p < pos), "{} must run before {}", dep, task);
            }
        }
    }

    #[test]
    fn simulated_run_executes_each_task_once(
        deps in dag_strategy(10),
        targets in proptest::collection::vec(0..10usize, 1..4),
        failing in proptest::collection::vec(0..10usize, 0..3),
        picks in proptest::collection::vec(any::<usize>(), 64),
        fail_fast in any::<bool>(),
    ) {
        let graph = Arc::new(build_graph(&deps));
        let n = deps.len();
        let targets: Vec<String> = targets.iter().map(|i| task_name(i % n)).collect();
        let failing: HashSet<String> = failing.iter().map(|i| task_name(i % n)).collect();
        let closure = graph.closure(&targets).expect("known targets");

        let mut scheduler = Scheduler::new(graph.clone()).with_fail_fast(fail_fast);
        let first = scheduler.start_run(&targets).expect("idle scheduler");
        let run_id = scheduler.current_run_id().expect("run started");

        let mut executing: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut succeeded: HashSet<String> = HashSet::new();
        let mut finished = first.finished;

        let mut dispatch = |scheduled: Vec<String>, executing: &mut Vec<String>, succeeded: &HashSet<String>|
            -> Result<(), TestCaseError>
        {
            for name in scheduled {
                prop_assert!(seen.insert(name.clone()), "{} scheduled twice", name);
                prop_assert!(closure.contains(&name), "{} is outside the closure", name);
                for dep in graph.dependencies_of(&name) {
                    prop_assert!(succeeded.contains(dep), "{} scheduled before {} succeeded", name, dep);
                }
                executing.push(name);
            }
            Ok(())
        };
        dispatch(
            first.newly_scheduled.into_iter().map(|t| t.name).collect(),
            &mut executing,
            &succeeded,
        )?;

        let mut step_count = 0;
        while finished.is_none() {
            prop_assert!(!executing.is_empty(), "run stalled with nothing running");
            for name in scheduler.tasks_in_current_run() {
                if scheduler.run_state_of(&name) == Some(TaskRunState::Pending) {
                    prop_assert_eq!(
                        scheduler.deps_satisfied(&name),
                        Some(false),
                        "{} is ready but was not dispatched",
                        name
                    );
                }
            }
            let idx = picks[step_count % picks.len()] % executing.len();
            step_count += 1;
            let task = executing.remove(idx);

            let outcome = if failing.contains(&task) {
                TaskOutcome::Failed("boom".to_string())
            } else {
                succeeded.insert(task.clone());
                TaskOutcome::Success
            };
            let step = scheduler.handle_completion(&task, run_id, outcome);
            if fail_fast && failing.contains(&task) {
                prop_assert!(step.cancel_running);
                prop_assert!(step.finished.is_some(), "fail-fast closes the run");
            }
            dispatch(
                step.newly_scheduled.into_iter().map(|t| t.name).collect(),
                &mut executing,
                &succeeded,
            )?;
            finished = step.finished;
        }

        let report = finished.expect("loop exits on a finished run");
        prop_assert!(scheduler.is_idle());

        let mut accounted: BTreeSet<String> = BTreeSet::new();
        for name in report
            .succeeded
            .iter()
            .chain(report.failed.iter().map(|(n, _)| n))
            .chain(report.skipped.iter())
        {
            prop_assert!(accounted.insert(name.clone()), "{} reported twice", name);
        }
        prop_assert_eq!(&accounted, &closure);

        if closure.iter().all(|t| !failing.contains(t)) {
            prop_assert!(report.is_success());
            prop_assert_eq!(report.succeeded.len(), closure.len());
        }
    }
}
