// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::engine::TaskName;
use crate::errors::{BuildgraphError, Result};
use crate::exec::Action;

/// A task definition handed to [`TaskGraphBuilder`].
#[derive(Clone)]
pub struct Task {
    name: TaskName,
    deps: Vec<TaskName>,
    action: Option<Arc<dyn Action>>,
}

impl Task {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            deps: Vec::new(),
            action: None,
        }
    }

    /// Add a dependency; this task runs after it.
    pub fn after(mut self, dep: impl Into<TaskName>) -> Self {
        self.deps.push(dep.into());
        self
    }

    pub fn after_all<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.deps.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn action(mut self, action: Arc<dyn Action>) -> Self {
        self.action = Some(action);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("action", &self.action.as_ref().map(|a| a.describe()))
            .finish()
    }
}

/// Internal node structure: stores immediate deps, dependents and the action.
#[derive(Clone)]
struct DagNode {
    /// Direct dependencies: tasks that must succeed before this one can run.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskName>,
    action: Option<Arc<dyn Action>>,
}

/// Explicit graph construction. Validation happens once, in [`build`].
///
/// [`build`]: TaskGraphBuilder::build
#[derive(Debug, Default)]
pub struct TaskGraphBuilder {
    tasks: Vec<Task>,
}

impl TaskGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn add(&mut self, task: Task) -> &mut Self {
        self.tasks.push(task);
        self
    }

    /// Validate and freeze the graph.
    ///
    /// Fails on duplicate task names, dependencies on unregistered tasks,
    /// self-dependencies and cycles.
    pub fn build(self) -> Result<TaskGraph> {
        let mut nodes: BTreeMap<TaskName, DagNode> = BTreeMap::new();

        for task in self.tasks {
            if nodes.contains_key(&task.name) {
                return Err(BuildgraphError::Config(format!(
                    "task '{}' is registered twice",
                    task.name
                )));
            }
            let mut deps: Vec<TaskName> = Vec::with_capacity(task.deps.len());
            for dep in task.deps {
                if !deps.contains(&dep) {
                    deps.push(dep);
                }
            }
            nodes.insert(
                task.name,
                DagNode {
                    deps,
                    dependents: Vec::new(),
                    action: task.action,
                },
            );
        }

        for (name, node) in nodes.iter() {
            for dep in node.deps.iter() {
                if dep == name {
                    return Err(BuildgraphError::Cycle(format!(
                        "task '{}' depends on itself",
                        name
                    )));
                }
                if !nodes.contains_key(dep) {
                    return Err(BuildgraphError::UnknownTask(format!(
                        "'{}' (dependency of '{}')",
                        dep, name
                    )));
                }
            }
        }

        ensure_acyclic(&nodes)?;

        // Populate dependents based on deps.
        let edges: Vec<(TaskName, TaskName)> = nodes
            .iter()
            .flat_map(|(name, node)| node.deps.iter().map(move |d| (d.clone(), name.clone())))
            .collect();
        for (dep, dependent) in edges {
            if let Some(dep_node) = nodes.get_mut(&dep) {
                if !dep_node.dependents.contains(&dependent) {
                    dep_node.dependents.push(dependent);
                }
            }
        }

        Ok(TaskGraph { nodes })
    }
}

fn ensure_acyclic(nodes: &BTreeMap<TaskName, DagNode>) -> Result<()> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in nodes.keys() {
        graph.add_node(name.as_str());
    }
    for (name, node) in nodes.iter() {
        for dep in node.deps.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(BuildgraphError::Cycle(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}

/// Immutable, validated task graph keyed by task name.
#[derive(Clone)]
pub struct TaskGraph {
    nodes: BTreeMap<TaskName, DagNode>,
}

impl fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, node) in self.nodes.iter() {
            map.entry(name, &node.deps);
        }
        map.finish()
    }
}

impl TaskGraph {
    pub fn builder() -> TaskGraphBuilder {
        TaskGraphBuilder::new()
    }

    /// All task names, sorted.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    pub fn action_of(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.nodes.get(name).and_then(|n| n.action.clone())
    }

    /// The targets plus everything they transitively depend on.
    pub fn closure<S: AsRef<str>>(&self, targets: &[S]) -> Result<BTreeSet<TaskName>> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<TaskName> = Vec::new();

        for target in targets {
            let target = target.as_ref();
            if !self.contains(target) {
                return Err(BuildgraphError::UnknownTask(target.to_string()));
            }
            stack.push(target.to_string());
        }

        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            stack.extend(self.dependencies_of(&name).iter().cloned());
        }

        Ok(seen)
    }

    /// A deterministic sequential execution order for the targets' closure:
    /// every task appears after all of its dependencies, ties broken by name.
    pub fn execution_order<S: AsRef<str>>(&self, targets: &[S]) -> Result<Vec<TaskName>> {
        let closure = self.closure(targets)?;

        let mut remaining: BTreeMap<&str, usize> = closure
            .iter()
            .map(|name| (name.as_str(), self.dependencies_of(name).len()))
            .collect();
        let mut ready: BTreeSet<&str> = remaining
            .iter()
            .filter(|(_, deps)| **deps == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut order = Vec::with_capacity(closure.len());

        while let Some(name) = ready.pop_first() {
            remaining.remove(name);
            order.push(name.to_string());
            for dependent in self.dependents_of(name) {
                if let Some(count) = remaining.get_mut(dependent.as_str()) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent.as_str());
                    }
                }
            }
        }

        Ok(order)
    }
}
