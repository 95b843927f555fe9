// src/watch/filter.rs

//! From changed paths to tasks worth re-running.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::dag::TaskGraph;
use crate::engine::TaskName;
use crate::fs::FileSystem;
use crate::pipeline::glob::relative_slash_path;
use crate::watch::hash::{compute_hash_for_paths, MemoryHashStore};
use crate::watch::patterns::TaskWatchProfile;

/// Stateful filter applied to every debounced batch of changed paths.
///
/// 1. Tasks whose profile matches at least one path are collected.
/// 2. `use_hash` tasks whose aggregate content hash is unchanged drop out.
/// 3. A task already in the dependency closure of another surviving task
///    drops out; running the other task re-runs it anyway.
#[derive(Debug)]
pub struct TriggerFilter {
    root: PathBuf,
    profiles: Vec<TaskWatchProfile>,
    graph: Arc<TaskGraph>,
    fs: Arc<dyn FileSystem>,
    hashes: MemoryHashStore,
}

impl TriggerFilter {
    pub fn new(
        root: impl Into<PathBuf>,
        profiles: Vec<TaskWatchProfile>,
        graph: Arc<TaskGraph>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            root: root.into(),
            profiles,
            graph,
            fs,
            hashes: MemoryHashStore::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn profiles(&self) -> &[TaskWatchProfile] {
        &self.profiles
    }

    /// Record the current hash of every `use_hash` task, so the first change
    /// is compared against the state at startup.
    pub fn prime_hashes(&mut self) {
        for idx in 0..self.profiles.len() {
            if self.profiles[idx].use_hash() {
                let name = self.profiles[idx].name().to_string();
                if let Some(hash) = self.current_hash(idx) {
                    self.hashes.update(&name, hash);
                }
            }
        }
    }

    /// Tasks to trigger for a batch of absolute changed paths, sorted.
    pub fn tasks_for_paths(&mut self, paths: &[PathBuf]) -> Vec<TaskName> {
        let rel_paths: Vec<String> = paths
            .iter()
            .filter_map(|p| {
                let rel = relative_slash_path(&self.root, p);
                if rel.is_none() {
                    warn!(path = %p.display(), root = %self.root.display(), "changed path outside project root");
                }
                rel
            })
            .collect();

        let mut matched = BTreeSet::new();
        for idx in 0..self.profiles.len() {
            let profile = &self.profiles[idx];
            let Some(path) = rel_paths.iter().find(|p| profile.matches(p)) else {
                continue;
            };
            let name = profile.name().to_string();
            debug!(task = %name, path = %path, "watch match");

            if profile.use_hash() {
                let Some(hash) = self.current_hash(idx) else {
                    continue;
                };
                if !self.hashes.update(&name, hash) {
                    debug!(task = %name, "content unchanged; not triggering");
                    continue;
                }
            }
            matched.insert(name);
        }

        self.drop_covered(matched)
    }

    /// Remove tasks that are dependencies (transitively) of another task in
    /// the set.
    pub fn drop_covered(&self, matched: BTreeSet<TaskName>) -> Vec<TaskName> {
        let mut covered = BTreeSet::new();
        for task in &matched {
            let Ok(closure) = self.graph.closure(&[task.as_str()]) else {
                continue;
            };
            for dep in closure {
                if dep != *task && matched.contains(&dep) {
                    covered.insert(dep);
                }
            }
        }

        matched
            .into_iter()
            .filter(|task| {
                let keep = !covered.contains(task);
                if !keep {
                    debug!(task = %task, "covered by a dependent trigger");
                }
                keep
            })
            .collect()
    }

    fn current_hash(&self, idx: usize) -> Option<String> {
        let profile = &self.profiles[idx];
        let files = profile
            .resolver()
            .resolve(self.fs.as_ref(), &self.root)
            .and_then(|files| compute_hash_for_paths(self.fs.as_ref(), files));
        match files {
            Ok(hash) => Some(hash),
            Err(err) => {
                warn!(task = %profile.name(), error = %format!("{err:#}"), "hashing watched files failed");
                None
            }
        }
    }
}
