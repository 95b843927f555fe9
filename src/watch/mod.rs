// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling `watch` / `exclude` glob patterns per task.
//! - Turning a debounced batch of changed paths into the minimal set of
//!   tasks to re-run ([`TriggerFilter`]).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//!
//! It knows the task graph only to drop redundant triggers; ordering and
//! execution stay with the engine.

pub mod filter;
pub mod hash;
pub mod patterns;
pub mod watcher;

pub use filter::TriggerFilter;
pub use hash::{compute_hash_for_paths, MemoryHashStore};
pub use patterns::{build_task_watch_profiles, TaskPatternSpec, TaskWatchProfile, WatchDefaults};
pub use watcher::{spawn_watcher, WatcherHandle};
