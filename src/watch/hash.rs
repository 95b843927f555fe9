// src/watch/hash.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::engine::TaskName;
use crate::fs::FileSystem;

/// Deterministic aggregate hash over the contents of the given files.
///
/// Paths are sorted first, and each file's path is mixed in with its
/// content, so renames change the hash too. Paths that are not files are
/// skipped.
pub fn compute_hash_for_paths<I, P>(fs: &dyn FileSystem, paths: I) -> Result<String>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut hasher = Hasher::new();

    let mut sorted: Vec<PathBuf> = paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
    sorted.sort();

    for path in sorted {
        if !fs.is_file(&path) {
            continue;
        }
        let bytes = fs
            .read(&path)
            .with_context(|| format!("reading {} for hashing", path.display()))?;
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        hasher.update(&bytes);
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!(hash = %hash, "computed aggregate hash");
    Ok(hash)
}

/// Last seen aggregate hash per task. Lives for the watch session only.
#[derive(Debug, Clone, Default)]
pub struct MemoryHashStore {
    hashes: HashMap<TaskName, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, task: &str) -> Option<&str> {
        self.hashes.get(task).map(String::as_str)
    }

    /// Store `hash` for `task`; returns whether it differs from the
    /// previous value (a first value counts as a change).
    pub fn update(&mut self, task: &str, hash: String) -> bool {
        match self.hashes.get(task) {
            Some(old) if *old == hash => false,
            _ => {
                self.hashes.insert(task.to_string(), hash);
                true
            }
        }
    }
}
