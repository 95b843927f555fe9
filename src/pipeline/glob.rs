// src/pipeline/glob.rs

//! Filesystem glob resolver.
//!
//! Patterns use `globset` syntax against `/`-separated paths relative to a
//! base directory. `*` does not cross directory boundaries; `**` does.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use anyhow::Result;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::errors::BuildgraphError;
use crate::fs::FileSystem;

/// Build a `GlobSet` from string patterns.
pub fn build_globset(patterns: &[String]) -> crate::errors::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .map_err(|e| BuildgraphError::Config(format!("invalid glob pattern '{pat}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| BuildgraphError::Config(format!("cannot compile glob patterns: {e}")))
}

/// Leading path components of a pattern that contain no glob syntax.
///
/// `src/app/**/*.ts` -> `src/app`; `*.md` -> `` (the base itself);
/// `README.md` -> `README.md`.
pub fn literal_prefix(pattern: &str) -> PathBuf {
    const META: [char; 4] = ['*', '?', '[', '{'];
    if !pattern.contains(META) {
        return PathBuf::from(pattern);
    }

    let mut prefix = PathBuf::new();
    let parts: Vec<&str> = pattern.split('/').collect();
    for (i, part) in parts.iter().enumerate() {
        let is_last = i + 1 == parts.len();
        if is_last || part.contains(META) {
            break;
        }
        prefix.push(part);
    }
    prefix
}

/// Include/exclude pattern pair, compiled once and resolved lazily.
#[derive(Clone)]
pub struct GlobResolver {
    patterns: Vec<String>,
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl fmt::Debug for GlobResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobResolver")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl GlobResolver {
    pub fn new(include: &[String], exclude: &[String]) -> crate::errors::Result<Self> {
        let exclude = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude)?)
        };
        Ok(Self {
            patterns: include.to_vec(),
            include: build_globset(include)?,
            exclude,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether a base-relative, `/`-separated path is selected.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        match &self.exclude {
            Some(exclude) => !exclude.is_match(rel_path),
            None => true,
        }
    }

    /// All files under `base` selected by the patterns, sorted.
    ///
    /// Walking starts at each pattern's literal prefix instead of `base`
    /// itself, so `src/**/*.ts` never descends into `node_modules`.
    pub fn resolve(&self, fs: &dyn FileSystem, base: &Path) -> Result<Vec<PathBuf>> {
        let starts: BTreeSet<PathBuf> = self
            .patterns
            .iter()
            .map(|p| base.join(literal_prefix(p)))
            .collect();

        let mut files = BTreeSet::new();
        for start in starts {
            self.walk(fs, base, &start, &mut files)?;
        }
        Ok(files.into_iter().collect())
    }

    fn walk(
        &self,
        fs: &dyn FileSystem,
        base: &Path,
        start: &Path,
        files: &mut BTreeSet<PathBuf>,
    ) -> Result<()> {
        if fs.is_file(start) {
            self.consider(base, start, files);
            return Ok(());
        }
        if !fs.is_dir(start) {
            return Ok(());
        }

        let mut stack = vec![start.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                if fs.is_dir(&path) {
                    stack.push(path);
                } else if fs.is_file(&path) {
                    self.consider(base, &path, files);
                }
            }
        }
        Ok(())
    }

    fn consider(&self, base: &Path, path: &Path, files: &mut BTreeSet<PathBuf>) {
        if let Some(rel) = relative_slash_path(base, path) {
            if self.matches(&rel) {
                files.insert(path.to_path_buf());
            }
        }
    }
}

/// `path` relative to `base` with forward slashes, or `None` if it is not
/// under `base`.
pub fn relative_slash_path(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}
