// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem for tests. Use absolute paths (e.g. `/project/src/a.ts`).
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        files.insert(PathBuf::from("/"), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.lock();
        files.insert(path.clone(), MockEntry::File(content.into()));

        if let Some(parent) = path.parent() {
            Self::ensure_dir_entry(&mut files, parent);
            Self::link_child(&mut files, parent, &path);
        }
    }

    /// Snapshot of all file paths currently stored, sorted.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        let files = self.lock();
        let mut paths: Vec<PathBuf> = files
            .iter()
            .filter(|(_, e)| matches!(e, MockEntry::File(_)))
            .map(|(p, _)| p.clone())
            .collect();
        paths.sort();
        paths
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        // A poisoned mock only happens after a panicking test thread.
        match self.files.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if files.contains_key(path) {
            return;
        }
        files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
        if let Some(parent) = path.parent() {
            Self::ensure_dir_entry(files, parent);
            Self::link_child(files, parent, path);
        }
    }

    fn link_child(files: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
        if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
            if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
                if !children.iter().any(|c| c == name) {
                    children.push(name.to_string());
                }
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let files = self.lock();
        match files.get(path) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.lock();
        match files.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let mut files = self.lock();
        files.retain(|p, _| !p.starts_with(path));
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            let name = name.to_string_lossy();
            if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
                children.retain(|c| c.as_str() != name.as_ref());
            }
        }
        Ok(())
    }
}
