// src/fs/mock.rs

//! In-memory [`FileSystem`] for recipe trees in tests.
//!
//! Only files are stored. A directory exists when some file lives below it,
//! and `.` always exists. `read_dir` lists children in sorted order.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};

use super::FileSystem;

#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<BTreeMap<PathBuf, String>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a file. Clones share storage, so files added after a
    /// clone was handed to a collaborator are visible to it.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.store()
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    /// All stored file paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.store().keys().cloned().collect()
    }

    fn store(&self) -> MutexGuard<'_, BTreeMap<PathBuf, String>> {
        self.files.lock().unwrap()
    }
}

fn is_cwd(path: &Path) -> bool {
    path.as_os_str().is_empty() || path == Path::new(".")
}

/// Part of `file` below `dir`, if any.
fn below<'a>(file: &'a Path, dir: &Path) -> Option<&'a Path> {
    let rest = if is_cwd(dir) {
        if file.is_absolute() {
            return None;
        }
        file.strip_prefix(".").unwrap_or(file)
    } else {
        file.strip_prefix(dir).ok()?
    };
    (!rest.as_os_str().is_empty()).then_some(rest)
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        if let Some(content) = self.store().get(path) {
            return Ok(content.clone());
        }
        if self.is_dir(path) {
            Err(anyhow!("is a directory: {:?}", path))
        } else {
            Err(anyhow!("no such file: {:?}", path))
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.store().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        is_cwd(path) || self.store().keys().any(|f| below(f, path).is_some())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.store();
        let mut children = BTreeSet::new();
        for file in files.keys() {
            if let Some(Component::Normal(first)) =
                below(file, path).and_then(|rest| rest.components().next())
            {
                children.insert(path.join(first));
            }
        }

        if children.is_empty() && !is_cwd(path) {
            return Err(anyhow!("not a directory: {:?}", path));
        }
        Ok(children.into_iter().collect())
    }
}
