// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// In-memory filesystem holding a set of file paths.
///
/// Directories are implied by the files below them. Any path can be marked
/// as a symlink; its contents stay as listed.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<BTreeSet<PathBuf>>>,
    symlinks: Arc<Mutex<BTreeSet<PathBuf>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let fs = Self::new();
        for p in paths {
            fs.add_file(p);
        }
        fs
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        let mut files = self.files.lock().unwrap();
        files.insert(path.as_ref().to_path_buf());
    }

    pub fn mark_symlink(&self, path: impl AsRef<Path>) {
        let mut symlinks = self.symlinks.lock().unwrap();
        symlinks.insert(path.as_ref().to_path_buf());
    }
}

impl FileSystem for MockFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.iter().any(|f| f != path && f.starts_with(path))
    }

    fn is_symlink(&self, path: &Path) -> bool {
        self.symlinks.lock().unwrap().contains(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if !self.is_dir(path) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }

        let files = self.files.lock().unwrap();
        let children: BTreeSet<PathBuf> = files
            .iter()
            .filter_map(|f| f.strip_prefix(path).ok())
            .filter_map(|rest| rest.components().next())
            .map(|first| path.join(first))
            .collect();
        Ok(children.into_iter().collect())
    }
}
