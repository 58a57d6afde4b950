//! Working directory file system operations

use crate::artifacts::index::index_entry::EntryMetadata;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IGNORED_PATHS: [&str; 3] = [".git", ".", ".."];

#[derive(Debug)]
pub struct Workspace {
    path: Box<Path>,
}

impl Workspace {
    pub fn new(path: Box<Path>) -> Self {
        Workspace { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a pathspec names an existing file or directory
    pub fn contains(&self, pathspec: &str) -> bool {
        self.path.join(pathspec).exists()
    }

    /// List workspace files under a path, relative to the workspace root
    ///
    /// A file path yields just that file; a directory is walked recursively
    /// with `.git` excluded. Results come back sorted for determinism.
    pub fn list_files(&self, root_file_path: Option<PathBuf>) -> anyhow::Result<Vec<PathBuf>> {
        let root_file_path = match root_file_path {
            Some(p) => std::fs::canonicalize(p)?,
            None => self.path.clone().into(),
        };

        if !root_file_path.exists() {
            anyhow::bail!("The specified path does not exist: {:?}", root_file_path);
        }

        if root_file_path.is_dir() {
            let mut files = WalkDir::new(&root_file_path)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| self.check_if_not_ignored_file_path(entry.path()))
                .collect::<Vec<_>>();
            files.sort();

            Ok(files)
        } else {
            Ok(vec![
                root_file_path
                    .strip_prefix(self.path.as_ref())
                    .map(PathBuf::from)
                    .unwrap_or_default(),
            ])
        }
    }

    fn is_ignored(path: &Path) -> bool {
        path.components().any(|component| {
            if let std::path::Component::Normal(name) = component {
                let name_str = name.to_string_lossy();
                IGNORED_PATHS.contains(&name_str.as_ref())
            } else {
                false
            }
        })
    }

    fn check_if_not_ignored_file_path(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() && !Self::is_ignored(path) {
            Some(path.strip_prefix(self.path.as_ref()).ok()?.to_path_buf())
        } else {
            None
        }
    }

    /// Read a workspace file's raw bytes
    pub fn read_file(&self, file_path: &Path) -> anyhow::Result<Bytes> {
        let file_path = self.path.join(file_path);
        let content = std::fs::read(file_path)?;

        Ok(content.into())
    }

    /// Stat a workspace file into index entry metadata
    pub fn stat_file(&self, file_path: &Path) -> anyhow::Result<EntryMetadata> {
        let absolute = self.path.join(file_path);
        let metadata = std::fs::metadata(&absolute)?;

        (absolute.as_path(), metadata).try_into()
    }
}
