//! Repository abstraction and coordination
//!
//! This module provides the main `Repository` type that coordinates all
//! repository operations. It acts as a facade over the lower-level
//! components (database, index, workspace, refs) and is the explicit context
//! threaded through every command; no global state exists.

use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::refs::Refs;
use crate::areas::workspace::Workspace;
use crate::artifacts::errors::GfgError;
use crate::artifacts::identity::{DefaultIdentity, IdentityProvider};
use std::cell::{RefCell, RefMut};
use std::path::{Path, PathBuf};

/// Git directory name
const GIT_DIR: &str = ".git";

/// Object database directory name
const DATABASE_DIR: &str = "objects";

/// Index file name
const INDEX_FILE: &str = "index";

/// Git repository
///
/// Coordinates all repository operations and provides access to the
/// database, index, workspace, and refs subsystems.
pub struct Repository {
    /// Repository root path (the worktree)
    path: Box<Path>,
    /// Output writer (stdout in production, a buffer in tests)
    writer: RefCell<Box<dyn std::io::Write>>,
    /// Index (staging area)
    index: RefCell<Index>,
    /// Object database
    database: Database,
    /// Working directory
    workspace: Workspace,
    /// Reference manager
    refs: Refs,
    /// Author identity provider
    identity: Box<dyn IdentityProvider>,
}

impl Repository {
    /// Open (or prepare to initialise) a repository rooted exactly at `path`
    pub fn new(path: PathBuf, writer: Box<dyn std::io::Write>) -> anyhow::Result<Self> {
        if !path.exists() {
            std::fs::create_dir_all(&path)?;
        }
        let path = path.canonicalize()?;

        let git_dir = path.join(GIT_DIR);
        let index = Index::new(git_dir.join(INDEX_FILE).into_boxed_path());
        let database = Database::new(git_dir.join(DATABASE_DIR).into_boxed_path());
        let workspace = Workspace::new(path.clone().into_boxed_path());
        let refs = Refs::new(git_dir.clone().into_boxed_path());
        let identity = Box::new(DefaultIdentity::new(git_dir.into_boxed_path()));

        Ok(Repository {
            path: path.into_boxed_path(),
            writer: RefCell::new(writer),
            index: RefCell::new(index),
            database,
            workspace,
            refs,
            identity,
        })
    }

    /// Locate the repository containing `start` by walking upward
    ///
    /// Fails with `NotARepository` when no ancestor holds a `.git`
    /// directory.
    pub fn discover(start: PathBuf, writer: Box<dyn std::io::Write>) -> anyhow::Result<Self> {
        let start = start
            .canonicalize()
            .map_err(|_| GfgError::NotARepository)?;

        let mut dir: &Path = &start;
        loop {
            if dir.join(GIT_DIR).is_dir() {
                return Self::new(dir.to_path_buf(), writer);
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => return Err(GfgError::NotARepository.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git_dir(&self) -> PathBuf {
        self.path.join(GIT_DIR)
    }

    pub fn writer(&self) -> RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    pub fn index(&self) -> RefMut<'_, Index> {
        self.index.borrow_mut()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    /// Resolve the author identity for new commits
    pub fn identity(&self) -> anyhow::Result<(String, String)> {
        self.identity.identity()
    }
}
