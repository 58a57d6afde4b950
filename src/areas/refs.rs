//! Git references (HEAD and ref files)
//!
//! References are human-readable names pointing to commits, stored as text
//! files containing either a 40-character SHA-1 followed by a newline
//! (direct reference) or `ref: <path>` (symbolic reference). HEAD normally
//! points at `refs/heads/master`; the symbolic indirection is followed one
//! level when reading and writing.

use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use derive_new::new;
use file_guard::Lock;
use std::io::Write;
use std::ops::DerefMut;
use std::path::{Path, PathBuf};

/// Regex pattern for parsing symbolic references
const SYMREF_REGEX: &str = r"^ref: (.+)$";

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

/// Git references manager
#[derive(Debug, new)]
pub struct Refs {
    /// Path to the git directory (typically `.git`)
    path: Box<Path>,
}

/// Internal representation of a reference value
#[derive(Debug, Clone)]
enum SymRefOrOid {
    /// Symbolic reference pointing to another ref
    SymRef(String),
    /// Direct object ID
    Oid(ObjectId),
}

impl SymRefOrOid {
    fn read_from(path: &Path) -> anyhow::Result<Option<SymRefOrOid>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        let symref_match = regex::Regex::new(SYMREF_REGEX)?.captures(content);
        match symref_match {
            Some(symref_match) => Ok(Some(SymRefOrOid::SymRef(symref_match[1].to_string()))),
            None => Ok(Some(SymRefOrOid::Oid(ObjectId::try_parse(
                content.to_string(),
            )?))),
        }
    }
}

impl Refs {
    /// Read the commit HEAD points at, following the symbolic ref one level
    ///
    /// Returns None when the branch has no commits yet (the ref file does
    /// not exist).
    pub fn read_head(&self) -> anyhow::Result<Option<ObjectId>> {
        match SymRefOrOid::read_from(&self.head_path())? {
            None => Ok(None),
            Some(SymRefOrOid::Oid(oid)) => Ok(Some(oid)), // detached HEAD
            Some(SymRefOrOid::SymRef(target)) => {
                match SymRefOrOid::read_from(&self.path.join(target))? {
                    Some(SymRefOrOid::Oid(oid)) => Ok(Some(oid)),
                    _ => Ok(None),
                }
            }
        }
    }

    /// Advance HEAD to a new commit
    ///
    /// Writes the SHA (with trailing newline) into the file HEAD points at,
    /// creating parent directories as needed; a detached HEAD is updated in
    /// place.
    pub fn update_head(&self, oid: &ObjectId) -> anyhow::Result<()> {
        let target = match SymRefOrOid::read_from(&self.head_path())? {
            Some(SymRefOrOid::SymRef(target)) => self.path.join(target),
            _ => PathBuf::from(self.head_path()),
        };

        self.update_ref_file(&target, &format!("{oid}\n"))
    }

    fn update_ref_file(&self, path: &Path, raw_ref: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(path.parent().with_context(|| {
            format!(
                "failed to create parent directories for ref file at {:?}",
                path
            )
        })?)?;

        let mut ref_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("failed to open ref file at {:?}", path))?;
        let mut lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)?;
        lock.deref_mut().write_all(raw_ref.as_bytes())?;

        Ok(())
    }

    pub fn head_path(&self) -> Box<Path> {
        self.path.join(HEAD_REF_NAME).into_boxed_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::fixture::{FileWriteStr, PathChild};
    use rstest::{fixture, rstest};

    #[fixture]
    fn temp_dir() -> assert_fs::TempDir {
        assert_fs::TempDir::new().unwrap()
    }

    fn oid() -> ObjectId {
        ObjectId::try_parse("fc924eceb1af0c158dc775f0e55c64f60a6c5325".to_string()).unwrap()
    }

    #[rstest]
    fn head_is_none_before_the_first_commit(temp_dir: assert_fs::TempDir) {
        temp_dir
            .child("HEAD")
            .write_str("ref: refs/heads/master\n")
            .unwrap();
        let refs = Refs::new(temp_dir.path().to_path_buf().into_boxed_path());

        assert_eq!(refs.read_head().unwrap(), None);
    }

    #[rstest]
    fn update_head_writes_through_the_symbolic_ref(temp_dir: assert_fs::TempDir) {
        temp_dir
            .child("HEAD")
            .write_str("ref: refs/heads/master\n")
            .unwrap();
        let refs = Refs::new(temp_dir.path().to_path_buf().into_boxed_path());

        refs.update_head(&oid()).unwrap();

        let branch = std::fs::read_to_string(temp_dir.child("refs/heads/master").path()).unwrap();
        assert_eq!(branch, format!("{}\n", oid()));
        // HEAD itself still points at the branch
        let head = std::fs::read_to_string(temp_dir.child("HEAD").path()).unwrap();
        assert_eq!(head, "ref: refs/heads/master\n");

        assert_eq!(refs.read_head().unwrap(), Some(oid()));
    }

    #[rstest]
    fn detached_head_is_read_and_updated_in_place(temp_dir: assert_fs::TempDir) {
        temp_dir
            .child("HEAD")
            .write_str(&format!("{}\n", oid()))
            .unwrap();
        let refs = Refs::new(temp_dir.path().to_path_buf().into_boxed_path());

        assert_eq!(refs.read_head().unwrap(), Some(oid()));
    }
}
