//! Git tree object
//!
//! Trees represent directory snapshots in Git. They contain entries for files
//! (blobs) and subdirectories (other trees), along with their names and modes.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`
//! Each entry: `<mode> <name>\0<20-byte-sha1>`
//!
//! Entries are sorted by name with Git's rule that directory names compare as
//! if suffixed by `/`, so a subtree `foo` sorts as `foo/` against a sibling
//! blob `foobar`.

use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object::{Object, Packable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use std::borrow::Cow;
use std::io::{BufRead, Write};

/// One entry of a tree object: a blob or a subtree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub mode: EntryMode,
    pub oid: ObjectId,
}

impl TreeEntry {
    pub fn new(name: String, mode: EntryMode, oid: ObjectId) -> Self {
        TreeEntry { name, mode, oid }
    }

    pub fn object_type(&self) -> ObjectType {
        if self.mode.is_tree() {
            ObjectType::Tree
        } else {
            ObjectType::Blob
        }
    }

    /// The name this entry sorts under: directories compare with a trailing
    /// slash appended.
    fn sort_name(&self) -> Cow<'_, str> {
        if self.mode.is_tree() {
            Cow::Owned(format!("{}/", self.name))
        } else {
            Cow::Borrowed(&self.name)
        }
    }
}

/// Git tree object representing a directory snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Build a tree from entries, establishing Git's sort order
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(|a, b| a.sort_name().as_bytes().cmp(b.sort_name().as_bytes()));
        Tree { entries }
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }
}

impl Packable for Tree {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut content_bytes = Vec::new();
        for entry in &self.entries {
            if entry.name.is_empty() || entry.name.contains('/') || entry.name.contains('\0') {
                return Err(anyhow::anyhow!("Invalid tree entry name {:?}", entry.name));
            }

            let header = format!("{} {}", entry.mode.as_str(), entry.name);
            content_bytes.write_all(header.as_bytes())?;
            content_bytes.push(0);
            entry.oid.write_raw_to(&mut content_bytes)?;
        }

        let mut tree_bytes = Vec::new();
        let header = format!("{} {}\0", self.object_type().as_str(), content_bytes.len());
        tree_bytes.write_all(header.as_bytes())?;
        tree_bytes.write_all(&content_bytes)?;

        Ok(Bytes::from(tree_bytes))
    }
}

impl Unpackable for Tree {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut entries = Vec::new();
        let mut reader = reader;

        // Reuse scratch buffers to reduce allocs
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            if *mode_bytes.last().unwrap() != b' ' {
                return Err(anyhow::anyhow!("unexpected EOF in mode"));
            }
            mode_bytes.pop(); // drop the space

            let mode_str = std::str::from_utf8(&mode_bytes)?;
            let mode = EntryMode::try_from(mode_str)?;

            name_bytes.clear();
            let n = reader.read_until(b'\0', &mut name_bytes)?;
            if n == 0 || *name_bytes.last().unwrap() != b'\0' {
                return Err(anyhow::anyhow!("unexpected EOF in name"));
            }
            name_bytes.pop(); // drop NUL
            let name = std::str::from_utf8(&name_bytes)?.to_owned();
            if name.is_empty() || name.contains('/') {
                return Err(anyhow::anyhow!("Invalid tree entry name {name:?}"));
            }

            let oid =
                ObjectId::read_raw_from(&mut reader).context("unexpected EOF in object id")?;

            entries.push(TreeEntry::new(name, mode, oid));
        }

        // entries arrive in their on-disk (already sorted) order
        Ok(Tree { entries })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn display(&self) -> String {
        self.entries
            .iter()
            .map(|entry| {
                format!(
                    "{:0>6} {} {}\t{}",
                    entry.mode.as_str(),
                    entry.object_type().as_str(),
                    entry.oid.as_ref(),
                    entry.name
                )
            })
            .collect::<Vec<String>>()
            .join("\n")
    }
}
