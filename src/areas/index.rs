//! Git index (staging area)
//!
//! The index tracks which files should be included in the next commit,
//! together with the cache tree (`TREE` extension) that lets `write-tree`
//! skip unchanged directories.
//!
//! ## Invariants
//!
//! - Entries are kept and emitted in full-path byte-lexicographic order.
//! - Every mutation of an entry invalidates the cache tree nodes of its
//!   directory and every ancestor up to the root.
//! - The trailer checksum always equals the SHA-1 of the preceding bytes.
//!
//! Reads take a shared lock on the index file; writes go to `index.lock`
//! and atomically rename over `index`.

use crate::artifacts::errors::GfgError;
use crate::artifacts::index::cache_tree::{CacheTree, CacheTreeNode};
use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::index::index_header::IndexHeader;
use crate::artifacts::index::{CHECKSUM_SIZE, SIGNATURE, VERSION};
use crate::artifacts::objects::object::{Packable, Unpackable};
use anyhow::{anyhow, Context};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufRead, BufReader, Read, Write};
use std::ops::DerefMut;
use std::path::Path;

/// The directory that directly contains `path` (`""` for the root)
pub(crate) fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Git index (staging area)
#[derive(Debug, Clone)]
pub struct Index {
    /// Path to the index file (typically `.git/index`)
    path: Box<Path>,
    /// Tracked files keyed by their full path
    entries: BTreeMap<String, IndexEntry>,
    /// Index file header metadata
    header: IndexHeader,
    /// The `TREE` extension
    cache_tree: CacheTree,
    /// Flag indicating if the index has been modified since loading
    changed: bool,
}

impl Index {
    /// Create a new empty index
    pub fn new(path: Box<Path>) -> Self {
        Index {
            path,
            entries: BTreeMap::new(),
            header: IndexHeader::empty(),
            cache_tree: CacheTree::default(),
            changed: false,
        }
    }

    /// Get the path to the index file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.header = IndexHeader::empty();
        self.cache_tree = CacheTree::default();
        self.changed = false;
    }

    /// Load the index from disk
    ///
    /// Parses the header, entries and extensions and verifies the trailer
    /// checksum. A missing or empty index file yields an empty index.
    ///
    /// ## Locking
    ///
    /// Acquires a shared lock on the index file during reading.
    pub fn rehydrate(&mut self) -> anyhow::Result<()> {
        self.clear();

        if !self.path().exists() {
            return Ok(());
        }

        let mut index_file = std::fs::OpenOptions::new().read(true).open(self.path())?;
        let file_len = index_file.metadata()?.len();
        let mut lock = file_guard::lock(&mut index_file, file_guard::Lock::Shared, 0, 1)?;

        if file_len == 0 {
            return Ok(());
        }

        let mut reader = Checksum::new(BufReader::new(lock.deref_mut()));
        let entries_count = self.parse_header(&mut reader)?;
        self.parse_entries(entries_count, &mut reader)?;
        self.parse_extensions(file_len, &mut reader)?;

        reader.verify()
    }

    fn parse_header(&mut self, reader: &mut impl BufRead) -> anyhow::Result<u32> {
        let header = IndexHeader::deserialize(&mut *reader)?;

        if header.marker != SIGNATURE {
            return Err(anyhow!("Invalid index file signature"));
        }
        if header.version != VERSION {
            return Err(anyhow!(
                "Unsupported index file version: {}",
                header.version
            ));
        }

        let entries_count = header.entries_count;
        self.header = header;

        Ok(entries_count)
    }

    fn parse_entries(&mut self, entries_count: u32, reader: &mut impl BufRead) -> anyhow::Result<()> {
        for _ in 0..entries_count {
            let entry = IndexEntry::deserialize(&mut *reader)?;
            self.entries.insert(entry.name.clone(), entry);
        }

        if self.entries.len() as u32 != entries_count {
            return Err(anyhow!("Index contains duplicate entry paths"));
        }

        Ok(())
    }

    /// Parse the extensions block
    ///
    /// `TREE` is decoded into the cache tree. Unknown extensions whose tag
    /// starts with a lowercase letter are optional and skipped; any other
    /// unknown extension is mandatory and aborts the parse.
    fn parse_extensions<T: BufRead>(
        &mut self,
        file_len: u64,
        reader: &mut Checksum<T>,
    ) -> anyhow::Result<()> {
        while reader.consumed() + (CHECKSUM_SIZE as u64) < file_len {
            let mut tag = [0u8; 4];
            reader.read_exact(&mut tag)?;
            let length = reader.read_u32::<byteorder::NetworkEndian>()? as usize;

            let mut payload = vec![0u8; length];
            reader.read_exact(&mut payload)?;

            match &tag {
                b"TREE" => self.cache_tree = CacheTree::parse(&payload)?,
                _ if tag[0].is_ascii_lowercase() => {}
                _ => {
                    return Err(GfgError::UnsupportedExtension(
                        String::from_utf8_lossy(&tag).into_owned(),
                    )
                    .into())
                }
            }
        }

        Ok(())
    }

    /// Insert or replace an entry by its exact path
    ///
    /// Conflicting entries (an ancestor directory staged as a file, or files
    /// underneath this path when it used to be a directory) are discarded
    /// first, then the cache tree ancestors are invalidated.
    pub fn add(&mut self, entry: IndexEntry) -> anyhow::Result<()> {
        self.discard_conflicts(&entry);
        self.cache_tree.invalidate(entry.parent_dir());

        self.entries.insert(entry.name.clone(), entry);
        self.header.entries_count = self.entries.len() as u32;
        self.changed = true;

        Ok(())
    }

    /// Erase an entry (or a whole staged directory) by path
    pub fn remove(&mut self, path: &str) -> anyhow::Result<()> {
        let mut removed = self.entries.remove(path).is_some();

        // the path may be a directory holding staged files
        if self.remove_entries_under(path) {
            self.cache_tree.remove(path);
            removed = true;
        }

        if removed {
            self.cache_tree.invalidate(parent_dir(path));
            self.header.entries_count = self.entries.len() as u32;
            self.changed = true;
        }

        Ok(())
    }

    /// A file cannot coexist with a directory of the same name
    fn discard_conflicts(&mut self, entry: &IndexEntry) {
        for dir in entry.ancestor_dirs() {
            if !dir.is_empty() {
                self.entries.remove(dir);
            }
        }

        if self.remove_entries_under(&entry.name) {
            self.cache_tree.remove(&entry.name);
        }
    }

    /// Remove every entry strictly below `path`; returns whether any existed
    fn remove_entries_under(&mut self, path: &str) -> bool {
        let prefix = format!("{path}/");
        let doomed: Vec<String> = self
            .entries
            .range(prefix.clone()..)
            .take_while(|(name, _)| name.starts_with(&prefix))
            .map(|(name, _)| name.clone())
            .collect();

        for name in &doomed {
            self.entries.remove(name);
        }

        !doomed.is_empty()
    }

    /// Persist the index atomically via `index.lock`
    pub fn write_updates(&mut self) -> anyhow::Result<()> {
        let lock_path = self.path.with_extension("lock");

        let written = self
            .write_to_lock(&lock_path)
            .and_then(|_| std::fs::rename(&lock_path, &self.path).map_err(anyhow::Error::from));
        if let Err(error) = written {
            let _ = std::fs::remove_file(&lock_path);
            return Err(error);
        }

        self.changed = false;

        Ok(())
    }

    fn write_to_lock(&mut self, lock_path: &Path) -> anyhow::Result<()> {
        let lock_file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
            .with_context(|| format!("Unable to create '{}'", lock_path.display()))?;

        let mut writer = Checksum::new(lock_file);

        self.header = IndexHeader::new(
            String::from(SIGNATURE),
            VERSION,
            self.entries.len() as u32,
        );
        writer.write_all(&self.header.serialize()?)?;

        for entry in self.entries.values() {
            writer.write_all(&entry.serialize()?)?;
        }

        let tree_payload = self.cache_tree.serialize()?;
        if !tree_payload.is_empty() {
            writer.write_all(b"TREE")?;
            writer.write_u32::<byteorder::NetworkEndian>(tree_payload.len() as u32)?;
            writer.write_all(&tree_payload)?;
        }

        writer.write_checksum()?;

        Ok(())
    }

    /// Check in-memory consistency between header, entries and cache tree
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.header.entries_count as usize != self.entries.len() {
            return Err(anyhow!(
                "The index header and actual contents are inconsistent"
            ));
        }

        // a valid cache tree node must carry a SHA, an invalid one must not
        for dir in self.cache_tree.invalid_dirs() {
            let node = self
                .cache_tree
                .node(&dir)
                .context("invalid dir vanished during validation")?;
            if node.oid.is_some() {
                return Err(anyhow!("Invalid cache tree node {dir:?} still has a SHA"));
            }
        }

        Ok(())
    }

    pub fn entry_by_path(&self, path: &str) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose parent directory equals `dir` exactly
    pub fn get_blobs(&self, dir: &str) -> Vec<&IndexEntry> {
        self.entries
            .values()
            .filter(|entry| entry.parent_dir() == dir)
            .collect()
    }

    /// Immediate child directories of `dir` present in the cache tree,
    /// in name order
    pub fn get_subtrees(&self, dir: &str) -> Vec<(&String, &CacheTreeNode)> {
        self.cache_tree
            .node(dir)
            .map(|node| node.children().collect())
            .unwrap_or_default()
    }

    pub fn cache_tree(&self) -> &CacheTree {
        &self.cache_tree
    }

    pub fn cache_tree_mut(&mut self) -> &mut CacheTree {
        &mut self.cache_tree
    }

    /// Identify directories whose trees must be created or refreshed
    ///
    /// Returns `(new_dirs, dirs_to_update)`: directories present among index
    /// entries but missing from the cache tree, and existing cache tree
    /// nodes that are currently invalid.
    pub fn trees_to_add_or_update(&self) -> (BTreeSet<String>, BTreeSet<String>) {
        let mut new_dirs = BTreeSet::new();

        if !self.cache_tree.contains("") {
            new_dirs.insert(String::new());
        }
        for entry in self.entries.values() {
            for dir in entry.ancestor_dirs() {
                if !self.cache_tree.contains(dir) {
                    new_dirs.insert(dir.to_string());
                }
            }
        }

        let dirs_to_update = self
            .cache_tree
            .invalid_dirs()
            .into_iter()
            .filter(|dir| !new_dirs.contains(dir))
            .collect();

        (new_dirs, dirs_to_update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
    use crate::artifacts::index::index_entry::EntryMetadata;
    use crate::artifacts::objects::object_id::ObjectId;
    use rstest::{fixture, rstest};

    #[fixture]
    fn temp_dir() -> assert_fs::TempDir {
        assert_fs::TempDir::new().unwrap()
    }

    fn index_at(dir: &assert_fs::TempDir) -> Index {
        Index::new(dir.path().join("index").into_boxed_path())
    }

    fn entry(name: &str) -> IndexEntry {
        let metadata = EntryMetadata {
            ctime: 1700000000,
            mtime: 1700000000,
            mode: EntryMode::File(FileMode::Regular),
            size: 5,
            ..Default::default()
        };
        let oid =
            ObjectId::try_parse("81c545efebe5f57d4cab2ba9ec294c4b0cadf672".to_string()).unwrap();
        IndexEntry::new(name.to_string(), oid, metadata)
    }

    #[rstest]
    fn emitted_index_parses_back_byte_identically(temp_dir: assert_fs::TempDir) {
        let mut index = index_at(&temp_dir);
        for name in ["b.txt", "a/nested.txt", "a.txt"] {
            index.add(entry(name)).unwrap();
        }
        index.write_updates().unwrap();
        let first_bytes = std::fs::read(index.path()).unwrap();

        let mut reread = index_at(&temp_dir);
        reread.rehydrate().unwrap();
        assert_eq!(reread.len(), 3);
        reread.write_updates().unwrap();
        let second_bytes = std::fs::read(reread.path()).unwrap();

        pretty_assertions::assert_eq!(first_bytes, second_bytes);
    }

    #[rstest]
    fn entries_are_sorted_by_full_path_bytes(temp_dir: assert_fs::TempDir) {
        let mut index = index_at(&temp_dir);
        // "a.b" sorts before "a/b" byte-wise ('.' < '/'), unlike Path order
        for name in ["a/b", "a.b"] {
            index.add(entry(name)).unwrap();
        }

        let names: Vec<&str> = index.entries().map(|e| e.name.as_str()).collect();
        pretty_assertions::assert_eq!(names, vec!["a.b", "a/b"]);
    }

    #[rstest]
    fn adding_invalidates_ancestor_cache_tree_nodes(temp_dir: assert_fs::TempDir) {
        let mut index = index_at(&temp_dir);
        index.cache_tree_mut().ensure_path("a/b");
        let oid =
            ObjectId::try_parse("031d5285a4c23b0fd4f6f0bdbe6cbce080ea0d9b".to_string()).unwrap();
        index.cache_tree_mut().update_entry("a/b", oid.clone(), 1).unwrap();
        index.cache_tree_mut().update_entry("a", oid.clone(), 1).unwrap();
        index.cache_tree_mut().update_entry("", oid, 1).unwrap();

        index.add(entry("a/b/file.txt")).unwrap();

        assert!(!index.cache_tree().node("").unwrap().is_valid());
        assert!(!index.cache_tree().node("a").unwrap().is_valid());
        assert!(!index.cache_tree().node("a/b").unwrap().is_valid());
    }

    #[rstest]
    fn replacing_a_directory_with_a_file_drops_its_entries(temp_dir: assert_fs::TempDir) {
        let mut index = index_at(&temp_dir);
        index.add(entry("dir/one.txt")).unwrap();
        index.add(entry("dir/two.txt")).unwrap();

        index.add(entry("dir")).unwrap();

        let names: Vec<&str> = index.entries().map(|e| e.name.as_str()).collect();
        pretty_assertions::assert_eq!(names, vec!["dir"]);
    }

    #[rstest]
    fn replacing_a_file_with_a_directory_drops_the_file(temp_dir: assert_fs::TempDir) {
        let mut index = index_at(&temp_dir);
        index.add(entry("dir")).unwrap();

        index.add(entry("dir/one.txt")).unwrap();

        let names: Vec<&str> = index.entries().map(|e| e.name.as_str()).collect();
        pretty_assertions::assert_eq!(names, vec!["dir/one.txt"]);
    }

    #[rstest]
    fn trees_to_add_or_update_partitions_directories(temp_dir: assert_fs::TempDir) {
        let mut index = index_at(&temp_dir);
        index.add(entry("top.txt")).unwrap();
        index.add(entry("a/nested.txt")).unwrap();

        let (new_dirs, dirs_to_update) = index.trees_to_add_or_update();
        assert!(new_dirs.contains(""));
        assert!(new_dirs.contains("a"));
        assert!(dirs_to_update.is_empty());

        // stamp everything, then dirty one file: the dirs become updates
        for dir in &new_dirs {
            index.cache_tree_mut().ensure_path(dir);
        }
        let oid =
            ObjectId::try_parse("031d5285a4c23b0fd4f6f0bdbe6cbce080ea0d9b".to_string()).unwrap();
        index.cache_tree_mut().update_entry("a", oid.clone(), 1).unwrap();
        index.cache_tree_mut().update_entry("", oid, 2).unwrap();
        index.add(entry("a/other.txt")).unwrap();

        let (new_dirs, dirs_to_update) = index.trees_to_add_or_update();
        assert!(new_dirs.is_empty());
        assert!(dirs_to_update.contains(""));
        assert!(dirs_to_update.contains("a"));
    }

    #[rstest]
    fn get_blobs_matches_the_exact_parent_directory(temp_dir: assert_fs::TempDir) {
        let mut index = index_at(&temp_dir);
        index.add(entry("top.txt")).unwrap();
        index.add(entry("a/nested.txt")).unwrap();
        index.add(entry("a/b/deep.txt")).unwrap();

        let top: Vec<&str> = index.get_blobs("").iter().map(|e| e.basename()).collect();
        pretty_assertions::assert_eq!(top, vec!["top.txt"]);

        let nested: Vec<&str> = index.get_blobs("a").iter().map(|e| e.basename()).collect();
        pretty_assertions::assert_eq!(nested, vec!["nested.txt"]);
    }

    #[rstest]
    fn removing_entries_round_trips_and_invalidates(temp_dir: assert_fs::TempDir) {
        let mut index = index_at(&temp_dir);
        index.add(entry("keep.txt")).unwrap();
        index.add(entry("a/gone.txt")).unwrap();
        index.write_updates().unwrap();

        let mut index = index_at(&temp_dir);
        index.rehydrate().unwrap();
        index.remove("a/gone.txt").unwrap();
        index.write_updates().unwrap();

        let mut reread = index_at(&temp_dir);
        reread.rehydrate().unwrap();
        let names: Vec<&str> = reread.entries().map(|e| e.name.as_str()).collect();
        pretty_assertions::assert_eq!(names, vec!["keep.txt"]);
    }

    #[rstest]
    fn removing_a_staged_directory_drops_everything_under_it(temp_dir: assert_fs::TempDir) {
        let mut index = index_at(&temp_dir);
        index.add(entry("keep.txt")).unwrap();
        index.add(entry("a/one.txt")).unwrap();
        index.add(entry("a/b/two.txt")).unwrap();

        index.remove("a").unwrap();

        let names: Vec<&str> = index.entries().map(|e| e.name.as_str()).collect();
        pretty_assertions::assert_eq!(names, vec!["keep.txt"]);
    }

    #[rstest]
    fn checksum_corruption_is_detected_on_read(temp_dir: assert_fs::TempDir) {
        let mut index = index_at(&temp_dir);
        index.add(entry("a.txt")).unwrap();
        index.write_updates().unwrap();

        let mut bytes = std::fs::read(index.path()).unwrap();
        let len = bytes.len();
        bytes[len - 1] ^= 0xFF;
        std::fs::write(index.path(), &bytes).unwrap();

        let mut reread = index_at(&temp_dir);
        assert!(reread.rehydrate().is_err());
    }

    #[rstest]
    fn mandatory_unknown_extensions_abort_the_parse(temp_dir: assert_fs::TempDir) {
        let mut index = index_at(&temp_dir);
        index.add(entry("a.txt")).unwrap();
        index.write_updates().unwrap();

        // append an uppercase (mandatory) extension and fix up the trailer
        let bytes = std::fs::read(index.path()).unwrap();
        let mut bytes = bytes[..bytes.len() - CHECKSUM_SIZE].to_vec();
        bytes.extend_from_slice(b"LINK");
        bytes.extend_from_slice(&4u32.to_be_bytes());
        bytes.extend_from_slice(b"zzzz");
        let digest = <sha1::Sha1 as sha1::Digest>::digest(&bytes);
        bytes.extend_from_slice(&digest);
        std::fs::write(index.path(), &bytes).unwrap();

        let mut reread = index_at(&temp_dir);
        let error = reread.rehydrate().unwrap_err();
        assert!(error.to_string().contains("unsupported"));
    }

    #[rstest]
    fn optional_unknown_extensions_are_skipped(temp_dir: assert_fs::TempDir) {
        let mut index = index_at(&temp_dir);
        index.add(entry("a.txt")).unwrap();
        index.write_updates().unwrap();

        let bytes = std::fs::read(index.path()).unwrap();
        let mut bytes = bytes[..bytes.len() - CHECKSUM_SIZE].to_vec();
        bytes.extend_from_slice(b"link");
        bytes.extend_from_slice(&4u32.to_be_bytes());
        bytes.extend_from_slice(b"zzzz");
        let digest = <sha1::Sha1 as sha1::Digest>::digest(&bytes);
        bytes.extend_from_slice(&digest);
        std::fs::write(index.path(), &bytes).unwrap();

        let mut reread = index_at(&temp_dir);
        reread.rehydrate().unwrap();
        assert_eq!(reread.len(), 1);
    }
}
