use crate::areas::repository::Repository;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use anyhow::Context;
use std::io::Write;

impl Repository {
    /// Materialise tree objects for every stale directory and print the
    /// root tree's ID
    pub fn write_tree(&mut self) -> anyhow::Result<()> {
        let root_oid = self.write_tree_internal()?;
        writeln!(self.writer(), "{root_oid}")?;

        Ok(())
    }

    /// The `write-tree` algorithm
    ///
    /// 1. Read the index; partition directories into new (`N`) and invalid
    ///    (`U`).
    /// 2. Create invalid stub nodes for every path in `N`.
    /// 3. Validate the in-memory index.
    /// 4. Process `N ∪ U` deepest-first (sorted by path, reversed), so a
    ///    parent never runs before its children, whose SHAs it embeds.
    /// 5. For each directory, build a tree from its index blobs and its
    ///    cache-tree subtrees, store it, and stamp the SHA and entry count
    ///    back onto the node.
    /// 6. Emit the index and re-validate.
    ///
    /// Re-running with no mutations is a no-op: nothing is written and the
    /// cached root SHA is returned.
    pub(crate) fn write_tree_internal(&self) -> anyhow::Result<ObjectId> {
        let mut index = self.index();
        index.rehydrate()?;

        let (new_dirs, dirs_to_update) = index.trees_to_add_or_update();
        for dir in &new_dirs {
            index.cache_tree_mut().ensure_path(dir);
        }
        index.validate()?;

        let mut dirs: Vec<String> = new_dirs.into_iter().chain(dirs_to_update).collect();
        dirs.sort();
        dirs.reverse();

        for dir in dirs {
            let mut tree_entries: Vec<TreeEntry> = index
                .get_blobs(&dir)
                .into_iter()
                .map(|entry| {
                    TreeEntry::new(
                        entry.basename().to_string(),
                        entry.metadata.mode,
                        entry.oid.clone(),
                    )
                })
                .collect();
            let blob_count = tree_entries.len() as i32;

            let mut child_entry_count = 0;
            for (name, child) in index.get_subtrees(&dir) {
                // children were processed first (or were already valid)
                let child_oid = child
                    .oid
                    .clone()
                    .with_context(|| format!("Subtree {name:?} of {dir:?} has no cached tree"))?;
                child_entry_count += child.entry_count;
                tree_entries.push(TreeEntry::new(name.clone(), EntryMode::Directory, child_oid));
            }

            // a directory left without blobs or subtrees no longer exists
            if tree_entries.is_empty() && !dir.is_empty() {
                index.cache_tree_mut().remove(&dir);
                continue;
            }

            let tree = Tree::new(tree_entries);
            let tree_oid = self.database().store(&tree)?;
            index
                .cache_tree_mut()
                .update_entry(&dir, tree_oid, blob_count + child_entry_count)?;
        }

        index.write_updates()?;
        index.validate()?;

        index
            .cache_tree()
            .node("")
            .and_then(|root| root.oid.clone())
            .context("Cache tree root has no tree after write-tree")
    }
}

#[cfg(test)]
mod tests {
    use crate::areas::repository::Repository;
    use assert_fs::fixture::{FileWriteStr, PathChild, PathCreateDir};

    fn seeded_repository(dir: &assert_fs::TempDir) -> Repository {
        dir.child("gfg-test-file-1").write_str("1234\n").unwrap();
        dir.child("test-dir-1").create_dir_all().unwrap();
        dir.child("test-dir-1/gfg-test-file-2")
            .write_str("4321\n")
            .unwrap();

        let mut repository =
            Repository::new(dir.path().to_path_buf(), Box::new(std::io::sink())).unwrap();
        repository.init().unwrap();
        repository.add(&[".".to_string()]).unwrap();

        repository
    }

    #[test]
    fn write_tree_produces_the_known_root_and_is_idempotent() {
        let dir = assert_fs::TempDir::new().unwrap();
        let repository = seeded_repository(&dir);

        let first = repository.write_tree_internal().unwrap();
        assert_eq!(first.as_ref(), "ef07dd97668be8b37a746661bc1baa2fc3a200f0");

        let second = repository.write_tree_internal().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn write_tree_leaves_every_node_valid_with_true_entry_counts() {
        let dir = assert_fs::TempDir::new().unwrap();
        let repository = seeded_repository(&dir);
        repository.write_tree_internal().unwrap();

        let mut index = repository.index();
        index.rehydrate().unwrap();

        let root = index.cache_tree().node("").unwrap();
        assert!(root.is_valid());
        assert_eq!(root.entry_count, 2);
        assert_eq!(root.subtree_count(), 1);

        let subtree = index.cache_tree().node("test-dir-1").unwrap();
        assert!(subtree.is_valid());
        assert_eq!(subtree.entry_count, 1);
    }

    #[test]
    fn staging_after_write_tree_invalidates_only_the_touched_chain() {
        let dir = assert_fs::TempDir::new().unwrap();
        let mut repository = seeded_repository(&dir);
        repository.write_tree_internal().unwrap();

        dir.child("gfg-test-file-1").write_str("4321\n").unwrap();
        repository.add(&["gfg-test-file-1".to_string()]).unwrap();

        let mut index = repository.index();
        index.rehydrate().unwrap();
        assert!(!index.cache_tree().node("").unwrap().is_valid());
        assert!(index.cache_tree().node("test-dir-1").unwrap().is_valid());
    }
}
