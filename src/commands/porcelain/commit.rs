use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::{Author, Commit};
use crate::commands::plumbing::commit_tree::normalize_message;
use std::io::Write;

impl Repository {
    /// Materialise the index into trees, commit the root tree and advance
    /// HEAD
    ///
    /// The current HEAD (when present) becomes the sole parent; without one
    /// this creates the root commit.
    pub fn commit(&mut self, message: &str) -> anyhow::Result<()> {
        let tree_oid = self.write_tree_internal()?;

        let parent = self.refs().read_head()?;
        let is_root = match parent {
            Some(_) => "",
            None => "(root-commit) ",
        };

        let (name, email) = self.identity()?;
        let author = Author::new(name, email);
        let commit = Commit::new(
            parent.into_iter().collect(),
            tree_oid,
            author,
            normalize_message(message),
        );

        let commit_id = self.database().store(&commit)?;
        self.refs().update_head(&commit_id)?;

        writeln!(
            self.writer(),
            "[{}{}] {}",
            is_root,
            commit_id,
            commit.short_message()
        )?;

        Ok(())
    }
}
