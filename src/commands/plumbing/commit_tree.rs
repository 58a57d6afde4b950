use crate::areas::repository::Repository;
use crate::artifacts::errors::GfgError;
use crate::artifacts::objects::commit::{Author, Commit};
use crate::artifacts::objects::object_type::ObjectType;
use std::io::Write;

impl Repository {
    /// Create a (parentless) commit for an existing tree and print its ID
    ///
    /// `tree` accepts short prefixes of at least four hex characters.
    pub fn commit_tree(&mut self, tree: &str, message: &str) -> anyhow::Result<()> {
        let tree_oid = self
            .database()
            .resolve(tree)
            .map_err(|_| GfgError::InvalidArgument(format!("not a valid object name {tree}")))?;

        let (object_type, _) = self.database().load(&tree_oid)?;
        if object_type != ObjectType::Tree {
            return Err(GfgError::InvalidArgument(format!(
                "{tree_oid} is not a valid 'tree' object"
            ))
            .into());
        }

        let (name, email) = self.identity()?;
        let author = Author::new(name, email);
        let commit = Commit::new(Vec::new(), tree_oid, author, normalize_message(message));

        let commit_id = self.database().store(&commit)?;
        writeln!(self.writer(), "{commit_id}")?;

        Ok(())
    }
}

/// Commit messages always end with exactly one newline
pub(crate) fn normalize_message(message: &str) -> String {
    let mut message = message.trim_end_matches('\n').to_string();
    message.push('\n');

    message
}
