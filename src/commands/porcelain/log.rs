use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use colored::Colorize;
use std::io::Write;

/// Warning printed when history runs into an object this core cannot read
const PACKFILE_WARNING: &str =
    "GFG: The next parent object might be a packfile. Packfiles are not supported.";

impl Repository {
    /// Render the commit history reachable from HEAD, newest first
    ///
    /// The walk follows first parents and stops when a parent object cannot
    /// be read (it may live in a packfile, which this core does not
    /// support). Colour is suppressed automatically when stdout is not a
    /// terminal, or explicitly via the hidden `--no-color` flag.
    pub fn log(&mut self) -> anyhow::Result<()> {
        let Some(mut oid) = self.refs().read_head()? else {
            writeln!(self.writer(), "No commits to show.")?;
            return Ok(());
        };

        loop {
            let commit = self
                .database()
                .parse_object_as_commit(&oid)?
                .with_context(|| format!("object {oid} is not a commit"))?;

            self.show_commit_medium(&oid, &commit)?;
            writeln!(self.writer())?;

            match commit.parent() {
                None => break,
                Some(parent) => {
                    if !self.database().exists(parent) {
                        eprintln!("{PACKFILE_WARNING}");
                        break;
                    }
                    oid = parent.clone();
                }
            }
        }

        Ok(())
    }

    fn show_commit_medium(&self, oid: &ObjectId, commit: &Commit) -> anyhow::Result<()> {
        writeln!(self.writer(), "commit {}", oid.as_ref().yellow())?;
        writeln!(self.writer(), "Author: {}", commit.author().display_name())?;
        writeln!(
            self.writer(),
            "Date:   {}",
            commit.author().readable_timestamp()
        )?;
        writeln!(self.writer())?;
        for message_line in commit.message().lines() {
            writeln!(self.writer(), "    {}", message_line)?;
        }

        Ok(())
    }
}
