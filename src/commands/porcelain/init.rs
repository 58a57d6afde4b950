use crate::areas::repository::Repository;
use anyhow::Context;
use std::fs;
use std::io::Write;

/// Default repository config, written the way `git init` writes it
const DEFAULT_CONFIG: &str = "[core]\n\
    \trepositoryformatversion = 0\n\
    \tfilemode = false\n\
    \tbare = false\n\
    \tlogallrefupdates = true\n";

const DEFAULT_DESCRIPTION: &str =
    "Unnamed repository; edit this file 'description' to name the repository.\n";

impl Repository {
    pub fn init(&mut self) -> anyhow::Result<()> {
        let git_dir = self.git_dir();

        if git_dir.is_dir() {
            writeln!(
                self.writer(),
                "Reinitialized existing Git repository in {}/",
                git_dir.display()
            )?;
            return Ok(());
        }

        fs::create_dir_all(git_dir.join("objects"))
            .context("Failed to create .git/objects directory")?;
        fs::create_dir_all(git_dir.join("refs").join("heads"))
            .context("Failed to create .git/refs/heads directory")?;
        fs::create_dir_all(git_dir.join("refs").join("tags"))
            .context("Failed to create .git/refs/tags directory")?;
        fs::create_dir_all(git_dir.join("branches"))
            .context("Failed to create .git/branches directory")?;

        fs::write(git_dir.join("HEAD"), "ref: refs/heads/master\n")
            .context("Failed to write .git/HEAD file")?;
        fs::write(git_dir.join("config"), DEFAULT_CONFIG)
            .context("Failed to write .git/config file")?;
        fs::write(git_dir.join("description"), DEFAULT_DESCRIPTION)
            .context("Failed to write .git/description file")?;

        writeln!(
            self.writer(),
            "Initialized empty Git repository in {}/",
            git_dir.display()
        )?;

        Ok(())
    }
}
