//! Author identity resolution
//!
//! Commits need a `(name, email)` pair. Production code resolves it from the
//! environment first, then the repository config, then the user-level config;
//! tests inject a deterministic provider instead.

use crate::artifacts::errors::GfgError;
use derive_new::new;
use std::path::{Path, PathBuf};

/// Contract for anything able to supply an author identity
pub trait IdentityProvider {
    fn identity(&self) -> anyhow::Result<(String, String)>;
}

/// Resolves identity from `GIT_AUTHOR_NAME`/`GIT_AUTHOR_EMAIL`, then the
/// `[user]` section of `.git/config`, then `~/.gitconfig`.
#[derive(Debug, new)]
pub struct DefaultIdentity {
    git_dir: Box<Path>,
}

impl IdentityProvider for DefaultIdentity {
    fn identity(&self) -> anyhow::Result<(String, String)> {
        if let (Ok(name), Ok(email)) = (
            std::env::var("GIT_AUTHOR_NAME"),
            std::env::var("GIT_AUTHOR_EMAIL"),
        ) {
            return Ok((name, email));
        }

        let mut config_files = vec![self.git_dir.join("config")];
        if let Some(home) = std::env::var_os("HOME") {
            config_files.push(PathBuf::from(home).join(".gitconfig"));
        }

        for config_file in config_files {
            if let Some(identity) = read_user_section(&config_file)? {
                return Ok(identity);
            }
        }

        Err(GfgError::IdentityUnavailable.into())
    }
}

/// Extract `name` and `email` from the `[user]` section of a config file
///
/// Returns None unless both keys are present.
fn read_user_section(path: &Path) -> anyhow::Result<Option<(String, String)>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let mut in_user_section = false;
    let mut name = None;
    let mut email = None;

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_user_section = line == "[user]";
            continue;
        }
        if !in_user_section {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            match key.trim() {
                "name" => name = Some(value.trim().to_string()),
                "email" => email = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    Ok(name.zip(email))
}
