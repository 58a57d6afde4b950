//! Error kinds for repository operations.
//!
//! Internal routines never print; they bubble one of these kinds (wrapped in
//! `anyhow::Error`) up to the command dispatcher, which renders a single
//! `fatal:` line on stderr. The `Display` text therefore has to match Git's
//! wording wherever Git fixes it.

use thiserror::Error;

/// An error produced by the object database, the index, or a command.
#[derive(Debug, Error)]
pub enum GfgError {
    /// A pathspec given to `add` or `hash-object` matched nothing.
    #[error("pathspec '{0}' did not match any files")]
    PathNotFound(String),

    /// No `.git` directory was found while walking up from the working
    /// directory.
    #[error("not a git repository (or any of the parent directories): .git")]
    NotARepository,

    /// A loose object failed to inflate or its header disagrees with its
    /// payload.
    #[error("object {oid} is corrupt: {reason}")]
    CorruptObject { oid: String, reason: String },

    /// No loose object matches the given name or prefix.
    #[error("Not a valid object name {0}")]
    ObjectNotFound(String),

    /// More than one loose object matches the given prefix.
    #[error("short object ID {0} is ambiguous")]
    AmbiguousPrefix(String),

    /// A command argument was structurally invalid.
    #[error("{0}")]
    InvalidArgument(String),

    /// No author name/email could be resolved from the environment or any
    /// config file.
    #[error("unable to auto-detect author identity (set GIT_AUTHOR_NAME and GIT_AUTHOR_EMAIL)")]
    IdentityUnavailable,

    /// The index carries a mandatory extension this implementation does not
    /// understand.
    #[error("unsupported mandatory index extension '{0}'")]
    UnsupportedExtension(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}
