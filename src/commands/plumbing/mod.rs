//! Plumbing commands (low-level Git operations)
//!
//! Plumbing commands provide direct access to Git's internal data structures
//! and operations. They're primarily used for scripting and as building
//! blocks for porcelain commands.
//!
//! ## Commands
//!
//! - `cat-file`: Print an object's type or content
//! - `hash-object`: Compute object ID and optionally store in database
//! - `write-tree`: Materialise trees from the index cache tree
//! - `commit-tree`: Create a commit object for an existing tree

pub mod cat_file;
pub mod commit_tree;
pub mod hash_object;
pub mod write_tree;
