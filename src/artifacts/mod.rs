//! Git data structures and algorithms
//!
//! This module contains the core Git types and algorithms:
//!
//! - `errors`: Typed error kinds surfaced as `fatal:` lines at the CLI boundary
//! - `identity`: Author identity resolution (environment, then config files)
//! - `index`: Index/staging area data structures, including the cache tree
//! - `objects`: Git object types (blob, tree, commit)

pub mod errors;
pub mod identity;
pub mod index;
pub mod objects;
