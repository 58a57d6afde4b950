//! Git index file format (DIRC version 2)
//!
//! The index (also called staging area or cache) stores information about the
//! working tree. It tracks which files should be included in the next commit.
//!
//! ## File Format
//!
//! ```text
//! Header (12 bytes):
//!   - Signature: "DIRC" (4 bytes)
//!   - Version: 2 (4 bytes)
//!   - Entry count (4 bytes)
//!
//! Entries (variable length, sorted by path):
//!   - Each entry padded to 8-byte alignment
//!   - Contains stat metadata, SHA and path
//!
//! Extensions:
//!   - 4-byte tag + big-endian u32 length + payload
//!   - Only `TREE` (the cache tree) is emitted
//!
//! Checksum (20 bytes):
//!   - SHA-1 hash of all preceding bytes
//! ```

pub mod cache_tree;
pub mod checksum;
pub mod entry_mode;
pub mod index_entry;
pub mod index_header;

/// Size of SHA-1 checksum in bytes
pub const CHECKSUM_SIZE: usize = 20;

/// Size of index header in bytes
pub const HEADER_SIZE: usize = 12; // 4 bytes for marker, 4 for version, 4 for entries_count

/// Magic signature identifying index files
pub const SIGNATURE: &str = "DIRC";

/// Index file format version
pub const VERSION: u32 = 2;
