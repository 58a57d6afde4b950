//! Core object traits and types
//!
//! This module defines the fundamental traits that all Git objects implement:
//! - `Packable`: Serialization to Git's binary format
//! - `Unpackable`: Deserialization from Git's binary format
//! - `Object`: Common object operations (ID computation, display)
//!
//! ## Object Format
//!
//! All objects are stored as:
//! ```text
//! <type> <size>\0<content>
//! ```
//! Then compressed with zlib and stored in `.git/objects/`. The SHA-1 that
//! names an object is computed over the uncompressed `header\0payload`
//! sequence, so serializing and hashing always act on the same bytes.

use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use anyhow::Result;
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::BufRead;
use std::path::PathBuf;

/// Trait for serializing objects to Git's binary format
pub trait Packable {
    /// Serialize the object to bytes (including header)
    fn serialize(&self) -> Result<Bytes>;
}

/// Trait for deserializing objects from Git's binary format
pub trait Unpackable {
    /// Deserialize the object from a reader (header already consumed)
    fn deserialize(reader: impl BufRead) -> Result<Self>
    where
        Self: Sized;
}

/// Core Git object trait
///
/// Implemented by all Git object types (Blob, Tree, Commit).
pub trait Object: Packable {
    /// Get the object's type
    fn object_type(&self) -> ObjectType;

    /// Get a human-readable representation
    fn display(&self) -> String;

    /// Compute the object ID (SHA-1 over the serialized header + payload)
    fn object_id(&self) -> Result<ObjectId> {
        let content = self.serialize()?;
        let mut hasher = Sha1::new();
        hasher.update(&content);

        ObjectId::try_parse(format!("{:x}", hasher.finalize()))
    }

    /// Get the file system path where this object would be stored
    fn object_path(&self) -> Result<PathBuf> {
        Ok(self.object_id()?.to_path())
    }
}

/// Type-erased object container
///
/// Used when the specific object type isn't known at compile time.
pub enum ObjectBox {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
}
