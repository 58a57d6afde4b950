//! Object database for Git objects
//!
//! The database stores all Git objects (blobs, trees, commits) using
//! content-addressable storage. Objects are identified by their SHA-1 hash
//! and stored in a directory structure based on the hash prefix.
//!
//! ## Storage Format
//!
//! Objects are stored as:
//! - Path: `.git/objects/ab/cdef123...` (first 2 chars as directory, rest as filename)
//! - Content: zlib-compressed `<type> <size>\0<payload>`
//!
//! The SHA-1 identity covers the uncompressed header + payload sequence, so
//! the bytes that are hashed are exactly the bytes that get deflated. Object
//! files are immutable once written; storing an existing SHA is a no-op.

use crate::artifacts::errors::GfgError;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::{Object, ObjectBox, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::{read_object_header, ObjectType};
use crate::artifacts::objects::tree::Tree;
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use anyhow::Context;
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::{Cursor, Read, Write};
use std::path::Path;

/// Largest payload the database will inflate
const MAX_INFLATED_SIZE: usize = i32::MAX as usize;

/// Shortest object name prefix accepted for resolution
const MIN_PREFIX_LENGTH: usize = 4;

/// Git object database
///
/// Manages storage and retrieval of content-addressable objects.
#[derive(Debug)]
pub struct Database {
    /// Path to the objects directory (typically `.git/objects`)
    path: Box<Path>,
    /// Upper bound on inflated object size
    max_inflated_size: usize,
}

impl Database {
    /// Create a new database instance rooted at the objects directory
    pub fn new(path: Box<Path>) -> Self {
        Database {
            path,
            max_inflated_size: MAX_INFLATED_SIZE,
        }
    }

    #[cfg(test)]
    pub fn with_max_inflated_size(path: Box<Path>, max_inflated_size: usize) -> Self {
        Database {
            path,
            max_inflated_size,
        }
    }

    /// Get the path to the objects directory
    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    /// Whether a loose object with this ID exists
    pub fn exists(&self, object_id: &ObjectId) -> bool {
        self.path.join(object_id.to_path()).exists()
    }

    /// Store an object in the database, returning its ID
    ///
    /// The object is serialised (header + payload), hashed, compressed and
    /// written to a temporary file in its shard directory, then atomically
    /// renamed into place. Storing an already-present object is a no-op.
    pub fn store(&self, object: &impl Object) -> anyhow::Result<ObjectId> {
        let content = object.serialize()?;

        let mut hasher = Sha1::new();
        hasher.update(&content);
        let object_id = ObjectId::try_parse(format!("{:x}", hasher.finalize()))?;

        let object_path = self.path.join(object_id.to_path());
        if !object_path.exists() {
            self.write_object(&object_path, &content)?;
        }

        Ok(object_id)
    }

    /// Load an object's type and payload
    ///
    /// Inflates the loose file, parses the header and verifies that the
    /// declared size equals the inflated payload length. The SHA itself is
    /// not re-verified here.
    pub fn load(&self, object_id: &ObjectId) -> anyhow::Result<(ObjectType, Bytes)> {
        let object_path = self.path.join(object_id.to_path());
        let compressed = std::fs::read(&object_path).map_err(|error| {
            if error.kind() == std::io::ErrorKind::NotFound {
                anyhow::Error::from(GfgError::ObjectNotFound(object_id.to_string()))
            } else {
                anyhow::Error::from(GfgError::IoError(error))
            }
        })?;

        let data = self.decompress(object_id, &compressed)?;

        let mut reader = Cursor::new(data.clone());
        let (object_type, declared_size) =
            read_object_header(&mut reader).map_err(|error| GfgError::CorruptObject {
                oid: object_id.to_string(),
                reason: error.to_string(),
            })?;

        let payload = data.slice(reader.position() as usize..);
        if payload.len() != declared_size {
            return Err(GfgError::CorruptObject {
                oid: object_id.to_string(),
                reason: format!(
                    "declared size {declared_size} does not match payload length {}",
                    payload.len()
                ),
            }
            .into());
        }

        Ok((object_type, payload))
    }

    /// Load and deserialise an object into its concrete variant
    pub fn parse_object(&self, object_id: &ObjectId) -> anyhow::Result<ObjectBox> {
        let (object_type, payload) = self.load(object_id)?;
        let reader = Cursor::new(payload);

        match object_type {
            ObjectType::Blob => Ok(ObjectBox::Blob(Blob::deserialize(reader)?)),
            ObjectType::Tree => Ok(ObjectBox::Tree(Tree::deserialize(reader)?)),
            ObjectType::Commit => Ok(ObjectBox::Commit(Commit::deserialize(reader)?)),
        }
    }

    /// Parse an object as a Commit, if it is one
    pub fn parse_object_as_commit(&self, object_id: &ObjectId) -> anyhow::Result<Option<Commit>> {
        match self.parse_object(object_id)? {
            ObjectBox::Commit(commit) => Ok(Some(commit)),
            _ => Ok(None),
        }
    }

    /// Resolve a short hexadecimal prefix to a full object ID
    ///
    /// The prefix is matched case-insensitively against every loose object;
    /// exactly one match is required. Prefixes shorter than four characters
    /// or containing non-hex characters never resolve.
    pub fn resolve(&self, prefix: &str) -> anyhow::Result<ObjectId> {
        let normalized = prefix.to_ascii_lowercase();
        if normalized.len() < MIN_PREFIX_LENGTH
            || normalized.len() > OBJECT_ID_LENGTH
            || !normalized.bytes().all(|byte| byte.is_ascii_hexdigit())
        {
            return Err(GfgError::ObjectNotFound(prefix.to_string()).into());
        }

        let mut matches = self.find_objects_by_prefix(&normalized)?;
        match matches.len() {
            0 => Err(GfgError::ObjectNotFound(prefix.to_string()).into()),
            1 => Ok(matches.remove(0)),
            _ => Err(GfgError::AmbiguousPrefix(prefix.to_string()).into()),
        }
    }

    /// Find all objects whose hex name starts with the given prefix
    ///
    /// Only the one shard directory selected by the first two characters
    /// needs scanning, since prefixes are at least four characters long.
    fn find_objects_by_prefix(&self, prefix: &str) -> anyhow::Result<Vec<ObjectId>> {
        let dir_name = &prefix[..2];
        let file_prefix = &prefix[2..];
        let dir_path = self.path.join(dir_name);

        let mut matches = Vec::new();
        if dir_path.is_dir() {
            for entry in std::fs::read_dir(&dir_path)? {
                let entry = entry?;
                let file_name = entry.file_name();
                let file_name = file_name.to_string_lossy();

                if file_name.starts_with(file_prefix) {
                    if let Ok(oid) = ObjectId::try_parse(format!("{dir_name}{file_name}")) {
                        matches.push(oid);
                    }
                }
            }
        }

        Ok(matches)
    }

    fn write_object(&self, object_path: &Path, content: &Bytes) -> anyhow::Result<()> {
        let shard_dir = object_path
            .parent()
            .context(format!("Invalid object path {}", object_path.display()))?;
        std::fs::create_dir_all(shard_dir).context(format!(
            "Unable to create object directory {}",
            shard_dir.display()
        ))?;

        let temp_path = shard_dir.join(Self::generate_temp_name());
        let compressed = Self::compress(content)?;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .context(format!(
                "Unable to open object file {}",
                temp_path.display()
            ))?;
        file.write_all(&compressed).context(format!(
            "Unable to write object file {}",
            temp_path.display()
        ))?;

        // rename the temp file onto the object file to make the write atomic
        match std::fs::rename(&temp_path, object_path) {
            Ok(()) => Ok(()),
            Err(_) if object_path.exists() => {
                // another writer got there first; the content is identical
                let _ = std::fs::remove_file(&temp_path);
                Ok(())
            }
            Err(error) => {
                let _ = std::fs::remove_file(&temp_path);
                Err(error).context(format!(
                    "Unable to rename object file to {}",
                    object_path.display()
                ))
            }
        }
    }

    fn compress(data: &[u8]) -> anyhow::Result<Bytes> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(data)
            .context("Unable to compress object content")?;

        encoder
            .finish()
            .map(|compressed_content| compressed_content.into())
            .context("Unable to finish compressing object content")
    }

    fn decompress(&self, object_id: &ObjectId, data: &[u8]) -> anyhow::Result<Bytes> {
        let mut decoder =
            flate2::read::ZlibDecoder::new(data).take(self.max_inflated_size as u64 + 1);
        let mut decompressed_content = Vec::new();
        decoder
            .read_to_end(&mut decompressed_content)
            .map_err(|error| GfgError::CorruptObject {
                oid: object_id.to_string(),
                reason: format!("unable to inflate: {error}"),
            })?;

        if decompressed_content.len() > self.max_inflated_size {
            return Err(GfgError::CorruptObject {
                oid: object_id.to_string(),
                reason: format!("inflated size exceeds {} bytes", self.max_inflated_size),
            }
            .into());
        }

        Ok(decompressed_content.into())
    }

    fn generate_temp_name() -> String {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos();

        format!("tmp_obj_{}", std::process::id() ^ nanos)
    }
}
