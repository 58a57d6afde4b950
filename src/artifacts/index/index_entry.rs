//! Index entry representation
//!
//! Each entry in the index represents a tracked file with:
//! - File path (relative to the repository root, `/`-separated)
//! - Content hash (object ID)
//! - File metadata (mode, size, timestamps)
//!
//! ## Entry Format
//!
//! A fixed 62-byte prefix (stat data, SHA, flags), the path bytes, then NUL
//! padding up to the next 8-byte boundary with at least one NUL terminator.
//! The low 12 bits of the flags hold `min(path_len, 0xFFF)`.

use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
use crate::artifacts::objects::object::{Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use byteorder::{ByteOrder, WriteBytesExt};
use bytes::Bytes;
use is_executable::IsExecutable;
use std::cmp::min;
use std::fs::Metadata;
use std::io::{BufRead, Write};
use std::os::unix::prelude::MetadataExt;
use std::path::Path;

/// Maximum path length representable in the flags field
pub const MAX_NAME_LEN: usize = 0xFFF;

/// Block size for entry alignment (8 bytes)
pub const ENTRY_BLOCK: usize = 8;

/// Size of the fixed entry prefix before the path bytes
pub const ENTRY_PREFIX_SIZE: usize = 62;

/// Index entry representing a tracked file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexEntry {
    /// File path relative to repository root
    pub name: String,
    /// SHA-1 hash of file content
    pub oid: ObjectId,
    /// File metadata (mode, size, timestamps, flags)
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    pub fn new(name: String, oid: ObjectId, mut metadata: EntryMetadata) -> Self {
        metadata.flags = min(name.len(), MAX_NAME_LEN) as u16;
        IndexEntry {
            name,
            oid,
            metadata,
        }
    }

    /// The entry's file name without its directory part
    pub fn basename(&self) -> &str {
        self.name
            .rsplit_once('/')
            .map(|(_, base)| base)
            .unwrap_or(&self.name)
    }

    /// The directory that directly contains this entry (`""` for the root)
    pub fn parent_dir(&self) -> &str {
        self.name
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or("")
    }

    /// Every directory on the path to this entry, shallowest first,
    /// starting with the root (`""`)
    pub fn ancestor_dirs(&self) -> Vec<&str> {
        let mut dirs = vec![""];
        for (idx, byte) in self.name.bytes().enumerate() {
            if byte == b'/' {
                dirs.push(&self.name[..idx]);
            }
        }

        dirs
    }

    /// The merge stage encoded in the flags (always 0 in this core)
    pub fn stage(&self) -> u8 {
        ((self.metadata.flags >> 12) & 0x3) as u8
    }
}

impl PartialOrd for IndexEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.as_bytes().cmp(other.name.as_bytes())
    }
}

/// File metadata stored in index entries
///
/// Contains stat information (mode, size, inode) and timestamps with
/// nanosecond precision, which enable fast change detection without reading
/// file content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Change time (seconds since Unix epoch)
    pub ctime: i64,
    /// Change time nanoseconds
    pub ctime_nsec: i64,
    /// Modification time (seconds since Unix epoch)
    pub mtime: i64,
    /// Modification time nanoseconds
    pub mtime_nsec: i64,
    /// Device ID
    pub dev: u64,
    /// Inode number
    pub ino: u64,
    /// File mode, normalised to 100644/100755
    pub mode: EntryMode,
    /// User ID of owner
    pub uid: u32,
    /// Group ID of owner
    pub gid: u32,
    /// File size in bytes (truncated to 32 bits on disk)
    pub size: u64,
    /// 16-bit flags: assume-valid, extended, stage, name length
    pub flags: u16,
}

impl Packable for IndexEntry {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut entry_bytes = Vec::new();
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.ctime as u32)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.ctime_nsec as u32)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.mtime as u32)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.mtime_nsec as u32)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.dev as u32)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.ino as u32)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.mode.as_u32())?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.uid)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.gid)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.size as u32)?;
        self.oid.write_raw_to(&mut entry_bytes)?;
        entry_bytes.write_u16::<byteorder::NetworkEndian>(self.metadata.flags)?;
        entry_bytes.write_all(self.name.as_bytes())?;

        // NUL-terminate and pad so the total length is a multiple of 8
        entry_bytes.push(0);
        while entry_bytes.len() % ENTRY_BLOCK != 0 {
            entry_bytes.push(0);
        }

        Ok(Bytes::from(entry_bytes))
    }
}

impl Unpackable for IndexEntry {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let mut prefix = [0u8; ENTRY_PREFIX_SIZE];
        reader
            .read_exact(&mut prefix)
            .map_err(|_| anyhow::anyhow!("Invalid index entry size"))?;

        let ctime = byteorder::NetworkEndian::read_u32(&prefix[0..4]) as i64;
        let ctime_nsec = byteorder::NetworkEndian::read_u32(&prefix[4..8]) as i64;
        let mtime = byteorder::NetworkEndian::read_u32(&prefix[8..12]) as i64;
        let mtime_nsec = byteorder::NetworkEndian::read_u32(&prefix[12..16]) as i64;
        let dev = byteorder::NetworkEndian::read_u32(&prefix[16..20]) as u64;
        let ino = byteorder::NetworkEndian::read_u32(&prefix[20..24]) as u64;
        let mode = EntryMode::try_from(byteorder::NetworkEndian::read_u32(&prefix[24..28]))?;
        let uid = byteorder::NetworkEndian::read_u32(&prefix[28..32]);
        let gid = byteorder::NetworkEndian::read_u32(&prefix[32..36]);
        let size = byteorder::NetworkEndian::read_u32(&prefix[36..40]) as u64;
        let oid = ObjectId::from_raw(&prefix[40..60])?;
        let flags = byteorder::NetworkEndian::read_u16(&prefix[60..62]);

        let name_len = (flags & MAX_NAME_LEN as u16) as usize;
        let (name, consumed) = if name_len < MAX_NAME_LEN {
            let mut name_bytes = vec![0u8; name_len];
            reader
                .read_exact(&mut name_bytes)
                .map_err(|_| anyhow::anyhow!("Unexpected end-of-file in entry name"))?;
            let name = String::from_utf8(name_bytes)
                .map_err(|_| anyhow::anyhow!("Invalid UTF-8 in entry name"))?;
            let consumed = ENTRY_PREFIX_SIZE + name.len();
            (name, consumed)
        } else {
            // the length did not fit in the flags; scan to the terminator
            let mut name_bytes = Vec::new();
            reader.read_until(0, &mut name_bytes)?;
            if name_bytes.pop() != Some(0) {
                return Err(anyhow::anyhow!("Missing NUL terminator in entry name"));
            }
            let name = String::from_utf8(name_bytes)
                .map_err(|_| anyhow::anyhow!("Invalid UTF-8 in entry name"))?;
            let consumed = ENTRY_PREFIX_SIZE + name.len() + 1;
            (name, consumed)
        };

        // the entry occupies the next multiple of 8 after prefix + name,
        // with at least one NUL terminator in between
        let total = (ENTRY_PREFIX_SIZE + name.len()) / ENTRY_BLOCK * ENTRY_BLOCK + ENTRY_BLOCK;
        let mut padding = vec![0u8; total - consumed];
        reader
            .read_exact(&mut padding)
            .map_err(|_| anyhow::anyhow!("Unexpected end-of-file in entry padding"))?;
        if padding.iter().any(|&byte| byte != 0) {
            return Err(anyhow::anyhow!("Entry padding contained non-NUL bytes"));
        }

        Ok(IndexEntry {
            name,
            oid,
            metadata: EntryMetadata {
                ctime,
                ctime_nsec,
                mtime,
                mtime_nsec,
                dev,
                ino,
                mode,
                uid,
                gid,
                size,
                flags,
            },
        })
    }
}

impl TryFrom<(&Path, Metadata)> for EntryMetadata {
    type Error = anyhow::Error;

    /// Build stat metadata from a working-tree file. The path must be the
    /// on-disk location of the file (used for the executable-bit check);
    /// flags are filled in later from the entry name.
    fn try_from((file_path, metadata): (&Path, Metadata)) -> Result<Self, Self::Error> {
        if metadata.is_dir() {
            return Err(anyhow::anyhow!(
                "Cannot stage a directory as an index entry: {}",
                file_path.display()
            ));
        }

        let mode = match file_path.is_executable() {
            true => EntryMode::File(FileMode::Executable),
            false => EntryMode::File(FileMode::Regular),
        };

        Ok(Self {
            ctime: metadata.ctime(),
            ctime_nsec: metadata.ctime_nsec(),
            mtime: metadata.mtime(),
            mtime_nsec: metadata.mtime_nsec(),
            dev: metadata.dev(),
            ino: metadata.ino(),
            mode,
            uid: metadata.uid(),
            gid: metadata.gid(),
            size: metadata.size(),
            flags: 0,
        })
    }
}
