//! Git blob object
//!
//! Blobs store file content in Git. They contain only the raw file bytes,
//! without any metadata like filename or permissions (those are stored in
//! trees). Content is carried verbatim; no normalisation is applied.

use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object::{Object, Packable};
use crate::artifacts::objects::object_type::ObjectType;
use bytes::Bytes;
use std::io::{BufRead, Write};

/// Git blob object representing file content
///
/// Each unique file content is stored as a blob, identified by its SHA-1 hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Raw file bytes
    data: Bytes,
}

impl Blob {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Blob { data: data.into() }
    }

    /// Get the raw file bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Packable for Blob {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut blob_bytes = Vec::new();
        let header = format!("{} {}\0", self.object_type().as_str(), self.data.len());
        blob_bytes.write_all(header.as_bytes())?;
        blob_bytes.write_all(&self.data)?;

        Ok(Bytes::from(blob_bytes))
    }
}

impl Unpackable for Blob {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        // the header has already been read
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        Ok(Self::new(data))
    }
}

impl Object for Blob {
    fn object_type(&self) -> ObjectType {
        ObjectType::Blob
    }

    fn display(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"".to_vec(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391")]
    #[case(b"1234\n".to_vec(), "81c545efebe5f57d4cab2ba9ec294c4b0cadf672")]
    #[case(b"4321\n".to_vec(), "79ed404b9b839e31ab01724a986c7d67218c1471")]
    fn blob_ids_match_upstream_git(#[case] content: Vec<u8>, #[case] expected: &str) {
        let blob = Blob::new(content);
        pretty_assertions::assert_eq!(blob.object_id().unwrap().as_ref(), expected);
    }

    #[test]
    fn serialization_round_trips_binary_content() {
        let blob = Blob::new(vec![0u8, 159, 146, 150]);
        let serialized = blob.serialize().unwrap();

        // strip "blob 4\0" and parse the remainder
        let payload = &serialized[serialized.iter().position(|&b| b == 0).unwrap() + 1..];
        let parsed = Blob::deserialize(std::io::Cursor::new(payload.to_vec())).unwrap();
        pretty_assertions::assert_eq!(parsed, blob);
    }
}
