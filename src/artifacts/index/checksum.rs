//! SHA-1 trailer bookkeeping for the index file
//!
//! The index ends with a SHA-1 over every preceding byte. This wrapper
//! threads a digest through all reads and writes so parsing and emitting
//! always account for exactly the bytes that cross it. The trailer itself is
//! read and written directly against the inner stream, outside the digest.

use crate::artifacts::index::CHECKSUM_SIZE;
use anyhow::anyhow;
use sha1::{Digest, Sha1};
use std::io::{BufRead, Read, Write};

#[derive(Debug)]
pub struct Checksum<T> {
    inner: T,
    digest: Sha1,
    consumed: u64,
}

impl<T> Checksum<T> {
    pub(crate) fn new(inner: T) -> Self {
        Checksum {
            inner,
            digest: Sha1::new(),
            consumed: 0,
        }
    }

    /// Number of bytes that have passed through the digest so far
    pub(crate) fn consumed(&self) -> u64 {
        self.consumed
    }
}

impl<T: Read> Read for Checksum<T> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.digest.update(&buf[..n]);
        self.consumed += n as u64;
        Ok(n)
    }
}

impl<T: BufRead> BufRead for Checksum<T> {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        if let Ok(buffer) = self.inner.fill_buf() {
            self.digest.update(&buffer[..amt]);
        }
        self.consumed += amt as u64;
        self.inner.consume(amt);
    }
}

impl<T: Read> Checksum<T> {
    /// Read the 20-byte trailer and compare it against the running digest
    pub(crate) fn verify(&mut self) -> anyhow::Result<()> {
        let mut expected_checksum = [0u8; CHECKSUM_SIZE];
        self.inner
            .read_exact(&mut expected_checksum)
            .map_err(|_| anyhow!("Unexpected end-of-file while reading index"))?;

        let actual_checksum = self.digest.clone().finalize();

        if expected_checksum != actual_checksum.as_slice() {
            return Err(anyhow!("Checksum does not match value stored on disk"));
        }

        Ok(())
    }
}

impl<T: Write> Write for Checksum<T> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.digest.update(&buf[..n]);
        self.consumed += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl<T: Write> Checksum<T> {
    /// Finalise the digest and append it as the trailer
    pub(crate) fn write_checksum(&mut self) -> anyhow::Result<()> {
        let checksum = self.digest.clone().finalize();
        self.inner
            .write_all(checksum.as_slice())
            .map_err(|_| anyhow!("Failed to write checksum to index file"))?;

        Ok(())
    }
}
