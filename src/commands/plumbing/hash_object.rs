use crate::areas::repository::Repository;
use crate::artifacts::errors::GfgError;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object::Object;
use std::io::{Read, Write};
use std::path::Path;

/// Where `hash-object` takes its payload from
pub enum HashObjectSource {
    Stdin,
    File(String),
}

impl Repository {
    /// Compute a blob's object ID, printing it and optionally storing it
    pub fn hash_object(&mut self, source: &HashObjectSource, write: bool) -> anyhow::Result<()> {
        let data = match source {
            HashObjectSource::Stdin => {
                let mut buffer = Vec::new();
                std::io::stdin().lock().read_to_end(&mut buffer)?;
                buffer.into()
            }
            HashObjectSource::File(path) => {
                if !self.workspace().contains(path) {
                    return Err(GfgError::PathNotFound(path.clone()).into());
                }
                self.workspace().read_file(Path::new(path))?
            }
        };

        let blob = Blob::new(data);
        let object_id = if write {
            self.database().store(&blob)?
        } else {
            blob.object_id()?
        };

        writeln!(self.writer(), "{object_id}")?;

        Ok(())
    }
}
