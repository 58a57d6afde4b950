use crate::areas::repository::Repository;
use crate::artifacts::errors::GfgError;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::blob::Blob;
use anyhow::Context;

impl Repository {
    /// Stage files (or whole directories, recursively) into the index
    ///
    /// Every pathspec is validated up front; a single unknown path aborts
    /// the whole invocation before anything is mutated. For each staged file
    /// the blob is written to the object database first, so every SHA the
    /// index mentions exists by the time the index is emitted.
    pub fn add(&mut self, paths: &[String]) -> anyhow::Result<()> {
        for pathspec in paths {
            if !self.workspace().contains(pathspec) {
                return Err(GfgError::PathNotFound(pathspec.clone()).into());
            }
        }

        let mut index = self.index();
        index.rehydrate()?;

        for pathspec in paths {
            let absolute_path = self.workspace().path().join(pathspec).canonicalize()?;

            for path in self.workspace().list_files(Some(absolute_path))? {
                let data = match self.workspace().read_file(&path) {
                    Ok(data) => data,
                    // unreadable files are skipped rather than failing the add
                    Err(_) => continue,
                };
                let stat = self.workspace().stat_file(&path)?;

                let blob = Blob::new(data);
                let blob_id = self.database().store(&blob)?;

                let name = path
                    .to_str()
                    .with_context(|| format!("Non-UTF-8 path {}", path.display()))?
                    .to_string();
                index.add(IndexEntry::new(name, blob_id, stat))?;
            }
        }

        index.write_updates()
    }
}
