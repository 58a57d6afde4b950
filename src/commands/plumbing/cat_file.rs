use crate::areas::repository::Repository;
use crate::artifacts::errors::GfgError;
use crate::artifacts::objects::object::{Object, ObjectBox};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use std::io::Write;

/// What `cat-file` should do with the resolved object
pub enum CatFileMode {
    /// `-t`: print the object's type
    TypeOnly,
    /// `-p`: pretty-print the object's content
    Pretty,
    /// `<type>`: assert the type, then print the content
    Expect(String),
}

impl Repository {
    /// Print an object's type or content; `object` accepts short prefixes
    pub fn cat_file(&mut self, mode: &CatFileMode, object: &str) -> anyhow::Result<()> {
        let object_id = self.database().resolve(object)?;

        match mode {
            CatFileMode::TypeOnly => {
                let (object_type, _) = self.database().load(&object_id)?;
                writeln!(self.writer(), "{object_type}")?;
            }
            CatFileMode::Pretty => {
                self.print_object(&object_id)?;
            }
            CatFileMode::Expect(expected) => {
                let expected_type = ObjectType::try_from(expected.as_str()).map_err(|_| {
                    GfgError::InvalidArgument(format!("invalid object type {expected:?}"))
                })?;

                let (object_type, _) = self.database().load(&object_id)?;
                if object_type != expected_type {
                    return Err(GfgError::InvalidArgument(format!(
                        "{object_id} is not a valid '{expected}' object"
                    ))
                    .into());
                }

                self.print_object(&object_id)?;
            }
        }

        Ok(())
    }

    fn print_object(&self, object_id: &ObjectId) -> anyhow::Result<()> {
        match self.database().parse_object(object_id)? {
            // blob payloads go out verbatim, byte for byte
            ObjectBox::Blob(blob) => self.writer().write_all(blob.data())?,
            ObjectBox::Tree(tree) => writeln!(self.writer(), "{}", tree.display())?,
            // a commit body already carries its trailing newline
            ObjectBox::Commit(commit) => write!(self.writer(), "{}", commit.display())?,
        }

        Ok(())
    }
}
