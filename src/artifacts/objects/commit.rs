//! Git commit object
//!
//! Commits represent snapshots of the repository at specific points in time.
//!
//! ## Format
//!
//! On disk:
//! ```text
//! commit <size>\0tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//!
//! <commit message>
//! ```
//!
//! The parent header repeats once per parent and is absent for root commits.
//! The timezone is `±HHMM`.

use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object::{Object, Packable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use std::io::{BufRead, Write};

/// Author or committer information
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Author {
    name: String,
    email: String,
    timestamp: chrono::DateTime<chrono::FixedOffset>,
}

impl Author {
    /// Create a new author stamped with the current local time
    pub fn new(name: String, email: String) -> Self {
        Author {
            name,
            email,
            timestamp: chrono::Local::now().fixed_offset(),
        }
    }

    pub fn new_with_timestamp(
        name: String,
        email: String,
        timestamp: chrono::DateTime<chrono::FixedOffset>,
    ) -> Self {
        Author {
            name,
            email,
            timestamp,
        }
    }

    /// Format author name and email for display: `Name <email>`
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    /// Format the header form: `Name <email> <unix-timestamp> ±HHMM`
    pub fn display(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp.timestamp(),
            self.timestamp.format("%z")
        )
    }

    /// Format the timestamp the way `git log` does
    pub fn readable_timestamp(&self) -> String {
        self.timestamp
            .format("%a %b %-d %H:%M:%S %Y %z")
            .to_string()
    }

    pub fn timestamp(&self) -> chrono::DateTime<chrono::FixedOffset> {
        self.timestamp
    }
}

impl TryFrom<&str> for Author {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // Format: "name <email> timestamp timezone"
        // Split from the right so names may contain spaces
        let parts: Vec<&str> = value.rsplitn(3, ' ').collect();
        if parts.len() < 3 {
            return Err(anyhow::anyhow!("Invalid author format"));
        }

        let offset = parse_timezone(parts[0])?;
        let timestamp = parts[1]
            .parse::<i64>()
            .map_err(|_| anyhow::anyhow!("Invalid timestamp"))?;
        let name_email = parts[2];

        let email_start = name_email
            .find('<')
            .ok_or_else(|| anyhow::anyhow!("Invalid author format: missing '<'"))?;
        let email_end = name_email
            .find('>')
            .ok_or_else(|| anyhow::anyhow!("Invalid author format: missing '>'"))?;

        let name = name_email[..email_start].trim().to_string();
        let email = name_email[email_start + 1..email_end].to_string();

        let timestamp = chrono::DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| anyhow::anyhow!("Invalid timestamp"))?
            .with_timezone(&offset);

        Ok(Author {
            name,
            email,
            timestamp,
        })
    }
}

/// Parse a `±HHMM` timezone offset
fn parse_timezone(text: &str) -> anyhow::Result<chrono::FixedOffset> {
    if text.len() != 5 || !text[1..].bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(anyhow::anyhow!("Invalid timezone {text:?}"));
    }

    let hours: i32 = text[1..3].parse()?;
    let minutes: i32 = text[3..5].parse()?;
    let seconds = hours * 3600 + minutes * 60;
    let seconds = match &text[..1] {
        "+" => seconds,
        "-" => -seconds,
        _ => return Err(anyhow::anyhow!("Invalid timezone {text:?}")),
    };

    chrono::FixedOffset::east_opt(seconds).ok_or_else(|| anyhow::anyhow!("Invalid timezone {text:?}"))
}

/// Git commit object
///
/// Contains references to the tree representing the state of files, the
/// parent commit(s), author and committer identities, and the message.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    /// Parent commit IDs (empty for the initial commit)
    parents: Vec<ObjectId>,
    /// Tree object ID representing the directory snapshot
    tree_oid: ObjectId,
    author: Author,
    committer: Author,
    /// Commit message, stored verbatim including its trailing newline
    message: String,
}

impl Commit {
    pub fn new(parents: Vec<ObjectId>, tree_oid: ObjectId, author: Author, message: String) -> Self {
        Commit {
            parents,
            tree_oid,
            author: author.clone(),
            committer: author,
            message,
        }
    }

    /// Get the first line of the commit message
    pub fn short_message(&self) -> String {
        self.message.lines().next().unwrap_or("").to_string()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    /// The commit payload: ordered headers, a blank line, then the message
    fn body(&self) -> String {
        let mut body = String::new();

        body.push_str(&format!("tree {}\n", self.tree_oid.as_ref()));
        for parent in &self.parents {
            body.push_str(&format!("parent {}\n", parent.as_ref()));
        }
        body.push_str(&format!("author {}\n", self.author.display()));
        body.push_str(&format!("committer {}\n", self.committer.display()));
        body.push('\n');
        body.push_str(&self.message);

        body
    }
}

impl Packable for Commit {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let content_bytes = self.body().into_bytes();

        let mut commit_bytes = Vec::new();
        let header = format!("{} {}\0", self.object_type().as_str(), content_bytes.len());
        commit_bytes.write_all(header.as_bytes())?;
        commit_bytes.write_all(&content_bytes)?;

        Ok(Bytes::from(commit_bytes))
    }
}

impl Unpackable for Commit {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        let content = String::from_utf8(content)?;

        let (header_text, message) = content
            .split_once("\n\n")
            .context("Invalid commit object: missing blank line before message")?;

        let mut tree_oid = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;

        for line in header_text.lines() {
            if let Some(rest) = line.strip_prefix("tree ") {
                tree_oid = Some(ObjectId::try_parse(rest.to_string())?);
            } else if let Some(rest) = line.strip_prefix("parent ") {
                parents.push(ObjectId::try_parse(rest.to_string())?);
            } else if let Some(rest) = line.strip_prefix("author ") {
                author = Some(Author::try_from(rest)?);
            } else if let Some(rest) = line.strip_prefix("committer ") {
                committer = Some(Author::try_from(rest)?);
            } else {
                return Err(anyhow::anyhow!("Invalid commit object: unexpected header {line:?}"));
            }
        }

        Ok(Commit {
            parents,
            tree_oid: tree_oid.context("Invalid commit object: missing tree line")?,
            author: author.context("Invalid commit object: missing author line")?,
            committer: committer.context("Invalid commit object: missing committer line")?,
            message: message.to_string(),
        })
    }
}

impl Object for Commit {
    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }

    fn display(&self) -> String {
        self.body()
    }
}
