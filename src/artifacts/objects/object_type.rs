use std::io::BufRead;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
}

impl ObjectType {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Tree => "tree",
            ObjectType::Commit => "commit",
        }
    }
}

impl TryFrom<&str> for ObjectType {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> anyhow::Result<Self> {
        match value {
            "blob" => Ok(ObjectType::Blob),
            "tree" => Ok(ObjectType::Tree),
            "commit" => Ok(ObjectType::Commit),
            _ => Err(anyhow::anyhow!("Invalid object type {value:?}")),
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Consume `<type> <size>\0` from the reader and return both parts.
///
/// The size is the declared payload length in decimal ASCII; leading zeros
/// and signs are rejected so the header is uniquely determined by its value.
pub fn read_object_header(reader: &mut impl BufRead) -> anyhow::Result<(ObjectType, usize)> {
    let mut type_bytes = Vec::new();
    reader.read_until(b' ', &mut type_bytes)?;
    if type_bytes.pop() != Some(b' ') {
        return Err(anyhow::anyhow!("truncated object header: missing type"));
    }
    let object_type = ObjectType::try_from(std::str::from_utf8(&type_bytes)?)?;

    let mut size_bytes = Vec::new();
    reader.read_until(b'\0', &mut size_bytes)?;
    if size_bytes.pop() != Some(b'\0') {
        return Err(anyhow::anyhow!("truncated object header: missing size"));
    }
    let size = parse_object_size(std::str::from_utf8(&size_bytes)?)?;

    Ok((object_type, size))
}

fn parse_object_size(text: &str) -> anyhow::Result<usize> {
    if text.is_empty() || !text.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(anyhow::anyhow!("invalid object size {text:?}"));
    }
    if text.len() > 1 && text.starts_with('0') {
        return Err(anyhow::anyhow!("invalid object size {text:?}: leading zero"));
    }

    Ok(text.parse()?)
}
