//! Cache tree (`TREE` index extension)
//!
//! The cache tree mirrors the directory structure of the index and caches,
//! per directory, the object ID of the tree that would result from writing
//! that directory, along with the number of index entries it covers. A node
//! with `entry_count == -1` is invalid: its SHA is absent and must be
//! re-derived before use. Staging a file invalidates the node for its
//! directory and every ancestor up to the root, so `write-tree` can skip
//! every subtree that did not change.
//!
//! ## Serialised form
//!
//! Flat preorder, children in name order, one record per node:
//!
//! ```text
//! <path component>\0<entry_count ascii> <subtree_count ascii>\n
//! <20 raw SHA bytes, only when entry_count >= 0>
//! ```
//!
//! The root's path component is the empty string.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::OBJECT_ID_RAW_LENGTH;
use anyhow::Context;
use std::collections::BTreeMap;

/// Marker for a node whose cached tree is out of date
pub const INVALID_ENTRY_COUNT: i32 = -1;

/// A single node of the cache tree, keyed by its name in the parent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheTreeNode {
    /// Number of index entries covered by this tree (-1 = invalid)
    pub entry_count: i32,
    /// Cached tree object ID (present only when valid)
    pub oid: Option<ObjectId>,
    children: BTreeMap<String, CacheTreeNode>,
}

impl CacheTreeNode {
    fn new_invalid() -> Self {
        CacheTreeNode {
            entry_count: INVALID_ENTRY_COUNT,
            oid: None,
            children: BTreeMap::new(),
        }
    }

    fn invalidate(&mut self) {
        self.entry_count = INVALID_ENTRY_COUNT;
        self.oid = None;
    }

    pub fn is_valid(&self) -> bool {
        self.entry_count >= 0
    }

    pub fn subtree_count(&self) -> usize {
        self.children.len()
    }

    /// Immediate subtrees in name order
    pub fn children(&self) -> impl Iterator<Item = (&String, &CacheTreeNode)> {
        self.children.iter()
    }
}

/// The cache tree forest rooted at the repository root (path `""`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheTree {
    root: Option<CacheTreeNode>,
}

impl CacheTree {
    /// True when no `TREE` extension is present at all
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Look up the node for a directory path (`""` is the root)
    pub fn node(&self, dir: &str) -> Option<&CacheTreeNode> {
        let mut node = self.root.as_ref()?;
        if dir.is_empty() {
            return Some(node);
        }

        for component in dir.split('/') {
            node = node.children.get(component)?;
        }

        Some(node)
    }

    fn node_mut(&mut self, dir: &str) -> Option<&mut CacheTreeNode> {
        let mut node = self.root.as_mut()?;
        if dir.is_empty() {
            return Some(node);
        }

        for component in dir.split('/') {
            node = node.children.get_mut(component)?;
        }

        Some(node)
    }

    pub fn contains(&self, dir: &str) -> bool {
        self.node(dir).is_some()
    }

    /// Mark the node at `dir` and every ancestor up to the root as invalid
    ///
    /// Stops descending when a path component has no node; the ancestors
    /// visited so far stay invalidated.
    pub fn invalidate(&mut self, dir: &str) {
        let Some(mut node) = self.root.as_mut() else {
            return;
        };
        node.invalidate();

        if dir.is_empty() {
            return;
        }
        for component in dir.split('/') {
            match node.children.get_mut(component) {
                Some(child) => {
                    node = child;
                    node.invalidate();
                }
                None => return,
            }
        }
    }

    /// Create missing nodes (marked invalid) along a directory path
    pub fn ensure_path(&mut self, dir: &str) {
        let mut node = self.root.get_or_insert_with(CacheTreeNode::new_invalid);
        if dir.is_empty() {
            return;
        }

        for component in dir.split('/') {
            node = node
                .children
                .entry(component.to_string())
                .or_insert_with(CacheTreeNode::new_invalid);
        }
    }

    /// Drop the node at `dir` (and its subtrees) from its parent
    pub fn remove(&mut self, dir: &str) {
        if dir.is_empty() {
            self.root = None;
            return;
        }

        let (parent, name) = dir.rsplit_once('/').unwrap_or(("", dir));
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.remove(name);
        }
    }

    /// Stamp a freshly written tree's SHA and entry count onto its node
    pub fn update_entry(&mut self, dir: &str, oid: ObjectId, entry_count: i32) -> anyhow::Result<()> {
        let node = self
            .node_mut(dir)
            .with_context(|| format!("No cache tree node for directory {dir:?}"))?;
        node.oid = Some(oid);
        node.entry_count = entry_count;

        Ok(())
    }

    /// Paths of every node currently marked invalid
    pub fn invalid_dirs(&self) -> Vec<String> {
        let mut dirs = Vec::new();
        if let Some(root) = &self.root {
            Self::collect_invalid(root, String::new(), &mut dirs);
        }

        dirs
    }

    fn collect_invalid(node: &CacheTreeNode, path: String, dirs: &mut Vec<String>) {
        if !node.is_valid() {
            dirs.push(path.clone());
        }
        for (name, child) in &node.children {
            let child_path = if path.is_empty() {
                name.clone()
            } else {
                format!("{path}/{name}")
            };
            Self::collect_invalid(child, child_path, dirs);
        }
    }

    /// Parse the payload of a `TREE` extension
    pub fn parse(data: &[u8]) -> anyhow::Result<Self> {
        if data.is_empty() {
            return Ok(CacheTree::default());
        }

        let mut cursor = 0;
        let (name, root) = Self::parse_node(data, &mut cursor)?;
        if !name.is_empty() {
            return Err(anyhow::anyhow!(
                "Cache tree root has unexpected path component {name:?}"
            ));
        }
        if cursor != data.len() {
            return Err(anyhow::anyhow!("Trailing bytes after cache tree payload"));
        }

        Ok(CacheTree { root: Some(root) })
    }

    fn parse_node(data: &[u8], cursor: &mut usize) -> anyhow::Result<(String, CacheTreeNode)> {
        let name_end = data[*cursor..]
            .iter()
            .position(|&byte| byte == 0)
            .context("Cache tree entry is missing its path terminator")?
            + *cursor;
        let name = std::str::from_utf8(&data[*cursor..name_end])
            .context("Cache tree path component is not valid UTF-8")?
            .to_string();
        *cursor = name_end + 1;

        let entry_count = parse_count(data, cursor, b' ')
            .context("Cache tree entry is missing its entry count")?;
        if entry_count < INVALID_ENTRY_COUNT {
            return Err(anyhow::anyhow!("Invalid cache tree entry count {entry_count}"));
        }

        let subtree_count = parse_count(data, cursor, b'\n')
            .context("Cache tree entry is missing its subtree count")?;
        if subtree_count < 0 {
            return Err(anyhow::anyhow!(
                "Invalid cache tree subtree count {subtree_count}"
            ));
        }

        let oid = if entry_count >= 0 {
            if *cursor + OBJECT_ID_RAW_LENGTH > data.len() {
                return Err(anyhow::anyhow!("Cache tree entry has a truncated object id"));
            }
            let oid = ObjectId::from_raw(&data[*cursor..*cursor + OBJECT_ID_RAW_LENGTH])?;
            *cursor += OBJECT_ID_RAW_LENGTH;
            Some(oid)
        } else {
            None
        };

        let mut children = BTreeMap::new();
        for _ in 0..subtree_count {
            let (child_name, child) = Self::parse_node(data, cursor)?;
            if child_name.is_empty() {
                return Err(anyhow::anyhow!("Cache tree subtree has an empty name"));
            }
            children.insert(child_name, child);
        }

        Ok((
            name,
            CacheTreeNode {
                entry_count,
                oid,
                children,
            },
        ))
    }

    /// Serialise into a `TREE` extension payload (empty when no root exists)
    pub fn serialize(&self) -> anyhow::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        if let Some(root) = &self.root {
            Self::serialize_node("", root, &mut buffer)?;
        }

        Ok(buffer)
    }

    fn serialize_node(name: &str, node: &CacheTreeNode, buffer: &mut Vec<u8>) -> anyhow::Result<()> {
        buffer.extend_from_slice(name.as_bytes());
        buffer.push(0);
        buffer.extend_from_slice(node.entry_count.to_string().as_bytes());
        buffer.push(b' ');
        buffer.extend_from_slice(node.children.len().to_string().as_bytes());
        buffer.push(b'\n');

        if node.is_valid() {
            let oid = node
                .oid
                .as_ref()
                .with_context(|| format!("Valid cache tree node {name:?} has no object id"))?;
            oid.write_raw_to(buffer)?;
        }

        for (child_name, child) in &node.children {
            Self::serialize_node(child_name, child, buffer)?;
        }

        Ok(())
    }
}

/// Parse an ASCII decimal count terminated by `terminator`
fn parse_count(data: &[u8], cursor: &mut usize, terminator: u8) -> anyhow::Result<i32> {
    let end = data[*cursor..]
        .iter()
        .position(|&byte| byte == terminator)
        .context("missing terminator")?
        + *cursor;
    let text = std::str::from_utf8(&data[*cursor..end])?;
    *cursor = end + 1;

    if text.is_empty() || (text.len() > 1 && (text.starts_with('0') || text.starts_with("-0"))) {
        return Err(anyhow::anyhow!("invalid count {text:?}"));
    }

    Ok(text.parse()?)
}
