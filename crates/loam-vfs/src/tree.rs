use crate::path::display;
use chrono::{DateTime, Utc};
use loam_common::error::ShellError;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// What `stat` reports about an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub kind: EntryKind,
    pub mtime: DateTime<Utc>,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    File(Vec<u8>),
    Dir(BTreeMap<String, Node>),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub mtime: DateTime<Utc>,
}

impl Node {
    pub fn file(content: Vec<u8>, mtime: DateTime<Utc>) -> Self {
        Self {
            kind: NodeKind::File(content),
            mtime,
        }
    }

    pub fn dir(mtime: DateTime<Utc>) -> Self {
        Self {
            kind: NodeKind::Dir(BTreeMap::new()),
            mtime,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Dir(_))
    }

    pub fn stat(&self) -> Stat {
        match &self.kind {
            NodeKind::File(content) => Stat {
                kind: EntryKind::File,
                mtime: self.mtime,
                size: content.len(),
            },
            NodeKind::Dir(children) => Stat {
                kind: EntryKind::Directory,
                mtime: self.mtime,
                size: children.len(),
            },
        }
    }
}

/// The directory tree rooted at `/`.
#[derive(Debug, Clone)]
pub struct Tree {
    root: Node,
}

impl Tree {
    pub fn new(mtime: DateTime<Utc>) -> Self {
        Self {
            root: Node::dir(mtime),
        }
    }

    pub fn get(&self, parts: &[String]) -> Option<&Node> {
        let mut node = &self.root;
        for part in parts {
            match &node.kind {
                NodeKind::Dir(children) => node = children.get(part)?,
                NodeKind::File(_) => return None,
            }
        }
        Some(node)
    }

    pub fn get_mut(&mut self, parts: &[String]) -> Option<&mut Node> {
        let mut node = &mut self.root;
        for part in parts {
            match &mut node.kind {
                NodeKind::Dir(children) => node = children.get_mut(part)?,
                NodeKind::File(_) => return None,
            }
        }
        Some(node)
    }

    /// The directory that holds `parts`, and the final component's name.
    pub fn parent_dir_mut<'p>(
        &mut self,
        parts: &'p [String],
    ) -> Result<(&mut BTreeMap<String, Node>, &'p str), ShellError> {
        let Some((name, parent)) = parts.split_last() else {
            return Err(ShellError::AlreadyExists("/".into()));
        };
        let node = self
            .get_mut(parent)
            .ok_or_else(|| ShellError::NotFound(display(parts)))?;
        match &mut node.kind {
            NodeKind::Dir(children) => Ok((children, name.as_str())),
            NodeKind::File(_) => Err(ShellError::NotADirectory(display(parent))),
        }
    }

    /// Every path in the tree, depth first, in name order. `/` is omitted.
    pub fn walk(&self) -> Vec<(String, Stat)> {
        let mut out = Vec::new();
        walk_into(&self.root, &mut Vec::new(), &mut out);
        out
    }
}

fn walk_into(node: &Node, prefix: &mut Vec<String>, out: &mut Vec<(String, Stat)>) {
    if let NodeKind::Dir(children) = &node.kind {
        for (name, child) in children {
            prefix.push(name.clone());
            out.push((display(prefix), child.stat()));
            walk_into(child, prefix, out);
            prefix.pop();
        }
    }
}
