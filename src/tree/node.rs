//! Wire representation of workspace nodes

use crate::types::NodeId;
use serde::{Deserialize, Serialize};

/// Node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

/// Nested node as exchanged on the wire and in snapshots.
///
/// Files carry `content`, directories carry `children` and `isOpen`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_open: Option<bool>,
}

impl Node {
    /// A new empty file with a fresh id
    pub fn file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: NodeId::generate(),
            name: name.into(),
            kind: NodeKind::File,
            content: Some(content.into()),
            children: None,
            is_open: None,
        }
    }

    /// A new closed directory with a fresh id
    pub fn directory(name: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            id: NodeId::generate(),
            name: name.into(),
            kind: NodeKind::Directory,
            content: None,
            children: Some(children),
            is_open: Some(false),
        }
    }

    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Number of nodes in this subtree, including self
    pub fn count(&self) -> usize {
        1 + self
            .children
            .as_ref()
            .map(|c| c.iter().map(Node::count).sum())
            .unwrap_or(0)
    }

    /// Check the kind/field pairing for this subtree
    pub fn validate_shape(&self) -> Result<(), String> {
        match self.kind {
            NodeKind::File => {
                if self.children.is_some() {
                    return Err(format!("file '{}' carries children", self.name));
                }
            }
            NodeKind::Directory => {
                if self.content.is_some() {
                    return Err(format!("directory '{}' carries content", self.name));
                }
                for child in self.children.iter().flatten() {
                    child.validate_shape()?;
                }
            }
        }
        Ok(())
    }
}
