//! Arena-backed workspace tree
//!
//! Nodes live in a flat map addressed by id with explicit parent and ordered
//! children indices. Every mutation validates first and only then touches the
//! map, so a failed mutation leaves the tree exactly as it was. `revision` is
//! bumped once per successful mutation and serves as the change notification.

use crate::error::WorkspaceError;
use crate::tree::node::{Node, NodeKind};
use crate::types::NodeId;
use std::collections::{HashMap, HashSet};

/// One node of the arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// File content; always `None` for directories
    pub content: Option<String>,
    /// Ordered child ids; always empty for files
    pub children: Vec<NodeId>,
    /// `None` only for the root
    pub parent: Option<NodeId>,
    /// UI expansion flag, directories only
    pub is_open: bool,
}

impl NodeRecord {
    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

/// The workspace tree of one client
#[derive(Debug, Clone)]
pub struct TreeModel {
    root: NodeId,
    nodes: HashMap<NodeId, NodeRecord>,
    revision: u64,
}

impl TreeModel {
    /// Create a tree holding only an open root directory
    pub fn new(root_name: impl Into<String>) -> Self {
        let root = NodeId::generate();
        let mut nodes = HashMap::new();
        nodes.insert(
            root.clone(),
            NodeRecord {
                id: root.clone(),
                name: root_name.into(),
                kind: NodeKind::Directory,
                content: None,
                children: Vec::new(),
                parent: None,
                is_open: true,
            },
        );
        Self {
            root,
            nodes,
            revision: 0,
        }
    }

    /// Build a tree from a nested snapshot node.
    ///
    /// The node becomes the root and must be a directory. Duplicate ids and
    /// kind/field mismatches anywhere in the subtree are rejected.
    pub fn from_node(node: &Node) -> Result<Self, WorkspaceError> {
        if !node.is_directory() {
            return Err(WorkspaceError::InvalidNode(format!(
                "root '{}' must be a directory",
                node.name
            )));
        }
        node.validate_shape().map_err(WorkspaceError::InvalidNode)?;
        let mut seen = HashSet::new();
        collect_ids(node, &mut seen)?;

        let mut tree = Self {
            root: node.id.clone(),
            nodes: HashMap::with_capacity(seen.len()),
            revision: 0,
        };
        tree.insert_subtree(None, node.clone());
        Ok(tree)
    }

    pub fn root_id(&self) -> &NodeId {
        &self.root
    }

    pub fn root(&self) -> &NodeRecord {
        &self.nodes[&self.root]
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Total node count including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root().children.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&NodeRecord> {
        self.nodes.get(id)
    }

    /// Lookup that signals NotFound
    pub fn require(&self, id: &NodeId) -> Result<&NodeRecord, WorkspaceError> {
        self.nodes.get(id).ok_or_else(|| WorkspaceError::missing(id))
    }

    /// Lookup restricted to directories
    pub fn require_directory(&self, id: &NodeId) -> Result<&NodeRecord, WorkspaceError> {
        match self.nodes.get(id) {
            Some(record) if record.is_directory() => Ok(record),
            _ => Err(WorkspaceError::NotFound(format!("directory {}", id))),
        }
    }

    /// Lookup restricted to files
    pub fn require_file(&self, id: &NodeId) -> Result<&NodeRecord, WorkspaceError> {
        match self.nodes.get(id) {
            Some(record) if record.is_file() => Ok(record),
            _ => Err(WorkspaceError::NotFound(format!("file {}", id))),
        }
    }

    pub fn parent_of(&self, id: &NodeId) -> Option<&NodeRecord> {
        self.nodes
            .get(id)
            .and_then(|record| record.parent.as_ref())
            .and_then(|parent| self.nodes.get(parent))
    }

    /// Children of a directory in order
    pub fn children(&self, dir: &NodeId) -> Result<Vec<&NodeRecord>, WorkspaceError> {
        let record = self.require_directory(dir)?;
        Ok(record
            .children
            .iter()
            .filter_map(|child| self.nodes.get(child))
            .collect())
    }

    /// First child of `dir` with the given name
    pub fn child_named(&self, dir: &NodeId, name: &str) -> Option<&NodeRecord> {
        self.nodes.get(dir).and_then(|record| {
            record
                .children
                .iter()
                .filter_map(|child| self.nodes.get(child))
                .find(|child| child.name == name)
        })
    }

    /// Ids from the root down to `id`, inclusive
    pub fn lineage(&self, id: &NodeId) -> Result<Vec<NodeId>, WorkspaceError> {
        let mut chain = Vec::new();
        let mut cursor = Some(self.require(id)?);
        while let Some(record) = cursor {
            chain.push(record.id.clone());
            cursor = record.parent.as_ref().and_then(|p| self.nodes.get(p));
        }
        chain.reverse();
        Ok(chain)
    }

    /// Canonical absolute path: `/` for the root, `/a/b` below it
    pub fn path_of(&self, id: &NodeId) -> Result<String, WorkspaceError> {
        let names: Vec<&str> = self
            .lineage(id)?
            .iter()
            .skip(1)
            .filter_map(|node| self.nodes.get(node))
            .map(|record| record.name.as_str())
            .collect();
        Ok(format!("/{}", names.join("/")))
    }

    /// Whether `id` equals `ancestor` or lies below it
    pub fn is_within(&self, id: &NodeId, ancestor: &NodeId) -> bool {
        let mut cursor = self.nodes.get(id);
        while let Some(record) = cursor {
            if &record.id == ancestor {
                return true;
            }
            cursor = record.parent.as_ref().and_then(|p| self.nodes.get(p));
        }
        false
    }

    /// All ids of the subtree rooted at `id`, pre-order
    pub fn descendants(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if let Some(record) = self.nodes.get(&current) {
                out.push(current);
                stack.extend(record.children.iter().rev().cloned());
            }
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    /// Nested copy of the subtree rooted at `id`
    pub fn to_node(&self, id: &NodeId) -> Result<Node, WorkspaceError> {
        let record = self.require(id)?;
        Ok(self.materialize(record))
    }

    /// Nested copy of the whole tree
    pub fn snapshot(&self) -> Node {
        self.materialize(self.root())
    }

    fn materialize(&self, record: &NodeRecord) -> Node {
        match record.kind {
            NodeKind::File => Node {
                id: record.id.clone(),
                name: record.name.clone(),
                kind: NodeKind::File,
                content: Some(record.content.clone().unwrap_or_default()),
                children: None,
                is_open: None,
            },
            NodeKind::Directory => Node {
                id: record.id.clone(),
                name: record.name.clone(),
                kind: NodeKind::Directory,
                content: None,
                children: Some(
                    record
                        .children
                        .iter()
                        .filter_map(|child| self.nodes.get(child))
                        .map(|child| self.materialize(child))
                        .collect(),
                ),
                is_open: Some(record.is_open),
            },
        }
    }

    /// Check that every node is reachable from the root through exactly one
    /// parent and that parent/child indices agree.
    pub fn check_integrity(&self) -> Result<(), String> {
        let mut visited = HashSet::new();
        let mut stack = vec![self.root.clone()];
        if self.root().parent.is_some() {
            return Err("root has a parent".to_string());
        }
        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                return Err(format!("node {} reachable twice", current));
            }
            let record = self
                .nodes
                .get(&current)
                .ok_or_else(|| format!("dangling child id {}", current))?;
            if record.is_file() && !record.children.is_empty() {
                return Err(format!("file {} has children", current));
            }
            if record.is_directory() && record.content.is_some() {
                return Err(format!("directory {} has content", current));
            }
            for child in &record.children {
                let child_record = self
                    .nodes
                    .get(child)
                    .ok_or_else(|| format!("dangling child id {}", child))?;
                if child_record.parent.as_ref() != Some(&current) {
                    return Err(format!("node {} has inconsistent parent", child));
                }
                stack.push(child.clone());
            }
        }
        if visited.len() != self.nodes.len() {
            return Err(format!(
                "{} unreachable node(s)",
                self.nodes.len() - visited.len()
            ));
        }
        Ok(())
    }

    // --- mutation, used by the workspace operations ---

    /// Append `node` (and its subtree) as the last child of `parent`
    pub(crate) fn attach(&mut self, parent: &NodeId, node: Node) -> Result<NodeId, WorkspaceError> {
        self.require_directory(parent)
            .map_err(|_| WorkspaceError::ParentNotFound(parent.clone()))?;
        node.validate_shape().map_err(WorkspaceError::InvalidNode)?;
        let mut incoming = HashSet::new();
        collect_ids(&node, &mut incoming)?;
        if let Some(taken) = incoming.iter().find(|id| self.nodes.contains_key(*id)) {
            return Err(WorkspaceError::DuplicateId((*taken).clone()));
        }

        let id = self.insert_subtree(Some(parent.clone()), node);
        if let Some(parent_record) = self.nodes.get_mut(parent) {
            parent_record.children.push(id.clone());
        }
        self.revision += 1;
        Ok(id)
    }

    /// Remove the subtree rooted at `id`; returns every removed id
    pub(crate) fn detach(&mut self, id: &NodeId) -> Result<Vec<NodeId>, WorkspaceError> {
        if id == &self.root {
            return Err(WorkspaceError::RootImmutable("deleted"));
        }
        let parent = self.require(id)?.parent.clone();
        let removed = self.descendants(id);
        for node in &removed {
            self.nodes.remove(node);
        }
        if let Some(parent_record) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent_record.children.retain(|child| child != id);
        }
        self.revision += 1;
        Ok(removed)
    }

    pub(crate) fn rename(&mut self, id: &NodeId, name: &str) -> Result<(), WorkspaceError> {
        if id == &self.root {
            return Err(WorkspaceError::RootImmutable("renamed"));
        }
        let record = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| WorkspaceError::missing(id))?;
        record.name = name.to_string();
        self.revision += 1;
        Ok(())
    }

    pub(crate) fn set_content(&mut self, id: &NodeId, content: &str) -> Result<(), WorkspaceError> {
        self.require_file(id)?;
        if let Some(record) = self.nodes.get_mut(id) {
            record.content = Some(content.to_string());
        }
        self.revision += 1;
        Ok(())
    }

    /// Replace the children of `dir` wholesale; returns the removed ids.
    ///
    /// Incoming nodes may reuse ids of the subtrees being replaced.
    pub(crate) fn replace_children(
        &mut self,
        dir: &NodeId,
        children: Vec<Node>,
    ) -> Result<Vec<NodeId>, WorkspaceError> {
        let old_children = self.require_directory(dir)?.children.clone();
        let outgoing: HashSet<NodeId> = old_children
            .iter()
            .flat_map(|child| self.descendants(child))
            .collect();
        let mut incoming = HashSet::new();
        for child in &children {
            child.validate_shape().map_err(WorkspaceError::InvalidNode)?;
            collect_ids(child, &mut incoming)?;
        }
        if let Some(taken) = incoming
            .iter()
            .find(|id| self.nodes.contains_key(*id) && !outgoing.contains(*id))
        {
            return Err(WorkspaceError::DuplicateId((*taken).clone()));
        }

        for node in &outgoing {
            self.nodes.remove(node);
        }
        let mut new_ids = Vec::with_capacity(children.len());
        for child in children {
            new_ids.push(self.insert_subtree(Some(dir.clone()), child));
        }
        if let Some(record) = self.nodes.get_mut(dir) {
            record.children = new_ids;
        }
        self.revision += 1;

        let removed = outgoing
            .into_iter()
            .filter(|id| !self.nodes.contains_key(id))
            .collect();
        Ok(removed)
    }

    pub(crate) fn set_open(&mut self, dir: &NodeId, open: bool) -> Result<(), WorkspaceError> {
        self.require_directory(dir)?;
        if let Some(record) = self.nodes.get_mut(dir) {
            record.is_open = open;
        }
        self.revision += 1;
        Ok(())
    }

    pub(crate) fn collapse_all(&mut self) {
        for record in self.nodes.values_mut() {
            if record.is_directory() {
                record.is_open = false;
            }
        }
        self.revision += 1;
    }

    fn insert_subtree(&mut self, parent: Option<NodeId>, node: Node) -> NodeId {
        let id = node.id.clone();
        let mut child_ids = Vec::new();
        for child in node.children.into_iter().flatten() {
            child_ids.push(self.insert_subtree(Some(id.clone()), child));
        }
        let record = match node.kind {
            NodeKind::File => NodeRecord {
                id: id.clone(),
                name: node.name,
                kind: NodeKind::File,
                content: Some(node.content.unwrap_or_default()),
                children: Vec::new(),
                parent,
                is_open: false,
            },
            NodeKind::Directory => NodeRecord {
                id: id.clone(),
                name: node.name,
                kind: NodeKind::Directory,
                content: None,
                children: child_ids,
                parent,
                is_open: node.is_open.unwrap_or(false),
            },
        };
        self.nodes.insert(id.clone(), record);
        id
    }
}

fn collect_ids(node: &Node, seen: &mut HashSet<NodeId>) -> Result<(), WorkspaceError> {
    if !seen.insert(node.id.clone()) {
        return Err(WorkspaceError::DuplicateId(node.id.clone()));
    }
    for child in node.children.iter().flatten() {
        collect_ids(child, seen)?;
    }
    Ok(())
}
