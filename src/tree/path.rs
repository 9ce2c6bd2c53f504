//! Slash-separated path resolution against the tree
//!
//! `.` and the empty segment stay put, `..` moves to the parent and is clamped
//! at the root, any other segment must name an existing child.

use crate::error::WorkspaceError;
use crate::tree::model::{NodeRecord, TreeModel};
use crate::types::NodeId;

pub struct PathResolver<'a> {
    tree: &'a TreeModel,
}

impl<'a> PathResolver<'a> {
    pub fn new(tree: &'a TreeModel) -> Self {
        Self { tree }
    }

    /// Resolve a single segment relative to `from`.
    ///
    /// When `from` is a file, `..` yields its directory and named segments
    /// cannot descend further.
    pub fn step(&self, from: &NodeId, segment: &str) -> Result<&'a NodeRecord, WorkspaceError> {
        let current = self.tree.require(from)?;
        match segment {
            "" | "." => Ok(current),
            ".." => Ok(self.tree.parent_of(from).unwrap_or_else(|| self.tree.root())),
            name => {
                if current.is_file() {
                    return Err(WorkspaceError::NotFound(name.to_string()));
                }
                self.tree
                    .child_named(from, name)
                    .ok_or_else(|| WorkspaceError::NotFound(name.to_string()))
            }
        }
    }

    /// Resolve a whole path relative to `from`; a leading `/` starts at the root
    pub fn resolve(&self, from: &NodeId, path: &str) -> Result<&'a NodeRecord, WorkspaceError> {
        let (mut current, rest) = match path.strip_prefix('/') {
            Some(rest) => (self.tree.root(), rest),
            None => (self.tree.require(from)?, path),
        };
        for segment in rest.split('/') {
            current = self.step(&current.id, segment).map_err(|err| match err {
                WorkspaceError::NotFound(_) => WorkspaceError::NotFound(path.to_string()),
                other => other,
            })?;
        }
        Ok(current)
    }

    /// Resolve an absolute path, tolerating a missing leading slash
    pub fn lookup(&self, path: &str) -> Result<&'a NodeRecord, WorkspaceError> {
        let absolute = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        self.resolve(self.tree.root_id(), &absolute)
    }
}
