//! Structure updates pushed by the backend shell
//!
//! The backend reports scaffolded projects, files written by tools, and fresh
//! directory listings after a command. Every client receives these from the
//! backend directly, so they are applied as remote events and never announced.
//! Nodes created here get ids derived from their parent id and name, so every
//! client ends up with the same ids without exchanging them.

use super::ops::MutationSource;
use super::state::Workspace;
use crate::error::WorkspaceError;
use crate::sync::protocol::StructureUpdate;
use crate::tree::{Node, NodeRecord, PathResolver};
use crate::types::NodeId;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Directory names that a listing always reports as directories
const DIRECTORY_HINTS: &[&str] = &["node_modules"];

/// What a structure update changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureChange {
    ProjectCreated { root: NodeId, files: usize },
    FileUpdated { file: NodeId },
    DirectoryReconciled { dir: NodeId, added: usize, dropped: usize },
}

impl Workspace {
    pub fn apply_structure_update(
        &mut self,
        update: &StructureUpdate,
    ) -> Result<StructureChange, WorkspaceError> {
        match update {
            StructureUpdate::ProjectCreated {
                path,
                root_id,
                templates,
                ..
            } => self.scaffold_project(path, root_id, templates),
            StructureUpdate::FileUpdated { path, content, .. } => {
                let file = self.locate(path, |record| record.is_file())?;
                self.update_file_content(&file, content, MutationSource::RemoteEvent)?;
                Ok(StructureChange::FileUpdated { file })
            }
            StructureUpdate::DirectoryUpdated { path, children } => {
                let dir = self.locate(path, |record| record.is_directory())?;
                self.reconcile_listing(&dir, children)
            }
        }
    }

    fn scaffold_project(
        &mut self,
        path: &str,
        root_id: &NodeId,
        templates: &BTreeMap<String, serde_json::Value>,
    ) -> Result<StructureChange, WorkspaceError> {
        let name = path.trim_matches('/');
        let mut project = Node::directory(name, Vec::new()).with_id(root_id.clone());
        project.is_open = Some(true);
        let root = self.root_id().clone();
        let project_id = self
            .create_directory(&root, project, MutationSource::RemoteEvent)?
            .value;

        let mut files = 0;
        for (relative, value) in templates {
            let content = match value {
                serde_json::Value::String(text) => text.clone(),
                other => serde_json::to_string_pretty(other)
                    .map_err(|e| WorkspaceError::InvalidNode(e.to_string()))?,
            };
            self.write_template(&project_id, relative, content)?;
            files += 1;
        }
        info!(project = name, files, "Scaffolded project from backend");
        Ok(StructureChange::ProjectCreated {
            root: project_id,
            files,
        })
    }

    /// Write `content` at `relative` below `base`, creating directories on the way
    fn write_template(
        &mut self,
        base: &NodeId,
        relative: &str,
        content: String,
    ) -> Result<(), WorkspaceError> {
        let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
        let Some((file_name, dirs)) = segments.split_last() else {
            return Ok(());
        };
        let mut current = base.clone();
        for dir in dirs {
            current = match self.tree.child_named(&current, dir) {
                Some(existing) if existing.is_directory() => existing.id.clone(),
                _ => {
                    let id = self.derived_id(&current, dir, &HashSet::new());
                    let mut node = Node::directory(*dir, Vec::new()).with_id(id);
                    node.is_open = Some(true);
                    self.tree.attach(&current, node)?
                }
            };
        }
        match self.tree.child_named(&current, file_name) {
            Some(existing) if existing.is_file() => {
                let id = existing.id.clone();
                self.tree.set_content(&id, &content)?;
                self.refresh_buffer(&id, |buffer| buffer.content = Some(content.clone()));
            }
            _ => {
                let id = self.derived_id(&current, file_name, &HashSet::new());
                self.tree
                    .attach(&current, Node::file(*file_name, content).with_id(id))?;
            }
        }
        Ok(())
    }

    /// Replace a directory's children with a name listing, keeping the nodes
    /// (and ids) of names that survive.
    fn reconcile_listing(
        &mut self,
        dir: &NodeId,
        names: &[String],
    ) -> Result<StructureChange, WorkspaceError> {
        let existing: Vec<NodeId> = self
            .tree
            .children(dir)?
            .iter()
            .map(|record| record.id.clone())
            .collect();
        let mut children = Vec::with_capacity(names.len());
        let mut minted = HashSet::new();
        let mut added = 0;
        for name in names {
            match self.tree.child_named(dir, name) {
                Some(record) => children.push(self.tree.to_node(&record.id.clone())?),
                None => {
                    added += 1;
                    let id = self.derived_id(dir, name, &minted);
                    minted.insert(id.clone());
                    let node = if DIRECTORY_HINTS.contains(&name.as_str()) {
                        Node::directory(name.clone(), Vec::new())
                    } else {
                        Node::file(name.clone(), "")
                    };
                    children.push(node.with_id(id));
                }
            }
        }
        let kept = children.len() - added;
        let dropped = existing.len().saturating_sub(kept);
        self.update_directory(dir, children, MutationSource::RemoteEvent)?;
        debug!(dir_id = %dir, added, dropped, "Reconciled directory listing");
        Ok(StructureChange::DirectoryReconciled {
            dir: dir.clone(),
            added,
            dropped,
        })
    }

    /// `<parent>/<name>`, suffixed with `~n` while that id is already in use.
    fn derived_id(&self, parent: &NodeId, name: &str, reserved: &HashSet<NodeId>) -> NodeId {
        let base = format!("{}/{}", parent, name);
        let mut candidate = NodeId::from(base.clone());
        let mut n = 1;
        while self.tree.contains(&candidate) || reserved.contains(&candidate) {
            candidate = NodeId::from(format!("{}~{}", base, n));
            n += 1;
        }
        candidate
    }

    /// Resolve a backend path; falls back to the first node whose name is the
    /// path's last segment, which is how the backend addresses top-level
    /// project files.
    fn locate<F>(&self, path: &str, accept: F) -> Result<NodeId, WorkspaceError>
    where
        F: Fn(&NodeRecord) -> bool,
    {
        let resolver = PathResolver::new(&self.tree);
        if let Ok(record) = resolver.lookup(path) {
            if accept(record) {
                return Ok(record.id.clone());
            }
        }
        let name = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
        self.tree
            .descendants(self.tree.root_id())
            .iter()
            .filter_map(|id| self.tree.get(id))
            .find(|record| record.name == name && accept(record))
            .map(|record| record.id.clone())
            .ok_or_else(|| WorkspaceError::NotFound(path.to_string()))
    }
}
