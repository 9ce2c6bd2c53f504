//! Workspace state: the tree plus the OpenFiles / ActiveFile projections.

use crate::error::WorkspaceError;
use crate::sync::protocol::FileStructureSync;
use crate::tree::{Node, TreeModel};
use crate::types::{NodeId, SocketId};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Workspace shared between the sync layer and the terminal of one client
pub type SharedWorkspace = Arc<RwLock<Workspace>>;

/// The workspace of one client.
///
/// Open files are buffer copies of file nodes; their content is re-synced from
/// the tree when a file gains focus. The active file is referenced by id and
/// always points into the open files.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub(crate) tree: TreeModel,
    pub(crate) open_files: Vec<Node>,
    pub(crate) active_file: Option<NodeId>,
}

impl Workspace {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            tree: TreeModel::new(root_name),
            open_files: Vec::new(),
            active_file: None,
        }
    }

    /// Build a workspace from a received snapshot, validating the tree first
    pub fn from_snapshot(
        file_structure: &Node,
        open_files: &[Node],
        active_file: Option<&Node>,
    ) -> Result<Self, WorkspaceError> {
        let tree = TreeModel::from_node(file_structure)?;
        let mut workspace = Self {
            tree,
            open_files: open_files.iter().filter(|n| n.is_file()).cloned().collect(),
            active_file: None,
        };
        if let Some(active) = active_file {
            if !workspace.is_open(&active.id) && active.is_file() {
                workspace.open_files.push(active.clone());
            }
            workspace.active_file = Some(active.id.clone());
        }
        let pruned = workspace.prune_stale_references();
        if !pruned.is_empty() {
            warn!(count = pruned.len(), "Snapshot referenced files missing from its tree");
        }
        Ok(workspace)
    }

    pub fn into_shared(self) -> SharedWorkspace {
        Arc::new(RwLock::new(self))
    }

    pub fn tree(&self) -> &TreeModel {
        &self.tree
    }

    pub fn root_id(&self) -> &NodeId {
        self.tree.root_id()
    }

    pub fn open_files(&self) -> &[Node] {
        &self.open_files
    }

    pub fn active_file_id(&self) -> Option<&NodeId> {
        self.active_file.as_ref()
    }

    pub fn active_file(&self) -> Option<&Node> {
        self.active_file
            .as_ref()
            .and_then(|id| self.open_files.iter().find(|f| &f.id == id))
    }

    pub fn is_open(&self, id: &NodeId) -> bool {
        self.open_files.iter().any(|f| &f.id == id)
    }

    /// Focus a file: add it to the open files if needed and re-sync its
    /// buffer from the tree.
    pub fn open_file(&mut self, id: &NodeId) -> Result<(), WorkspaceError> {
        self.tree.require_file(id)?;
        let fresh = self.tree.to_node(id)?;
        match self.open_files.iter_mut().find(|f| &f.id == id) {
            Some(buffer) => *buffer = fresh,
            None => self.open_files.push(fresh),
        }
        self.active_file = Some(id.clone());
        debug!(file_id = %id, "Opened file");
        Ok(())
    }

    /// Close a file; if it was active, focus moves to the previous neighbour,
    /// else the next one, else nothing.
    pub fn close_file(&mut self, id: &NodeId) {
        let Some(index) = self.open_files.iter().position(|f| &f.id == id) else {
            return;
        };
        if self.active_file.as_ref() == Some(id) {
            self.active_file = if index > 0 {
                Some(self.open_files[index - 1].id.clone())
            } else {
                self.open_files.get(index + 1).map(|f| f.id.clone())
            };
        }
        self.open_files.remove(index);
    }

    /// Flip the expansion flag of a directory; returns the new state
    pub fn toggle_directory(&mut self, id: &NodeId) -> Result<bool, WorkspaceError> {
        let open = !self.tree.require_directory(id)?.is_open;
        self.tree.set_open(id, open)?;
        Ok(open)
    }

    pub fn collapse_directories(&mut self) {
        self.tree.collapse_all();
    }

    /// Full state addressed to one late joiner
    pub fn snapshot_for(&self, socket_id: SocketId) -> FileStructureSync {
        FileStructureSync {
            file_structure: self.tree.snapshot(),
            open_files: self.open_files.clone(),
            active_file: self.active_file().cloned(),
            socket_id,
        }
    }

    /// Replace the whole state with a received snapshot.
    ///
    /// The snapshot is validated before anything is swapped in.
    pub fn replace_with(&mut self, sync: &FileStructureSync) -> Result<(), WorkspaceError> {
        let next = Workspace::from_snapshot(
            &sync.file_structure,
            &sync.open_files,
            sync.active_file.as_ref(),
        )?;
        *self = next;
        Ok(())
    }

    /// Drop open files and the active file that no longer exist in the tree
    pub fn prune_stale_references(&mut self) -> Vec<NodeId> {
        let stale: HashSet<NodeId> = self
            .open_files
            .iter()
            .filter(|f| self.tree.require_file(&f.id).is_err())
            .map(|f| f.id.clone())
            .chain(
                self.active_file
                    .iter()
                    .filter(|id| self.tree.require_file(id).is_err())
                    .cloned(),
            )
            .collect();
        if self
            .active_file
            .as_ref()
            .map(|id| !self.is_open(id))
            .unwrap_or(false)
        {
            self.active_file = None;
        }
        self.evict(&stale);
        stale.into_iter().collect()
    }

    /// Remove the given ids from the open files and clear the active file if
    /// it is among them.
    pub(crate) fn evict(&mut self, ids: &HashSet<NodeId>) {
        if ids.is_empty() {
            return;
        }
        self.open_files.retain(|f| !ids.contains(&f.id));
        if self
            .active_file
            .as_ref()
            .map(|id| ids.contains(id))
            .unwrap_or(false)
        {
            self.active_file = None;
        }
    }

    pub(crate) fn clear_open_files(&mut self) {
        self.open_files.clear();
        self.active_file = None;
    }

    pub(crate) fn refresh_buffer<F>(&mut self, id: &NodeId, update: F)
    where
        F: FnOnce(&mut Node),
    {
        if let Some(buffer) = self.open_files.iter_mut().find(|f| &f.id == id) {
            update(buffer);
        }
    }
}
