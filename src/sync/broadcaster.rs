//! SyncBroadcaster: local mutations out, remote mutations in.
//!
//! Outbound, each local intent is applied to the workspace and its
//! announcement is emitted to the room as one incremental event. Inbound,
//! each mutation event is applied as a remote event so nothing echoes back.
//! There is no ordering beyond per-sender FIFO; the last change applied to a
//! node wins.

use crate::error::WorkspaceError;
use crate::sync::notice::{publish, Notice};
use crate::sync::protocol::{Envelope, ProtocolEvent, Recipient, StructureUpdate};
use crate::sync::transport::EventTransport;
use crate::tree::Node;
use crate::types::{NodeId, SocketId};
use crate::workspace::{
    Applied, MutationSource, NewEntry, SharedWorkspace, StructureChange, Workspace,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub struct SyncBroadcaster {
    workspace: SharedWorkspace,
    transport: Arc<dyn EventTransport>,
    socket_id: SocketId,
    notices: broadcast::Sender<Notice>,
}

impl SyncBroadcaster {
    pub fn new(
        workspace: SharedWorkspace,
        transport: Arc<dyn EventTransport>,
        socket_id: SocketId,
        notices: broadcast::Sender<Notice>,
    ) -> Self {
        Self {
            workspace,
            transport,
            socket_id,
            notices,
        }
    }

    pub fn workspace(&self) -> &SharedWorkspace {
        &self.workspace
    }

    // --- local intents ---

    pub fn create_file(
        &self,
        parent: &NodeId,
        entry: impl Into<NewEntry>,
    ) -> Result<NodeId, WorkspaceError> {
        let entry = entry.into();
        self.local(|ws| ws.create_file(parent, entry, MutationSource::LocalIntent))
    }

    pub fn create_directory(
        &self,
        parent: &NodeId,
        entry: impl Into<NewEntry>,
    ) -> Result<NodeId, WorkspaceError> {
        let entry = entry.into();
        self.local(|ws| ws.create_directory(parent, entry, MutationSource::LocalIntent))
    }

    pub fn rename_file(&self, id: &NodeId, new_name: &str) -> Result<bool, WorkspaceError> {
        self.local(|ws| ws.rename_file(id, new_name, MutationSource::LocalIntent))
    }

    /// Returns `false` when a sibling directory already has `new_name`
    pub fn rename_directory(&self, id: &NodeId, new_name: &str) -> Result<bool, WorkspaceError> {
        self.local(|ws| ws.rename_directory(id, new_name, MutationSource::LocalIntent))
    }

    pub fn delete_file(&self, id: &NodeId) -> Result<(), WorkspaceError> {
        self.local(|ws| ws.delete_file(id, MutationSource::LocalIntent))?;
        publish(&self.notices, Notice::FileDeleted { file_id: id.clone() });
        Ok(())
    }

    pub fn delete_directory(&self, id: &NodeId) -> Result<(), WorkspaceError> {
        self.local(|ws| ws.delete_directory(id, MutationSource::LocalIntent))
    }

    pub fn update_directory(&self, id: &NodeId, children: Vec<Node>) -> Result<(), WorkspaceError> {
        let is_root = self.is_root(id);
        self.local(|ws| ws.update_directory(id, children, MutationSource::LocalIntent))?;
        if is_root {
            publish(&self.notices, Notice::FilesAndFoldersUpdated);
        }
        Ok(())
    }

    pub fn update_file_content(&self, id: &NodeId, content: &str) -> Result<(), WorkspaceError> {
        self.local(|ws| ws.update_file_content(id, content, MutationSource::LocalIntent))
    }

    /// Apply a local intent, release the lock, then emit its announcement.
    fn local<T, F>(&self, op: F) -> Result<T, WorkspaceError>
    where
        F: FnOnce(&mut Workspace) -> Result<Applied<T>, WorkspaceError>,
    {
        let applied = {
            let mut workspace = self.workspace.write();
            op(&mut *workspace)?
        };
        if let Some(event) = applied.announcement {
            self.announce(event);
        }
        Ok(applied.value)
    }

    fn announce(&self, event: ProtocolEvent) {
        let name = event.name();
        let envelope = Envelope::new(self.socket_id.clone(), Recipient::Room, event);
        match self.transport.emit(envelope) {
            Ok(()) => debug!(event = name, "Announced local change"),
            Err(err) => warn!(event = name, error = %err, "Local change not announced"),
        }
    }

    fn is_root(&self, id: &NodeId) -> bool {
        self.workspace.read().root_id() == id
    }

    // --- remote events ---

    /// Apply an inbound tree mutation event.
    ///
    /// Returns `Ok(false)` for events that are not tree mutations.
    pub fn apply_remote(&self, event: &ProtocolEvent) -> Result<bool, WorkspaceError> {
        let remote = MutationSource::RemoteEvent;
        match event {
            ProtocolEvent::DirectoryCreated(p) => {
                self.workspace.write().create_directory(
                    &p.parent_dir_id,
                    p.new_directory.clone(),
                    remote,
                )?;
            }
            ProtocolEvent::DirectoryUpdated(p) => {
                let is_root = self.is_root(&p.dir_id);
                self.workspace
                    .write()
                    .update_directory(&p.dir_id, p.children.clone(), remote)?;
                if is_root {
                    publish(&self.notices, Notice::FilesAndFoldersUpdated);
                }
            }
            ProtocolEvent::DirectoryRenamed(p) => {
                let renamed = self
                    .workspace
                    .write()
                    .rename_directory(&p.dir_id, &p.new_dir_name, remote)?
                    .value;
                if !renamed {
                    warn!(dir_id = %p.dir_id, name = %p.new_dir_name, "Remote directory rename collides locally");
                }
            }
            ProtocolEvent::DirectoryDeleted(p) => {
                self.workspace.write().delete_directory(&p.dir_id, remote)?;
            }
            ProtocolEvent::FileCreated(p) => {
                self.workspace
                    .write()
                    .create_file(&p.parent_dir_id, p.new_file.clone(), remote)?;
            }
            ProtocolEvent::FileUpdated(p) => {
                self.workspace
                    .write()
                    .update_file_content(&p.file_id, &p.new_content, remote)?;
            }
            ProtocolEvent::FileRenamed(p) => {
                self.workspace
                    .write()
                    .rename_file(&p.file_id, &p.new_name, remote)?;
            }
            ProtocolEvent::FileDeleted(p) => {
                self.workspace.write().delete_file(&p.file_id, remote)?;
                publish(&self.notices, Notice::FileDeleted { file_id: p.file_id.clone() });
            }
            _ => return Ok(false),
        }
        debug!(event = event.name(), "Applied remote change");
        Ok(true)
    }

    /// Apply a structure update pushed by the backend shell
    pub fn apply_structure_update(
        &self,
        update: &StructureUpdate,
    ) -> Result<StructureChange, WorkspaceError> {
        let change = self.workspace.write().apply_structure_update(update)?;
        match &change {
            StructureChange::ProjectCreated { root, files } => {
                info!(project_id = %root, files, "Backend created project");
                publish(&self.notices, Notice::FilesAndFoldersUpdated);
            }
            StructureChange::DirectoryReconciled { dir, .. } if self.is_root(dir) => {
                publish(&self.notices, Notice::FilesAndFoldersUpdated);
            }
            _ => {}
        }
        Ok(change)
    }
}
