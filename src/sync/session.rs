//! Late-joiner synchronisation.
//!
//! A present client answers every `user-joined` with one full snapshot
//! addressed to the newcomer. A joining client replaces its whole state with
//! the first valid snapshot it receives and ignores any later one.

use crate::error::{TransportError, WorkspaceError};
use crate::sync::notice::{publish, Notice};
use crate::sync::protocol::{Envelope, FileStructureSync, ProtocolEvent, Recipient};
use crate::sync::transport::EventTransport;
use crate::types::{RemoteUser, SocketId};
use crate::workspace::SharedWorkspace;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// The snapshot listener is armed
    AwaitingSnapshot,
    /// A snapshot was applied, or this client started the room
    Synced,
}

pub struct SessionSyncHandler {
    workspace: SharedWorkspace,
    transport: Arc<dyn EventTransport>,
    socket_id: SocketId,
    state: watch::Sender<SyncState>,
    users: Mutex<Vec<RemoteUser>>,
    notices: broadcast::Sender<Notice>,
}

impl SessionSyncHandler {
    pub fn new(
        workspace: SharedWorkspace,
        transport: Arc<dyn EventTransport>,
        socket_id: SocketId,
        notices: broadcast::Sender<Notice>,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::AwaitingSnapshot);
        Self {
            workspace,
            transport,
            socket_id,
            state,
            users: Mutex::new(Vec::new()),
            notices,
        }
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Disarm the listener; used by the client that starts a room.
    pub fn mark_synced(&self) {
        self.state.send_replace(SyncState::Synced);
    }

    /// Participants seen joining since this client connected
    pub fn users(&self) -> Vec<RemoteUser> {
        self.users.lock().clone()
    }

    /// Another participant joined: send them the full current state.
    ///
    /// Only a synced client answers; one still waiting for its own snapshot
    /// would hand out an empty tree.
    pub fn on_user_joined(&self, user: &RemoteUser) -> Result<(), TransportError> {
        if user.socket_id == self.socket_id {
            return Ok(());
        }
        {
            let mut users = self.users.lock();
            users.retain(|u| u.socket_id != user.socket_id);
            users.push(user.clone());
        }
        publish(
            &self.notices,
            Notice::UserJoined {
                username: user.username.clone(),
            },
        );

        if self.state() != SyncState::Synced {
            debug!(peer = %user.socket_id, "Not synced yet, leaving the snapshot to synced peers");
            return Ok(());
        }
        let snapshot = self.workspace.read().snapshot_for(user.socket_id.clone());
        let nodes = snapshot.file_structure.count();
        self.transport.emit(Envelope::new(
            self.socket_id.clone(),
            Recipient::Peer(user.socket_id.clone()),
            ProtocolEvent::SyncFileStructure(snapshot),
        ))?;
        info!(peer = %user.socket_id, username = %user.username, nodes, "Sent workspace snapshot");
        Ok(())
    }

    /// Apply a received snapshot.
    ///
    /// Returns `Ok(false)` when the snapshot was ignored (already synced, or
    /// addressed to someone else). An invalid snapshot leaves the listener
    /// armed.
    pub fn on_snapshot(&self, sync: &FileStructureSync) -> Result<bool, WorkspaceError> {
        if self.state() == SyncState::Synced {
            debug!(socket_id = %self.socket_id, "Ignoring snapshot, already synced");
            return Ok(false);
        }
        if sync.socket_id != self.socket_id {
            debug!(target = %sync.socket_id, "Ignoring snapshot addressed to another peer");
            return Ok(false);
        }
        if let Err(err) = self.workspace.write().replace_with(sync) {
            warn!(error = %err, "Rejected invalid snapshot");
            return Err(err);
        }
        self.state.send_replace(SyncState::Synced);
        let nodes = sync.file_structure.count();
        info!(nodes, open_files = sync.open_files.len(), "Applied workspace snapshot");
        publish(&self.notices, Notice::SnapshotApplied { nodes });
        Ok(true)
    }

    /// Wait until a snapshot was applied; `false` when `timeout` elapsed first.
    pub async fn wait_for_snapshot(&self, timeout: Duration) -> bool {
        let mut rx = self.state.subscribe();
        let synced = async move {
            loop {
                if *rx.borrow_and_update() == SyncState::Synced {
                    return true;
                }
                if rx.changed().await.is_err() {
                    return false;
                }
            }
        };
        tokio::time::timeout(timeout, synced).await.unwrap_or(false)
    }
}
