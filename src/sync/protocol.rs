//! Protocol events exchanged between clients, the relay, and the backend shell
//!
//! Encoded as `{"event": "<name>", "payload": {...}}` with camelCase payload keys.

use crate::error::TransportError;
use crate::tree::Node;
use crate::types::{NodeId, RemoteUser, SocketId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryCreated {
    pub parent_dir_id: NodeId,
    pub new_directory: Node,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUpdated {
    pub dir_id: NodeId,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryRenamed {
    pub dir_id: NodeId,
    pub new_dir_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryDeleted {
    pub dir_id: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCreated {
    pub parent_dir_id: NodeId,
    pub new_file: Node,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpdated {
    pub file_id: NodeId,
    #[serde(alias = "content")]
    pub new_content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRenamed {
    pub file_id: NodeId,
    pub new_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDeleted {
    pub file_id: NodeId,
}

/// Full workspace state handed to a late joiner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStructureSync {
    pub file_structure: Node,
    pub open_files: Vec<Node>,
    pub active_file: Option<Node>,
    pub socket_id: SocketId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserJoined {
    pub user: RemoteUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalCommand {
    pub command: String,
    pub cwd: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalOutput {
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TerminalReady {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalFailure {
    pub error: String,
}

/// Out-of-band signal names understood by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    #[serde(rename = "SIGINT")]
    Interrupt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalSignal {
    pub signal: Signal,
    pub project_path: String,
}

/// Structure changes produced by the backend shell (project scaffolding,
/// files written by tools, directory listings after a command).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StructureUpdate {
    #[serde(rename = "project:created", rename_all = "camelCase")]
    ProjectCreated {
        path: String,
        #[serde(default)]
        parent_path: Option<String>,
        root_id: NodeId,
        #[serde(default)]
        templates: BTreeMap<String, serde_json::Value>,
    },
    #[serde(rename = "file:updated", rename_all = "camelCase")]
    FileUpdated {
        path: String,
        #[serde(default)]
        parent_path: Option<String>,
        content: String,
    },
    #[serde(rename = "directory:updated")]
    DirectoryUpdated { path: String, children: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum ProtocolEvent {
    #[serde(rename = "directory-created")]
    DirectoryCreated(DirectoryCreated),
    #[serde(rename = "directory-updated")]
    DirectoryUpdated(DirectoryUpdated),
    #[serde(rename = "directory-renamed")]
    DirectoryRenamed(DirectoryRenamed),
    #[serde(rename = "directory-deleted")]
    DirectoryDeleted(DirectoryDeleted),
    #[serde(rename = "file-created")]
    FileCreated(FileCreated),
    #[serde(rename = "file-updated")]
    FileUpdated(FileUpdated),
    #[serde(rename = "file-renamed")]
    FileRenamed(FileRenamed),
    #[serde(rename = "file-deleted")]
    FileDeleted(FileDeleted),
    #[serde(rename = "sync-file-structure")]
    SyncFileStructure(FileStructureSync),
    #[serde(rename = "user-joined")]
    UserJoined(UserJoined),
    #[serde(rename = "terminal:command")]
    TerminalCommand(TerminalCommand),
    #[serde(rename = "terminal:output")]
    TerminalOutput(TerminalOutput),
    #[serde(rename = "terminal:ready")]
    TerminalReady(TerminalReady),
    #[serde(rename = "terminal:error")]
    TerminalError(TerminalFailure),
    #[serde(rename = "terminal:signal")]
    TerminalSignal(TerminalSignal),
    #[serde(rename = "file:structure:update")]
    StructureUpdate(StructureUpdate),
}

impl ProtocolEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolEvent::DirectoryCreated(_) => "directory-created",
            ProtocolEvent::DirectoryUpdated(_) => "directory-updated",
            ProtocolEvent::DirectoryRenamed(_) => "directory-renamed",
            ProtocolEvent::DirectoryDeleted(_) => "directory-deleted",
            ProtocolEvent::FileCreated(_) => "file-created",
            ProtocolEvent::FileUpdated(_) => "file-updated",
            ProtocolEvent::FileRenamed(_) => "file-renamed",
            ProtocolEvent::FileDeleted(_) => "file-deleted",
            ProtocolEvent::SyncFileStructure(_) => "sync-file-structure",
            ProtocolEvent::UserJoined(_) => "user-joined",
            ProtocolEvent::TerminalCommand(_) => "terminal:command",
            ProtocolEvent::TerminalOutput(_) => "terminal:output",
            ProtocolEvent::TerminalReady(_) => "terminal:ready",
            ProtocolEvent::TerminalError(_) => "terminal:error",
            ProtocolEvent::TerminalSignal(_) => "terminal:signal",
            ProtocolEvent::StructureUpdate(_) => "file:structure:update",
        }
    }

    /// Whether this is one of the incremental tree mutation events
    pub fn is_tree_mutation(&self) -> bool {
        matches!(
            self,
            ProtocolEvent::DirectoryCreated(_)
                | ProtocolEvent::DirectoryUpdated(_)
                | ProtocolEvent::DirectoryRenamed(_)
                | ProtocolEvent::DirectoryDeleted(_)
                | ProtocolEvent::FileCreated(_)
                | ProtocolEvent::FileUpdated(_)
                | ProtocolEvent::FileRenamed(_)
                | ProtocolEvent::FileDeleted(_)
        )
    }

    /// Backend-to-terminal events, if this is one
    pub fn as_backend(&self) -> Option<BackendEvent> {
        match self {
            ProtocolEvent::TerminalOutput(out) => Some(BackendEvent::Output(out.data.clone())),
            ProtocolEvent::TerminalReady(_) => Some(BackendEvent::Ready),
            ProtocolEvent::TerminalError(err) => Some(BackendEvent::Error(err.error.clone())),
            _ => None,
        }
    }
}

/// What the backend shell sends back to a terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    Output(String),
    Ready,
    Error(String),
}

impl From<BackendEvent> for ProtocolEvent {
    fn from(event: BackendEvent) -> Self {
        match event {
            BackendEvent::Output(data) => ProtocolEvent::TerminalOutput(TerminalOutput { data }),
            BackendEvent::Ready => ProtocolEvent::TerminalReady(TerminalReady {}),
            BackendEvent::Error(error) => ProtocolEvent::TerminalError(TerminalFailure { error }),
        }
    }
}

/// Addressing of an outbound event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Recipient {
    /// Every other participant of the room
    Room,
    /// One participant
    Peer(SocketId),
    /// The backend shell relay
    Backend,
}

/// An addressed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: SocketId,
    pub to: Recipient,
    pub event: ProtocolEvent,
}

impl Envelope {
    pub fn new(from: SocketId, to: Recipient, event: ProtocolEvent) -> Self {
        Self { from, to, event }
    }

    pub fn to_json(&self) -> Result<String, TransportError> {
        serde_json::to_string(self).map_err(|e| TransportError::Encode(e.to_string()))
    }

    pub fn from_json(raw: &str) -> Result<Self, TransportError> {
        serde_json::from_str(raw).map_err(|e| TransportError::Decode(e.to_string()))
    }
}
