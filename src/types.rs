//! Core identifier types shared by the tree, sync and terminal layers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// NodeId: opaque identifier of a file or directory node.
///
/// Locally created nodes get a fresh v4 uuid. Ids received from peers are
/// kept verbatim, so any string is a valid id on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Generate a fresh, globally unique id
    pub fn generate() -> Self {
        NodeId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        NodeId(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        NodeId(value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SocketId: transport-level identity of one connected participant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocketId(String);

impl SocketId {
    pub fn new(value: impl Into<String>) -> Self {
        SocketId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Participant connection status as reported by the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Online,
    Offline,
}

/// A participant of the shared session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    pub username: String,
    pub room_id: String,
    pub socket_id: SocketId,
    #[serde(default)]
    pub status: UserStatus,
}

impl RemoteUser {
    pub fn new(username: impl Into<String>, room_id: impl Into<String>, socket_id: SocketId) -> Self {
        Self {
            username: username.into(),
            room_id: room_id.into(),
            socket_id,
            status: UserStatus::Online,
        }
    }
}
