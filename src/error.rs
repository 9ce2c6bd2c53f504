//! Error types
//!
//! Each domain carries its own error enum; `ApiError` unifies them for callers
//! that drive a whole client (routing, CLI).

use crate::types::NodeId;
use thiserror::Error;

/// Errors raised by tree mutations and lookups
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("Node not found: {0}")]
    NotFound(String),

    #[error("Parent directory not found: {0}")]
    ParentNotFound(NodeId),

    #[error("A directory named '{name}' already exists here")]
    NameConflict { name: String },

    #[error("Node id already present in tree: {0}")]
    DuplicateId(NodeId),

    #[error("Invalid node: {0}")]
    InvalidNode(String),

    #[error("The workspace root cannot be {0}")]
    RootImmutable(&'static str),

    #[error("Stale reference to node {0}")]
    StaleReference(NodeId),
}

impl WorkspaceError {
    /// NotFound for an id lookup
    pub fn missing(id: &NodeId) -> Self {
        WorkspaceError::NotFound(id.to_string())
    }

    /// Whether the condition is recovered locally and shown to the user
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, WorkspaceError::InvalidNode(_) | WorkspaceError::DuplicateId(_))
    }
}

/// Errors raised by the event transport
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Transport is not connected")]
    Disconnected,

    #[error("No such peer: {0}")]
    UnknownPeer(String),

    #[error("Failed to encode event: {0}")]
    Encode(String),

    #[error("Failed to decode event: {0}")]
    Decode(String),
}

/// Errors raised by the terminal dispatcher
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TerminalError {
    #[error("No such file or directory: {0}")]
    NoSuchPath(String),

    #[error("Invalid directory")]
    InvalidDirectory,

    #[error("Backend shell is not connected")]
    TransportUnavailable,

    #[error("Too many pending commands (limit {limit})")]
    QueueFull { limit: usize },

    #[error("Command timed out after {millis}ms: {command}")]
    Timeout { command: String, millis: u64 },

    #[error("Terminal input channel closed")]
    InputClosed,
}

/// Top-level error for client orchestration and tooling
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Terminal(#[from] TerminalError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
