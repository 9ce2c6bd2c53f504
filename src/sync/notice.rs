//! User-facing notices published for UI consumers.

use crate::types::NodeId;
use std::fmt;
use tokio::sync::broadcast;

/// Capacity of the notice channel; slow subscribers lose the oldest notices.
pub const NOTICE_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    UserJoined { username: String },
    FilesAndFoldersUpdated,
    FileDeleted { file_id: NodeId },
    SnapshotApplied { nodes: usize },
    Problem { message: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::UserJoined { username } => write!(f, "{} joined the room", username),
            Notice::FilesAndFoldersUpdated => f.write_str("Files and folders updated"),
            Notice::FileDeleted { .. } => f.write_str("File deleted successfully"),
            Notice::SnapshotApplied { nodes } => write!(f, "Workspace synced ({} nodes)", nodes),
            Notice::Problem { message } => f.write_str(message),
        }
    }
}

pub fn notice_channel() -> broadcast::Sender<Notice> {
    broadcast::channel(NOTICE_CAPACITY).0
}

/// Publish without caring whether anyone listens.
pub(crate) fn publish(notices: &broadcast::Sender<Notice>, notice: Notice) {
    let _ = notices.send(notice);
}
