//! Report types for workspace inspection commands.

use serde::{Deserialize, Serialize};

/// Summary of one workspace tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceStats {
    pub root_name: String,
    pub revision: u64,
    pub total_nodes: usize,
    pub files: usize,
    pub directories: usize,
    pub depth: usize,
    pub content_bytes: usize,
    pub open_files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Vec<PathCount>>,
}

/// Path and the number of nodes at or below it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathCount {
    pub path: String,
    pub nodes: usize,
}

/// Result of validating a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateResult {
    pub valid: bool,
    pub node_count: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}
