//! Stats and validation reports built from a workspace or a raw snapshot.

use crate::sync::protocol::FileStructureSync;
use crate::tree::{NodeKind, TreeModel};
use crate::workspace::state::Workspace;
use crate::workspace::types::{PathCount, ValidateResult, WorkspaceStats};
use std::collections::HashMap;

/// Build stats for a workspace.
///
/// When `include_breakdown` is true, the report includes node counts per
/// top-level entry, largest first.
pub fn build_workspace_stats(workspace: &Workspace, include_breakdown: bool) -> WorkspaceStats {
    let tree = workspace.tree();
    let mut files = 0;
    let mut directories = 0;
    let mut content_bytes = 0;
    for record in tree.iter() {
        match record.kind {
            NodeKind::File => {
                files += 1;
                content_bytes += record.content.as_ref().map(|c| c.len()).unwrap_or(0);
            }
            NodeKind::Directory => directories += 1,
        }
    }
    let depth = tree
        .iter()
        .filter_map(|record| tree.lineage(&record.id).ok())
        .map(|lineage| lineage.len().saturating_sub(1))
        .max()
        .unwrap_or(0);

    let breakdown = include_breakdown.then(|| top_level_breakdown(tree));

    WorkspaceStats {
        root_name: tree.root().name.clone(),
        revision: tree.revision(),
        total_nodes: tree.len(),
        files,
        directories,
        depth,
        content_bytes,
        open_files: workspace.open_files().len(),
        active_file: workspace.active_file().map(|f| f.name.clone()),
        breakdown,
    }
}

fn top_level_breakdown(tree: &TreeModel) -> Vec<PathCount> {
    let root = tree.root_id();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for child in tree.children(root).unwrap_or_default() {
        let key = if child.is_directory() {
            format!("{}/", child.name)
        } else {
            child.name.clone()
        };
        *counts.entry(key).or_insert(0) += tree.descendants(&child.id).len();
    }
    let mut rows: Vec<PathCount> = counts
        .into_iter()
        .map(|(path, nodes)| PathCount { path, nodes })
        .collect();
    rows.sort_by(|a, b| b.nodes.cmp(&a.nodes).then_with(|| a.path.cmp(&b.path)));
    rows
}

/// Validate a received snapshot without applying it.
///
/// Structural problems are errors; open or active files missing from the
/// tree are warnings since they are pruned on apply.
pub fn validate_snapshot(sync: &FileStructureSync) -> ValidateResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let tree = match TreeModel::from_node(&sync.file_structure) {
        Ok(tree) => Some(tree),
        Err(err) => {
            errors.push(err.to_string());
            None
        }
    };

    if let Some(ref tree) = tree {
        if let Err(message) = tree.check_integrity() {
            errors.push(message);
        }
        for open in &sync.open_files {
            if tree.require_file(&open.id).is_err() {
                warnings.push(format!("Open file '{}' is not in the tree", open.name));
            }
        }
        if let Some(ref active) = sync.active_file {
            if tree.require_file(&active.id).is_err() {
                warnings.push(format!("Active file '{}' is not in the tree", active.name));
            }
        }
    }

    ValidateResult {
        valid: errors.is_empty(),
        node_count: tree.map(|t| t.len()).unwrap_or(0),
        errors,
        warnings,
    }
}
