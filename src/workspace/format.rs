//! Format workspace trees, stats, and validation results as text.

use crate::tree::{NodeKind, NodeRecord, TreeModel};
use crate::types::NodeId;
use crate::workspace::types::{ValidateResult, WorkspaceStats};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// Format the tree as an indented listing, directories suffixed with `/`.
///
/// Collapsed directories are still expanded unless `respect_collapsed` is set.
pub fn format_tree_text(tree: &TreeModel, respect_collapsed: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", tree.root().name.bold()));
    write_children(tree, tree.root_id(), "", respect_collapsed, &mut out);
    out
}

fn write_children(
    tree: &TreeModel,
    dir: &NodeId,
    prefix: &str,
    respect_collapsed: bool,
    out: &mut String,
) {
    let children = tree.children(dir).unwrap_or_default();
    let last = children.len().saturating_sub(1);
    for (index, child) in children.into_iter().enumerate() {
        let (branch, indent) = if index == last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        out.push_str(prefix);
        out.push_str(branch);
        out.push_str(&entry_label(child));
        out.push('\n');
        if child.is_directory() && (child.is_open || !respect_collapsed) {
            let nested = format!("{}{}", prefix, indent);
            write_children(tree, &child.id, &nested, respect_collapsed, out);
        }
    }
}

fn entry_label(record: &NodeRecord) -> String {
    match record.kind {
        NodeKind::Directory => format!("{}/", record.name).blue().to_string(),
        NodeKind::File => record.name.clone(),
    }
}

/// Format workspace stats as human-readable text.
pub fn format_stats_text(stats: &WorkspaceStats) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Workspace")));
    out.push_str(&format!("  Root: {}\n", stats.root_name));
    out.push_str(&format!("  Revision: {}\n", stats.revision));
    out.push_str(&format!("  Total nodes: {}\n", stats.total_nodes));
    out.push_str(&format!(
        "  Files: {}  Directories: {}\n",
        stats.files, stats.directories
    ));
    out.push_str(&format!("  Depth: {}\n", stats.depth));
    out.push_str(&format!("  Content: {} bytes\n", stats.content_bytes));
    out.push_str(&format!("  Open files: {}\n", stats.open_files));
    if let Some(ref active) = stats.active_file {
        out.push_str(&format!("  Active file: {}\n", active));
    }
    if let Some(ref breakdown) = stats.breakdown {
        out.push('\n');
        out.push_str(&format!(
            "{}\n\n",
            format_section_heading("Top-level breakdown")
        ));
        if breakdown.is_empty() {
            out.push_str("  (empty)\n");
            return out;
        }
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Path", "Nodes"]);
        for row in breakdown {
            table.add_row(vec![row.path.clone(), row.nodes.to_string()]);
        }
        out.push_str(&format!("{}\n", table));
    }
    out
}

pub fn format_validate_result_text(result: &ValidateResult) -> String {
    if result.errors.is_empty() && result.warnings.is_empty() {
        return format!(
            "Validation passed:\n  Nodes: {}\n  All checks passed",
            result.node_count
        );
    }
    let heading = if result.valid {
        "Validation passed with warnings"
    } else {
        "Validation failed"
    };
    let mut s = format!("{}:\n  Nodes: {}", heading, result.node_count);
    if !result.errors.is_empty() {
        s.push_str(&format!("\n\nErrors ({}):", result.errors.len()));
        for e in &result.errors {
            s.push_str(&format!("\n  - {}", e));
        }
    }
    if !result.warnings.is_empty() {
        s.push_str(&format!("\n\nWarnings ({}):", result.warnings.len()));
        for w in &result.warnings {
            s.push_str(&format!("\n  - {}", w));
        }
    }
    s
}
