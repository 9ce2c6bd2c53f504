//! Workspace domain: client state, tree mutations, backend structure updates,
//! and inspection reports.

mod backend;
mod format;
mod ops;
mod section;
mod state;
mod types;

pub use backend::StructureChange;
pub use format::{
    format_section_heading, format_stats_text, format_tree_text, format_validate_result_text,
};
pub use ops::{Applied, MutationSource, NewEntry};
pub use section::{build_workspace_stats, validate_snapshot};
pub use state::{SharedWorkspace, Workspace};
pub use types::{PathCount, ValidateResult, WorkspaceStats};
