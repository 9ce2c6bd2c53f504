//! Workspace tree: wire nodes, the arena model, and path resolution.

pub mod model;
pub mod naming;
pub mod node;
pub mod path;

pub use model::{NodeRecord, TreeModel};
pub use node::{Node, NodeKind};
pub use path::PathResolver;
