//! coshell: shared workspace tree synchronization and terminal dispatch
//!
//! Every participant of a collaborative session keeps its own copy of the
//! project tree and applies the same mutations in the same way, whether they
//! were typed locally or arrived from a peer. Terminal input is resolved
//! against that tree when it can be and forwarded to a backend shell when it
//! cannot.

pub mod config;
pub mod error;
pub mod logging;
pub mod sync;
pub mod terminal;
pub mod tooling;
pub mod tree;
pub mod types;
pub mod workspace;
