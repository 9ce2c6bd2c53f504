//! Tooling
//!
//! Command-line entry points over workspace snapshot files.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
