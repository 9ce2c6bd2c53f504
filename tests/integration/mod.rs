//! Integration tests for collaborative workspace sync and terminal dispatch

mod collaboration;
mod support;
mod terminal_session;
mod tree_properties;
