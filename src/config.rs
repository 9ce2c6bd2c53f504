//! Configuration
//!
//! Layered with the `config` crate: built-in defaults, the global file
//! (`$XDG_CONFIG_HOME/coshell/config.toml`), the project file
//! (`<dir>/.coshell.toml`), then `COSHELL__SECTION__KEY` environment
//! variables.

pub mod facade;

pub mod merge {
    pub mod merge_policy;
    pub mod service;
}

pub mod sources {
    pub mod environment;
    pub mod global_file;
    pub mod project_file;
}

pub mod paths {
    pub mod xdg_root;
}

pub use crate::logging::LoggingConfig;
pub use facade::ConfigLoader;

use serde::{Deserialize, Serialize};

/// Name of the per-project config file
pub const PROJECT_CONFIG_FILE: &str = ".coshell.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoshellConfig {
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub terminal: TerminalConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Name given to the root directory of a fresh workspace
    #[serde(default = "default_root_name")]
    pub root_name: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root_name: default_root_name(),
        }
    }
}

/// Terminal dispatcher tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// A remote command without a readiness signal is abandoned after this
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// Identical output chunks inside this window are dropped
    #[serde(default = "default_dedup_window_ms")]
    pub dedup_window_ms: u64,

    /// Lines submitted while a command runs wait here, up to this many
    #[serde(default = "default_max_pending_commands")]
    pub max_pending_commands: usize,

    /// Period of the runtime tick that enforces the timeout
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    #[serde(default = "default_true")]
    pub highlight_urls: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: default_command_timeout_ms(),
            dedup_window_ms: default_dedup_window_ms(),
            max_pending_commands: default_max_pending_commands(),
            tick_ms: default_tick_ms(),
            highlight_urls: default_true(),
        }
    }
}

fn default_root_name() -> String {
    "root".to_string()
}

pub(crate) fn default_command_timeout_ms() -> u64 {
    120_000
}

pub(crate) fn default_dedup_window_ms() -> u64 {
    500
}

pub(crate) fn default_max_pending_commands() -> usize {
    8
}

pub(crate) fn default_tick_ms() -> u64 {
    250
}

fn default_true() -> bool {
    true
}
