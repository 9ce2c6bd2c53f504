//! CLI Tooling
//!
//! Inspect workspace snapshots (the payload of a `sync-file-structure`
//! event, or a bare tree node) and drive a terminal against them without a
//! backend.

use crate::config::{ConfigLoader, CoshellConfig};
use crate::error::ApiError;
use crate::sync::protocol::{FileStructureSync, ProtocolEvent};
use crate::sync::transport::DisconnectedTransport;
use crate::terminal::{BufferSink, Submission, TerminalDispatcher, TerminalSettings};
use crate::tree::Node;
use crate::types::SocketId;
use crate::workspace::{
    build_workspace_stats, format_section_heading, format_stats_text, format_tree_text,
    format_validate_result_text, validate_snapshot, Workspace,
};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Socket id used for snapshots loaded from disk
const CLI_SOCKET: &str = "cli";

/// coshell - shared workspace tree and terminal dispatch
#[derive(Parser)]
#[command(name = "coshell")]
#[command(about = "Inspect shared workspace snapshots and run terminal commands against them")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project directory (searched for .coshell.toml)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Print the tree of a snapshot
    Tree {
        #[arg(long)]
        snapshot: PathBuf,
        /// Hide the contents of collapsed directories
        #[arg(long)]
        collapsed: bool,
    },
    /// Show node counts and depth of a snapshot
    Stats {
        #[arg(long)]
        snapshot: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Include per top-level directory node counts
        #[arg(long)]
        breakdown: bool,
    },
    /// Check a snapshot for structural problems
    Validate {
        #[arg(long)]
        snapshot: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Run terminal lines against a snapshot with no backend attached
    Exec {
        /// Start from this snapshot instead of an empty workspace
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Lines to run, in order
        #[arg(last = true)]
        lines: Vec<String>,
    },
}

/// Accepted snapshot file shapes
#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Event(ProtocolEvent),
    Sync(FileStructureSync),
    Tree(Node),
}

/// CLI context holding the resolved configuration
pub struct CliContext {
    config: CoshellConfig,
}

impl CliContext {
    /// Load configuration from `config_path`, or layered around `project_dir`.
    pub fn new(project_dir: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&project_dir)?,
        };
        Ok(Self { config })
    }

    pub fn with_config(config: CoshellConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CoshellConfig {
        &self.config
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        debug!(?command, "Executing command");
        match command {
            Commands::Tree {
                snapshot,
                collapsed,
            } => {
                let workspace = workspace_from(&load_snapshot(snapshot)?)?;
                Ok(format_tree_text(workspace.tree(), *collapsed))
            }
            Commands::Stats {
                snapshot,
                format,
                breakdown,
            } => {
                let workspace = workspace_from(&load_snapshot(snapshot)?)?;
                let stats = build_workspace_stats(&workspace, *breakdown);
                match format.as_str() {
                    "json" => Ok(serde_json::to_string_pretty(&stats)?),
                    "text" => Ok(format!(
                        "{}\n{}",
                        format_section_heading("Workspace"),
                        format_stats_text(&stats)
                    )),
                    other => Err(invalid_format(other)),
                }
            }
            Commands::Validate { snapshot, format } => {
                let result = validate_snapshot(&load_snapshot(snapshot)?);
                match format.as_str() {
                    "json" => Ok(serde_json::to_string_pretty(&result)?),
                    "text" => Ok(format_validate_result_text(&result)),
                    other => Err(invalid_format(other)),
                }
            }
            Commands::Exec { snapshot, lines } => {
                let workspace = match snapshot {
                    Some(path) => workspace_from(&load_snapshot(path)?)?,
                    None => Workspace::new(self.config.workspace.root_name.clone()),
                };
                self.exec(workspace, lines)
            }
        }
    }

    /// Echo each line after the prompt, followed by whatever it printed.
    fn exec(&self, workspace: Workspace, lines: &[String]) -> Result<String, ApiError> {
        let mut dispatcher = TerminalDispatcher::new(
            workspace.into_shared(),
            Arc::new(DisconnectedTransport),
            SocketId::new(CLI_SOCKET),
            TerminalSettings::from(&self.config.terminal),
            BufferSink::new(),
        );
        let mut transcript = String::new();
        for line in lines {
            transcript.push_str(&dispatcher.prompt());
            transcript.push_str(line);
            transcript.push('\n');
            match dispatcher.submit(line) {
                Ok(Submission::Ignored) => {}
                Ok(outcome) => debug!(?outcome, line = %line, "Line handled"),
                Err(err) => debug!(error = %err, line = %line, "Line failed"),
            }
            transcript.push_str(&dispatcher.sink_mut().take().replace("\r\n", "\n"));
        }
        info!(lines = lines.len(), "Exec finished");
        Ok(transcript.trim_end().to_string())
    }
}

fn invalid_format(format: &str) -> ApiError {
    ApiError::ConfigError(format!(
        "Invalid output format: {} (must be 'text' or 'json')",
        format
    ))
}

/// Read a snapshot file in any accepted shape.
pub fn load_snapshot(path: &Path) -> Result<FileStructureSync, ApiError> {
    let raw = std::fs::read_to_string(path)?;
    parse_snapshot(&raw)
}

fn parse_snapshot(raw: &str) -> Result<FileStructureSync, ApiError> {
    let sync = match serde_json::from_str::<SnapshotFile>(raw)? {
        SnapshotFile::Event(ProtocolEvent::SyncFileStructure(sync)) | SnapshotFile::Sync(sync) => {
            sync
        }
        SnapshotFile::Event(other) => {
            return Err(ApiError::ConfigError(format!(
                "Expected a sync-file-structure event, found {}",
                other.name()
            )))
        }
        SnapshotFile::Tree(node) => FileStructureSync {
            file_structure: node,
            open_files: Vec::new(),
            active_file: None,
            socket_id: SocketId::new(CLI_SOCKET),
        },
    };
    Ok(sync)
}

fn workspace_from(sync: &FileStructureSync) -> Result<Workspace, ApiError> {
    Ok(Workspace::from_snapshot(
        &sync.file_structure,
        &sync.open_files,
        sync.active_file.as_ref(),
    )?)
}
