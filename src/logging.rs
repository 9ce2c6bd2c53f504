//! Logging
//!
//! Structured logging on `tracing`. Level, format, and destination come from
//! `LoggingConfig`, each overridable through `COSHELL_LOG*` environment
//! variables.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Resolve the log file path with precedence: CLI, COSHELL_LOG_FILE env, config file, default.
pub fn resolve_log_file_path(
    cli_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
) -> Result<PathBuf, ApiError> {
    if let Some(p) = cli_file.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(p);
    }
    if let Ok(env_path) = std::env::var("COSHELL_LOG_FILE") {
        if !env_path.is_empty() {
            return Ok(PathBuf::from(env_path));
        }
    }
    if let Some(p) = config_file.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(p);
    }
    default_log_file_path()
}

/// `<state dir>/coshell.log`, falling back to the data dir on platforms
/// without a state dir.
fn default_log_file_path() -> Result<PathBuf, ApiError> {
    let project_dirs = directories::ProjectDirs::from("", "coshell", "coshell").ok_or_else(|| {
        ApiError::ConfigError("Could not determine platform directories for log file".to_string())
    })?;
    let dir = project_dirs
        .state_dir()
        .unwrap_or_else(|| project_dirs.data_local_dir())
        .to_path_buf();
    Ok(dir.join("coshell.log"))
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// json or text
    #[serde(default = "default_format")]
    pub format: String,

    /// stdout, stderr, file, file+stderr, both
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Text format on a terminal only
    #[serde(default = "default_true")]
    pub color: bool,

    /// Per-module levels, e.g. `coshell::sync = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

/// Install the global subscriber.
///
/// Environment variables (`COSHELL_LOG`, `COSHELL_LOG_FORMAT`,
/// `COSHELL_LOG_OUTPUT`, `COSHELL_LOG_MODULES`) win over the config.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ApiError> {
    if config.map(|c| !c.enabled).unwrap_or(false) {
        return Registry::default()
            .with(EnvFilter::new("off"))
            .try_init()
            .map_err(|e| ApiError::ConfigError(format!("Logging already initialised: {}", e)));
    }

    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let output = determine_output(config)?;
    let file = if output.file {
        let cli_or_config = config.and_then(|c| c.file.clone());
        Some(resolve_log_file_path(None, cli_or_config)?)
    } else {
        None
    };
    let writer = build_writer(&output, file)?;
    let ansi = !output.file && config.map(|c| c.color).unwrap_or(true);

    let registry = Registry::default().with(filter);
    let result = if format == "json" {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init()
    };
    result.map_err(|e| ApiError::ConfigError(format!("Logging already initialised: {}", e)))
}

fn build_writer(output: &OutputDestinations, file: Option<PathBuf>) -> Result<BoxMakeWriter, ApiError> {
    let file_writer = match file {
        Some(path) => Some(open_log_file(&path)?),
        None => None,
    };
    let writer = match (file_writer, output.stdout, output.stderr) {
        (Some(f), _, true) => BoxMakeWriter::new(f.and(std::io::stderr)),
        (Some(f), _, false) => BoxMakeWriter::new(f),
        (None, true, true) => BoxMakeWriter::new(std::io::stdout.and(std::io::stderr)),
        (None, true, false) => BoxMakeWriter::new(std::io::stdout),
        (None, false, _) => BoxMakeWriter::new(std::io::stderr),
    };
    Ok(writer)
}

fn open_log_file(path: &PathBuf) -> Result<std::fs::File, ApiError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ApiError::ConfigError(format!("Failed to create log directory: {}", e)))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ApiError::ConfigError(format!("Failed to open log file {:?}: {}", path, e)))
}

fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, ApiError> {
    if let Ok(filter) = EnvFilter::try_from_env("COSHELL_LOG") {
        return Ok(filter);
    }

    let level = config.map(|c| c.level.as_str()).unwrap_or("warn");
    if level == "off" {
        return Ok(EnvFilter::new("off"));
    }
    let mut filter = EnvFilter::new(level);

    let mut directives: Vec<String> = config
        .map(|c| {
            c.modules
                .iter()
                .map(|(module, module_level)| format!("{}={}", module, module_level))
                .collect()
        })
        .unwrap_or_default();
    if let Ok(modules) = std::env::var("COSHELL_LOG_MODULES") {
        directives.extend(
            modules
                .split(',')
                .filter_map(|entry| entry.split_once('='))
                .map(|(module, level)| format!("{}={}", module.trim(), level.trim())),
        );
    }
    for directive in directives {
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| ApiError::ConfigError(format!("Invalid log directive: {}", e)))?,
        );
    }
    Ok(filter)
}

fn determine_format(config: Option<&LoggingConfig>) -> Result<String, ApiError> {
    if let Ok(format) = std::env::var("COSHELL_LOG_FORMAT") {
        if format == "json" || format == "text" {
            return Ok(format);
        }
    }
    let format = config.map(|c| c.format.as_str()).unwrap_or("text");
    if format != "json" && format != "text" {
        return Err(ApiError::ConfigError(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            format
        )));
    }
    Ok(format.to_string())
}

struct OutputDestinations {
    stdout: bool,
    stderr: bool,
    file: bool,
}

fn determine_output(config: Option<&LoggingConfig>) -> Result<OutputDestinations, ApiError> {
    if let Ok(output) = std::env::var("COSHELL_LOG_OUTPUT") {
        return parse_output_destinations(&output);
    }
    parse_output_destinations(config.map(|c| c.output.as_str()).unwrap_or("stderr"))
}

fn parse_output_destinations(output: &str) -> Result<OutputDestinations, ApiError> {
    let (stdout, stderr, file) = match output {
        "stdout" => (true, false, false),
        "stderr" => (false, true, false),
        "file" => (false, false, true),
        "file+stderr" => (false, true, true),
        "both" => (true, true, false),
        _ => {
            return Err(ApiError::ConfigError(format!(
                "Invalid log output: {} (must be 'stdout', 'stderr', 'file', 'file+stderr', or 'both')",
                output
            )))
        }
    };
    Ok(OutputDestinations {
        stdout,
        stderr,
        file,
    })
}
