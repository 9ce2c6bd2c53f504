//! ConfigLoader facade delegating to the merge service.

use super::merge::service::MergeService;
use super::CoshellConfig;
use config::ConfigError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a project directory from files and environment.
    pub fn load(project_dir: &Path) -> Result<CoshellConfig, ConfigError> {
        MergeService::load(project_dir)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<CoshellConfig, ConfigError> {
        MergeService::load_from_file(path)
    }

    pub fn default() -> CoshellConfig {
        CoshellConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn toml_file() -> NamedTempFile {
        tempfile::Builder::new().suffix(".toml").tempfile().unwrap()
    }

    #[test]
    fn explicit_file_overrides_defaults() {
        let mut file = toml_file();
        writeln!(
            file,
            "[terminal]\ncommand_timeout_ms = 5000\nhighlight_urls = false\n\n[workspace]\nroot_name = \"project\""
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.terminal.command_timeout_ms, 5000);
        assert!(!config.terminal.highlight_urls);
        assert_eq!(config.terminal.max_pending_commands, 8);
        assert_eq!(config.workspace.root_name, "project");
    }

    #[test]
    fn project_file_is_picked_up() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".coshell.toml"),
            "[terminal]\nmax_pending_commands = 2\n",
        )
        .unwrap();

        let config = ConfigLoader::load(dir.path()).unwrap();
        assert_eq!(config.terminal.max_pending_commands, 2);
        assert_eq!(config.terminal.dedup_window_ms, 500);
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigLoader::load(dir.path()).unwrap();
        assert_eq!(config.terminal, ConfigLoader::default().terminal);
        assert_eq!(config.workspace.root_name, "root");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = toml_file();
        writeln!(file, "[terminal\ncommand_timeout_ms = ").unwrap();
        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }
}
