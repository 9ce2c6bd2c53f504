//! Global config file source: `$XDG_CONFIG_HOME/coshell/config.toml`

use crate::config::paths::xdg_root;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use tracing::debug;

/// Add the global file when a config home can be determined; absent files are skipped.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    match xdg_root::global_config_file() {
        Ok(path) => {
            debug!(path = %path.display(), "Global config source");
            Ok(builder.add_source(File::from(path).required(false)))
        }
        Err(err) => {
            debug!(error = %err, "No global config home");
            Ok(builder)
        }
    }
}
