//! Project config file source: `<dir>/.coshell.toml`

use crate::config::PROJECT_CONFIG_FILE;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::Path;

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    project_dir: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let path = project_dir.join(PROJECT_CONFIG_FILE);
    Ok(builder.add_source(File::from(path).format(config::FileFormat::Toml).required(false)))
}
