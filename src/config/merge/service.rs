//! MergeService: orchestrates sources, applies merge policy, deserializes to CoshellConfig.

use crate::config::sources::{environment, global_file, project_file};
use crate::config::CoshellConfig;
use config::{ConfigError, File};
use std::path::Path;

use super::merge_policy;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Precedence: defaults (lowest) -> global file -> project file -> environment (highest).
    pub fn load(project_dir: &Path) -> Result<CoshellConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = project_file::add_to_builder(builder, project_dir)?;
        let builder = environment::add_to_builder(builder)?;

        builder.build()?.try_deserialize()
    }

    /// Load config from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<CoshellConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = builder.add_source(File::from(path).required(true));
        let builder = environment::add_to_builder(builder)?;

        builder.build()?.try_deserialize()
    }
}
