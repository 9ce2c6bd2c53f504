//! Built-in defaults, the lowest layer of every merge.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};

pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("workspace.root_name", "root")?
        .set_default(
            "terminal.command_timeout_ms",
            crate::config::default_command_timeout_ms() as i64,
        )?
        .set_default(
            "terminal.dedup_window_ms",
            crate::config::default_dedup_window_ms() as i64,
        )?
        .set_default(
            "terminal.max_pending_commands",
            crate::config::default_max_pending_commands() as i64,
        )?
        .set_default("terminal.tick_ms", crate::config::default_tick_ms() as i64)?
        .set_default("terminal.highlight_urls", true)
}
