//! CLI-side configuration: `GlobalOpts`-aware wrappers over
//! `webstead-config`.
//!
//! Flags beat the config file; the file beats built-in defaults.

use std::path::PathBuf;

pub use webstead_config::Config;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Config file path for this invocation.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    webstead_config::config_path(global.config.as_deref())
}

/// Load the resolved configuration for this invocation.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = config_path(global);
    tracing::debug!(path = %path.display(), "loading configuration");
    Ok(webstead_config::load_config(&path)?)
}

/// `--output`, else `[defaults].output`, else table.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> OutputFormat {
    global.output.unwrap_or(match cfg.defaults.output.as_str() {
        "json" => OutputFormat::Json,
        "yaml" => OutputFormat::Yaml,
        "plain" => OutputFormat::Plain,
        _ => OutputFormat::Table,
    })
}

/// `--color`, else `[defaults].color`, else auto.
pub fn color_mode(global: &GlobalOpts, cfg: &Config) -> ColorMode {
    global.color.unwrap_or(match cfg.defaults.color.as_str() {
        "always" => ColorMode::Always,
        "never" => ColorMode::Never,
        _ => ColorMode::Auto,
    })
}
