//! Command handlers -- one module per subcommand

pub mod clean;
pub mod config;
pub mod run;
pub mod status;

use std::path::Path;

use tracing::debug;

use tagprobe_core::config::TagprobeConfig;

use crate::error::CliError;

/// Load the effective configuration for lifecycle commands.
///
/// A missing file falls back to the defaults; environment overrides and
/// validation apply in both cases.
pub async fn load_config(path: &Path) -> Result<TagprobeConfig, CliError> {
    if tokio::fs::try_exists(path).await? {
        return Ok(TagprobeConfig::load(path).await?);
    }

    debug!(path = %path.display(), "config file not found, using defaults");
    let mut config = TagprobeConfig::default();
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}
