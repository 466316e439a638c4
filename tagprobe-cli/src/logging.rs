//! Tracing setup for the tagprobe binary.
//!
//! Reads `[general]` from `tagprobe.toml`; `RUST_LOG`, when set, wins over
//! `log_level`. Everything goes to stderr so stdout stays a clean report.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tagprobe_core::config::{GeneralConfig, LogFormat};

/// Install the global subscriber. Call once, before the first event.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(level_filter(config));

    let installed = match config.log_format {
        LogFormat::Json => registry.with(layer.json()).try_init(),
        LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
    };

    installed.map_err(|e| {
        anyhow::anyhow!(
            "failed to install {} tracing subscriber: {e}",
            config.log_format
        )
    })
}

fn level_filter(config: &GeneralConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}
