//! tagprobe -- end-to-end validation of notification-driven registry re-tagging
//!
//! Parses the command line, loads `tagprobe.toml`, initializes logging and
//! dispatches to one handler per subcommand. Errors are mapped to exit codes
//! by [`CliError::exit_code`].

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use tagprobe_core::config::{LogFormat, TagprobeConfig};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            e.exit_code()
        }
    };

    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    // config inspects the file itself, before logging is configured from it
    if let Commands::Config(args) = cli.command {
        return commands::config::execute(args, &cli.config, &writer).await;
    }

    let mut config = commands::load_config(&cli.config).await?;
    apply_cli_overrides(&mut config, cli.log_level, cli.log_format)?;

    logging::init_tracing(&config.general).map_err(|e| CliError::Config(e.to_string()))?;

    tracing::info!(
        config = %cli.config.display(),
        run_dir = %config.harness.run_dir().display(),
        "tagprobe starting"
    );

    match cli.command {
        Commands::Run(args) => {
            commands::run::execute(args, config, shutdown_token(), &writer).await
        }
        Commands::Stage(args) => {
            commands::run::execute_stage(args, config, shutdown_token(), &writer).await
        }
        Commands::Status => commands::status::execute(&config, &writer).await,
        Commands::Clean(args) => commands::clean::execute(args, &config, &writer).await,
        Commands::Config(_) => Ok(()),
    }
}

fn apply_cli_overrides(
    config: &mut TagprobeConfig,
    log_level: Option<String>,
    log_format: Option<LogFormat>,
) -> Result<(), CliError> {
    if log_level.is_none() && log_format.is_none() {
        return Ok(());
    }
    if let Some(level) = log_level {
        config.general.log_level = level;
    }
    if let Some(format) = log_format {
        config.general.log_format = format;
    }
    config.validate()?;
    Ok(())
}

/// Cancels the returned token on the first Ctrl-C.
///
/// In-flight validators stop at their next await point; `destroy` still runs.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling validators");
            cancel.cancel();
        }
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_replace_log_settings() {
        let mut config = TagprobeConfig::default();
        apply_cli_overrides(&mut config, Some("debug".to_owned()), Some(LogFormat::Pretty))
            .expect("valid overrides");
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_cli_overrides_reject_unknown_level() {
        let mut config = TagprobeConfig::default();
        let err = apply_cli_overrides(&mut config, Some("verbose".to_owned()), None)
            .expect_err("unknown level should be rejected");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_cli_overrides_absent_leave_config_untouched() {
        let mut config = TagprobeConfig::default();
        apply_cli_overrides(&mut config, None, None).expect("no overrides");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, LogFormat::Json);
    }
}
