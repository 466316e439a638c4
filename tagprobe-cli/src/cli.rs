//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use tagprobe_core::config::LogFormat;
use tagprobe_core::types::Stage;

/// tagprobe -- end-to-end check that a notification re-tags a registry image.
///
/// Use `tagprobe <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "tagprobe", version, about, long_about = None)]
pub struct Cli {
    /// Path to the tagprobe.toml configuration file.
    #[arg(short, long, default_value = "tagprobe.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Override log format.
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run init_apply, validate and destroy in order.
    Run(RunArgs),

    /// Run a single stage.
    Stage(StageArgs),

    /// Show stage markers and the persisted run context.
    Status,

    /// Clear stage completion markers.
    Clean(CleanArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- run ----

/// Run the full lifecycle.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Re-run every stage even if it is marked complete.
    #[arg(short, long)]
    pub force: bool,
}

// ---- stage ----

/// Run one stage of the lifecycle.
#[derive(Args, Debug)]
pub struct StageArgs {
    /// Stage to run (init_apply, validate, destroy).
    pub stage: Stage,

    /// Re-run the stage even if it is marked complete.
    #[arg(short, long)]
    pub force: bool,
}

// ---- clean ----

/// Clear completion markers.
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Stage whose marker is cleared (default: all stages).
    pub stage: Option<Stage>,
}

// ---- config ----

/// Manage tagprobe configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, harness, terraform, image, poller, aws).
        #[arg(long)]
        section: Option<String>,
    },
}
