//! `tagprobe clean` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use tagprobe_core::config::TagprobeConfig;
use tagprobe_core::types::Stage;
use tagprobe_harness::{ContextStore, StageRunner};

use crate::cli::CleanArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `clean` command.
pub async fn execute(
    args: CleanArgs,
    config: &TagprobeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = clear_markers(args.stage, config).await?;
    writer.render(&report)?;
    Ok(())
}

async fn clear_markers(stage: Option<Stage>, config: &TagprobeConfig) -> Result<CleanReport, CliError> {
    let runner = StageRunner::new(ContextStore::new(config.harness.run_dir()));
    let cleared = match stage {
        Some(stage) => {
            if runner.clear(stage).await? {
                vec![stage]
            } else {
                Vec::new()
            }
        }
        None => runner.clear_all().await?,
    };

    info!(cleared = cleared.len(), "stage markers cleared");
    Ok(CleanReport { cleared })
}

/// Stages whose marker was removed.
#[derive(Serialize)]
pub struct CleanReport {
    pub cleared: Vec<Stage>,
}

impl Render for CleanReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        if self.cleared.is_empty() {
            return writeln!(w, "No stage markers to clear");
        }
        for stage in &self.cleared {
            writeln!(w, "Cleared marker: {stage}")?;
        }
        Ok(())
    }
}
