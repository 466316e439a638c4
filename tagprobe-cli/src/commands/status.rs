//! `tagprobe status` command handler

use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use tagprobe_core::config::TagprobeConfig;
use tagprobe_core::error::StoreError;
use tagprobe_harness::{ContextStore, HarnessError, RunContext, StageRunner, StageState};

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `status` command.
pub async fn execute(config: &TagprobeConfig, writer: &OutputWriter) -> Result<(), CliError> {
    let report = build_status_report(config).await?;
    writer.render(&report)?;
    Ok(())
}

async fn build_status_report(config: &TagprobeConfig) -> Result<StatusReport, CliError> {
    let runner = StageRunner::new(ContextStore::new(config.harness.run_dir())).with_env_skips();
    let stages = runner.status().await?;

    let context = match RunContext::load(runner.store()).await {
        Ok(ctx) => Some(ctx),
        Err(HarnessError::Store(StoreError::Missing { .. })) => None,
        Err(e) => return Err(e.into()),
    };

    Ok(StatusReport {
        run_dir: runner.store().run_dir().display().to_string(),
        stages,
        context,
    })
}

/// Stage markers plus the persisted run context, if any.
#[derive(Serialize)]
pub struct StatusReport {
    pub run_dir: String,
    pub stages: Vec<StageState>,
    pub context: Option<RunContext>,
}

impl Render for StatusReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Run directory: {}", self.run_dir.bold())?;
        writeln!(w)?;

        writeln!(w, "{:<12} {:<10} {}", "STAGE", "MARKER", "SKIP ENV")?;
        writeln!(w, "{}", "-".repeat(40))?;
        for state in &self.stages {
            let marker = if state.complete {
                "complete".green()
            } else {
                "pending".yellow()
            };
            let skip = if state.skip_env { "set" } else { "-" };
            writeln!(w, "{:<12} {:<10} {}", state.stage.as_str(), marker, skip)?;
        }

        writeln!(w)?;
        match &self.context {
            Some(ctx) => {
                writeln!(w, "Context:")?;
                writeln!(w, "  Name:      {}", ctx.unique_name)?;
                writeln!(w, "  Region:    {}", ctx.region)?;
                writeln!(w, "  Terraform: {}", ctx.provision.terraform_dir.display())?;
            }
            None => writeln!(w, "Context: {}", "none".dimmed())?,
        }
        Ok(())
    }
}
