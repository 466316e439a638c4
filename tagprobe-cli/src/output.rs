//! Output formatting abstraction for text vs JSON rendering
//!
//! All subcommand output flows through [`OutputWriter`] which handles format switching.
//! Format-specific logic stays out of the command handlers.

use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use tagprobe_harness::{RunReport, StageStatus};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Writes CLI output in the selected format.
///
/// Subcommand handlers call `writer.render(&payload)` where `payload`
/// implements both `Serialize` (for JSON) and `Render` (for text).
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    /// Create a new output writer with the specified format.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a payload to stdout.
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.render_to(payload, &mut handle)
    }

    /// Render a payload to an arbitrary writer.
    pub fn render_to<T: Render + Serialize>(
        &self,
        payload: &T,
        w: &mut dyn Write,
    ) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Text => {
                payload.render_text(w)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *w, payload)?;
                writeln!(w)?;
            }
        }
        Ok(())
    }
}

/// Trait for human-readable text rendering.
///
/// Implemented by every CLI output payload alongside `serde::Serialize`.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

impl Render for RunReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Run: {}", self.run_dir.display().to_string().bold())?;
        writeln!(w)?;

        writeln!(w, "{:<12} {:<10} {}", "STAGE", "STATUS", "DETAIL")?;
        writeln!(w, "{}", "-".repeat(60))?;
        for report in &self.stages {
            let (status, detail) = match &report.status {
                StageStatus::Executed => ("executed".green(), String::new()),
                StageStatus::Skipped { reason } => ("skipped".yellow(), reason.to_string()),
                StageStatus::Failed { class, message } => {
                    ("failed".red().bold(), format!("[{class}] {message}"))
                }
                StageStatus::NotRun => ("not run".dimmed(), String::new()),
            };
            writeln!(w, "{:<12} {:<10} {}", report.stage.as_str(), status, detail)?;
        }

        if !self.validators.is_empty() {
            writeln!(w)?;
            writeln!(w, "{:<24} {:<6} {:>10}", "VALIDATOR", "RESULT", "ELAPSED")?;
            writeln!(w, "{}", "-".repeat(60))?;
            for validator in &self.validators {
                let result = if validator.passed {
                    "PASS".green().bold()
                } else {
                    "FAIL".red().bold()
                };
                writeln!(
                    w,
                    "{:<24} {:<6} {:>8}ms",
                    validator.name, result, validator.elapsed_ms
                )?;
                if let Some(failure) = &validator.failure {
                    writeln!(w, "  {} [{}] {}", "cause:".red(), failure.class, failure.message)?;
                }
            }
        }

        writeln!(w)?;
        if self.passed() {
            writeln!(w, "Result: {}", "PASSED".green().bold())?;
        } else {
            writeln!(w, "Result: {}", "FAILED".red().bold())?;
        }
        Ok(())
    }
}
