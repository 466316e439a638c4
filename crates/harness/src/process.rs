//! External process invocation.
//!
//! Every adapter that shells out (terraform, the push script, the aws CLI)
//! builds a [`CommandSpec`] and runs it through [`run`], so exit-status handling,
//! stderr capture and logging behave the same everywhere.

use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::HarnessError;

/// Longest stderr excerpt kept in an error message.
const MAX_STDERR_CHARS: usize = 2048;

/// A command line plus its environment.
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CommandSpec {
    /// Creates a spec for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets one environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Sets several environment variables for the child.
    pub fn envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.envs
            .extend(envs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments in order.
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Environment overrides in order.
    pub fn environment(&self) -> &[(String, String)] {
        &self.envs
    }

    /// Human-readable command line for logs and errors.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Standard output (lossy UTF-8)
    pub stdout: String,
    /// Standard error (lossy UTF-8)
    pub stderr: String,
}

/// Runs a command to completion and returns its output.
///
/// The child is killed if the returned future is dropped, so cancelling a
/// stage does not leave stray processes behind.
///
/// # Errors
///
/// Returns `HarnessError::CommandFailed` if the program cannot be spawned or
/// exits with a non-zero status. The error carries the exit status and the
/// tail of stderr.
pub async fn run(spec: &CommandSpec) -> Result<CommandOutput, HarnessError> {
    let command_line = spec.display();
    debug!(command = %command_line, "running command");

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in &spec.envs {
        command.env(key, value);
    }

    let output = command
        .output()
        .await
        .map_err(|e| HarnessError::CommandFailed {
            command: command_line.clone(),
            reason: format!("failed to start: {e}"),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(HarnessError::CommandFailed {
            command: command_line,
            reason: format!("{}: {}", output.status, stderr_tail(&stderr)),
        });
    }

    debug!(command = %command_line, "command finished");
    Ok(CommandOutput { stdout, stderr })
}

fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    let count = trimmed.chars().count();
    if count <= MAX_STDERR_CHARS {
        return trimmed.to_owned();
    }
    let tail: String = trimmed.chars().skip(count - MAX_STDERR_CHARS).collect();
    format!("...{tail}")
}
