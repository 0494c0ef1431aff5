//! Shell command execution for the package manager CLI.
use async_trait::async_trait;
use log::*;
use std::path::PathBuf;
use tokio::process::Command;

#[cfg(test)]
use mockall::automock;

use crate::error::{DepbotError, Result};

/// Stderr prefix printed when a debugger attaches to the child process.
/// Such output is not an error.
const BENIGN_STDERR_PREFIX: &str = "Debugger";

/// Flag appended to commands whose output should be parsed as JSON records.
const JSON_FLAG: &str = "--json";

/// Options for a single command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Append `--json` and parse stdout as newline-delimited JSON.
    pub json_output: bool,
    /// Directory the command runs in. Defaults to the process cwd.
    pub working_directory: Option<PathBuf>,
}

/// Output of a successful command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    Text(String),
    Records(Vec<serde_json::Value>),
}

impl CommandOutput {
    /// JSON records of the output; plain text output has none.
    pub fn into_records(self) -> Vec<serde_json::Value> {
        match self {
            CommandOutput::Records(records) => records,
            CommandOutput::Text(_) => vec![],
        }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn exec(
        &self,
        command: &str,
        options: ExecOptions,
    ) -> Result<CommandOutput>;
}

/// Runs commands through `sh -c`.
#[derive(Debug, Default)]
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn exec(
        &self,
        command: &str,
        options: ExecOptions,
    ) -> Result<CommandOutput> {
        let command = if options.json_output {
            format!("{command} {JSON_FLAG}")
        } else {
            command.to_string()
        };

        debug!("executing command: {command}");

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&command);

        if let Some(dir) = &options.working_directory {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(DepbotError::command_failed(command, stderr));
        }

        if !stderr.is_empty() && !stderr.starts_with(BENIGN_STDERR_PREFIX) {
            return Err(DepbotError::command_failed(command, stderr));
        }

        if options.json_output {
            return Ok(CommandOutput::Records(parse_json_lines(&stdout)?));
        }

        Ok(CommandOutput::Text(stdout))
    }
}

/// Parse newline-delimited JSON, skipping blank lines.
pub fn parse_json_lines(stdout: &str) -> Result<Vec<serde_json::Value>> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(DepbotError::from))
        .collect()
}
