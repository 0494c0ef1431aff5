//! Yarn invocations used by the update workflow.
use log::*;
use std::path::PathBuf;

use crate::{
    error::{DepbotError, Result},
    package::LookupRecord,
    runner::{CommandRunner, ExecOptions},
};

/// Default package manager binary.
pub const DEFAULT_PACKAGE_MANAGER: &str = "yarn";

/// Builds package manager commands and decodes their output.
pub struct PackageManager {
    runner: Box<dyn CommandRunner>,
    binary: String,
    working_directory: PathBuf,
}

impl PackageManager {
    pub fn new(
        runner: Box<dyn CommandRunner>,
        binary: impl Into<String>,
        working_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            binary: binary.into(),
            working_directory: working_directory.into(),
        }
    }

    fn options(&self, json_output: bool) -> ExecOptions {
        ExecOptions {
            json_output,
            working_directory: Some(self.working_directory.clone()),
        }
    }

    /// Raw `name@adapter:version` tokens of every declared dependency.
    pub async fn list_dependencies(&self) -> Result<Vec<String>> {
        let command = format!("{} info --name-only", self.binary);

        let records = self
            .runner
            .exec(&command, self.options(true))
            .await?
            .into_records();

        records
            .into_iter()
            .map(|record| match record {
                serde_json::Value::String(token) => Ok(token),
                other => Err(DepbotError::command_failed(
                    &command,
                    format!("unexpected dependency record: {other}"),
                )),
            })
            .collect()
    }

    /// Registry metadata for all `names` in a single invocation.
    pub async fn lookup(&self, names: &[String]) -> Result<Vec<LookupRecord>> {
        if names.is_empty() {
            return Ok(vec![]);
        }

        let command = format!("{} npm info {}", self.binary, names.join(" "));

        let records = self
            .runner
            .exec(&command, self.options(true))
            .await?
            .into_records();

        debug!("received {} lookup records", records.len());

        records
            .into_iter()
            .map(|record| {
                serde_json::from_value::<LookupRecord>(record)
                    .map_err(DepbotError::from)
            })
            .collect()
    }

    /// Upgrade a single dependency to its latest version.
    pub async fn upgrade(&self, name: &str) -> Result<()> {
        let command = format!("{} up \"{}\"", self.binary, name);
        info!("running: {command}");
        self.runner.exec(&command, self.options(false)).await?;
        Ok(())
    }
}
