//! Configuration loading and parsing for `depbot.toml` files, and the
//! resolved configuration handed to the orchestrator.
use derive_builder::Builder;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{
    changelog::DEFAULT_TAG_PREFIX,
    error::{DepbotError, Result},
    forge::config::DEFAULT_LABEL,
    package_manager::DEFAULT_PACKAGE_MANAGER,
    path_helpers,
    repo::DEFAULT_TRUNK,
};

/// Default configuration filename, looked up in the workspace root.
pub const DEFAULT_CONFIG_FILE: &str = "depbot.toml";
/// Default commit author name.
pub const DEFAULT_COMMITTER_NAME: &str = "depbot";
/// Default commit author email.
pub const DEFAULT_COMMITTER_EMAIL: &str = "depbot@users.noreply.github.com";

/// Files the package manager touches when upgrading, relative to the
/// client directory.
pub fn default_stage_paths() -> Vec<String> {
    vec![".yarn/*".into(), "yarn.lock".into(), "package.json".into()]
}

/// Contents of `depbot.toml`. Every field is optional; command line flags
/// take precedence.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Regex patterns of dependency names never updated.
    pub ignore: Vec<String>,
    /// Directory holding package.json, relative to the workspace root.
    pub directory: Option<String>,
    pub trunk: Option<String>,
    pub label: Option<String>,
    pub tag_prefix: Option<String>,
    pub package_manager: Option<String>,
    pub committer_name: Option<String>,
    pub committer_email: Option<String>,
    /// Pathspecs committed after an upgrade, relative to `directory`.
    pub stage_paths: Option<Vec<String>>,
}

impl FileConfig {
    /// Read `path`. A missing file yields the default configuration.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no configuration found: using default");
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Compile ignore patterns, failing on the first invalid one.
pub fn compile_ignore_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| {
            Regex::new(p).map_err(|err| {
                DepbotError::invalid_config(format!(
                    "invalid ignore pattern '{p}': {err}"
                ))
            })
        })
        .collect()
}

/// Fully resolved settings of one run.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(private, name = "_build"))]
pub struct BotConfig {
    /// Root of the git working tree.
    pub workspace: PathBuf,
    /// Directory of the client project, relative to `workspace`.
    #[builder(default)]
    pub directory: String,
    #[builder(default)]
    pub ignore: Vec<Regex>,
    #[builder(default = "DEFAULT_TRUNK.into()")]
    pub trunk: String,
    #[builder(default = "DEFAULT_LABEL.into()")]
    pub label: String,
    #[builder(default = "DEFAULT_TAG_PREFIX.into()")]
    pub tag_prefix: String,
    #[builder(default = "DEFAULT_PACKAGE_MANAGER.into()")]
    pub package_manager: String,
    #[builder(default = "default_stage_paths()")]
    pub stage_paths: Vec<String>,
    #[builder(default)]
    pub dry_run: bool,
}

impl BotConfigBuilder {
    pub fn build(&self) -> Result<BotConfig> {
        let config = self._build().map_err(|e| {
            DepbotError::invalid_config(format!(
                "Failed to build configuration: {}",
                e
            ))
        })?;

        if config.trunk.is_empty() {
            return Err(DepbotError::invalid_config("trunk must not be empty"));
        }

        if config.label.is_empty() {
            return Err(DepbotError::invalid_config("label must not be empty"));
        }

        if path_helpers::escapes_root(&config.directory) {
            return Err(DepbotError::invalid_config(format!(
                "directory '{}' must stay inside the workspace",
                config.directory
            )));
        }

        Ok(config)
    }
}

impl BotConfig {
    pub fn builder() -> BotConfigBuilder {
        BotConfigBuilder::default()
    }

    /// Absolute directory the package manager runs in.
    pub fn client_directory(&self) -> PathBuf {
        self.workspace.join(&self.directory)
    }

    /// Pathspecs to commit, relative to the repository root.
    pub fn repo_stage_paths(&self) -> Vec<String> {
        self.stage_paths
            .iter()
            .map(|p| path_helpers::join_relative(&self.directory, p))
            .collect()
    }
}
