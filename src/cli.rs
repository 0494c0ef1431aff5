//! CLI argument parsing, config file merging and forge configuration.
use clap::Parser;
use git_url_parse::GitUrl;
use secrecy::SecretString;
use std::path::PathBuf;

use crate::{
    config::{
        BotConfig, DEFAULT_COMMITTER_EMAIL, DEFAULT_COMMITTER_NAME,
        DEFAULT_CONFIG_FILE, FileConfig, compile_ignore_patterns,
        default_stage_paths,
    },
    error::{DepbotError, Result},
    forge::config::{DEFAULT_HOST, RemoteConfig},
    repo::{RepositorySettings, RepositorySettingsBuilder},
};

/// Opens one pull request per outdated Yarn dependency.
#[derive(Parser, Debug, Default)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, env = "GITHUB_REPOSITORY", default_value = "")]
    /// GitHub repository receiving pull requests, as a URL
    /// (https://github.com/owner/repo) or an owner/repo slug.
    pub github_repo: String,

    #[arg(long, env = "GITHUB_TOKEN", default_value = "", hide_env_values = true)]
    /// GitHub access token used for the API and https pushes.
    pub github_token: String,

    #[arg(long, env = "GITHUB_WORKSPACE", default_value = ".")]
    /// Root of the git working tree.
    pub workspace: PathBuf,

    #[arg(long)]
    /// Directory holding package.json, relative to the workspace.
    pub directory: Option<String>,

    #[arg(long, value_delimiter = ',')]
    /// Comma separated regex patterns of dependencies never updated.
    pub ignore: Vec<String>,

    #[arg(long)]
    /// Branch update branches start from and pull requests target.
    pub trunk: Option<String>,

    #[arg(long)]
    /// Label added to pull requests and used to find open ones.
    pub label: Option<String>,

    #[arg(long)]
    /// Prefix of upstream release tags.
    pub tag_prefix: Option<String>,

    #[arg(long)]
    /// Package manager binary.
    pub package_manager: Option<String>,

    #[arg(long)]
    pub committer_name: Option<String>,

    #[arg(long)]
    pub committer_email: Option<String>,

    #[arg(long)]
    /// Config file. Defaults to depbot.toml in the workspace.
    pub config: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    /// Log planned updates without touching the repository or the forge.
    pub dry_run: bool,

    #[arg(long, default_value_t = false)]
    /// Enable debug logging.
    pub debug: bool,
}

impl Args {
    /// Configure the forge connection from the repository and token.
    pub fn get_remote(&self) -> Result<RemoteConfig> {
        let repo = self.github_repo.trim();

        if repo.is_empty() {
            return Err(DepbotError::invalid_config(
                "must configure a github repository",
            ));
        }

        let mut token = self.github_token.clone();

        let mut remote = if is_slug(repo) {
            let (owner, name) = repo.split_once('/').unwrap_or_default();
            RemoteConfig {
                owner: owner.to_string(),
                repo: name.to_string(),
                ..Default::default()
            }
        } else {
            let parsed = GitUrl::parse(repo)?;

            let scheme = match parsed.scheme {
                git_url_parse::Scheme::Http => "http",
                git_url_parse::Scheme::Https => "https",
                _ => {
                    return Err(DepbotError::invalid_config(
                        "only http and https schemes are supported for repo urls",
                    ));
                }
            };

            if token.is_empty()
                && let Some(parsed_token) = parsed.token
            {
                token = parsed_token;
            }

            let host = parsed.host.ok_or_else(|| {
                DepbotError::invalid_config("unable to parse host from github repo")
            })?;

            let owner = parsed.owner.ok_or_else(|| {
                DepbotError::invalid_config("unable to parse owner from github repo")
            })?;

            RemoteConfig {
                host,
                scheme: scheme.to_string(),
                owner,
                repo: parsed.name,
                ..Default::default()
            }
        };

        if token.is_empty() {
            return Err(DepbotError::invalid_config("must set github token"));
        }

        remote.token = SecretString::from(token);

        Ok(remote)
    }

    /// Load the config file named by `--config`, else `depbot.toml` in the
    /// workspace when present.
    pub fn load_file_config(&self) -> Result<FileConfig> {
        match &self.config {
            Some(path) if !path.exists() => Err(DepbotError::invalid_config(
                format!("config file not found: {}", path.display()),
            )),
            Some(path) => FileConfig::load(path),
            None => FileConfig::load(&self.workspace.join(DEFAULT_CONFIG_FILE)),
        }
    }

    /// Merge arguments over the file config. Flags win over file values.
    pub fn bot_config(&self, file: &FileConfig) -> Result<BotConfig> {
        let ignore = if self.ignore.is_empty() {
            &file.ignore
        } else {
            &self.ignore
        };

        let mut builder = BotConfig::builder();

        builder
            .workspace(self.workspace.clone())
            .ignore(compile_ignore_patterns(ignore)?)
            .stage_paths(
                file.stage_paths.clone().unwrap_or_else(default_stage_paths),
            )
            .dry_run(self.dry_run);

        if let Some(directory) = pick(&self.directory, &file.directory) {
            builder.directory(directory);
        }

        if let Some(trunk) = pick(&self.trunk, &file.trunk) {
            builder.trunk(trunk);
        }

        if let Some(label) = pick(&self.label, &file.label) {
            builder.label(label);
        }

        if let Some(prefix) = pick(&self.tag_prefix, &file.tag_prefix) {
            builder.tag_prefix(prefix);
        }

        if let Some(pm) = pick(&self.package_manager, &file.package_manager) {
            builder.package_manager(pm);
        }

        builder.build()
    }

    /// Commit identity and push credentials.
    pub fn repository_settings(
        &self,
        file: &FileConfig,
        config: &BotConfig,
        remote: &RemoteConfig,
    ) -> Result<RepositorySettings> {
        let name = pick(&self.committer_name, &file.committer_name)
            .unwrap_or_else(|| DEFAULT_COMMITTER_NAME.to_string());
        let email = pick(&self.committer_email, &file.committer_email)
            .unwrap_or_else(|| DEFAULT_COMMITTER_EMAIL.to_string());

        RepositorySettingsBuilder::default()
            .trunk(config.trunk.clone())
            .committer_name(name)
            .committer_email(email)
            .token(remote.token.clone())
            .build()
            .map_err(|e| {
                DepbotError::invalid_config(format!(
                    "Failed to build repository settings: {}",
                    e
                ))
            })
    }
}

/// Flag value if given, else the file value.
fn pick(flag: &Option<String>, file: &Option<String>) -> Option<String> {
    flag.clone().or_else(|| file.clone())
}

/// `owner/repo` without scheme, host or user.
fn is_slug(repo: &str) -> bool {
    !repo.contains("://")
        && !repo.contains('@')
        && !repo.starts_with(DEFAULT_HOST)
        && repo.split('/').count() == 2
        && repo.split('/').all(|part| !part.is_empty())
}
