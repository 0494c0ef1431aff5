//! Custom error types for depbot.

use thiserror::Error;

/// Main error type for depbot operations.
#[derive(Error, Debug)]
pub enum DepbotError {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Descriptor errors
    #[error("Malformed package descriptor: '{token}'")]
    MalformedDescriptor { token: String },

    #[error(
        "Current version {version} of {name} is not in the registry's version list"
    )]
    VersionNotFound { name: String, version: String },

    // Package manager errors
    #[error("Command '{command}' failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    // Forge/Git errors
    #[error("A pull request already exists for branch '{branch}'")]
    DuplicatePullRequest { branch: String },

    #[error("Forge operation failed: {0}")]
    ForgeError(String),

    #[error("API rate limit exceeded")]
    RateLimitExceeded,

    #[error("Git operation failed: {0}")]
    GitError(#[from] git2::Error),

    #[error("Git URL parse error: {0}")]
    GitUrlError(#[from] git_url_parse::GitUrlParseError),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    // Parsing / rendering errors
    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Regular expression error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Template rendering failed: {0}")]
    TemplateError(#[from] tera::Error),

    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] log::SetLoggerError),

    // Generic wrapper for other errors
    #[error(transparent)]
    Other(#[from] color_eyre::Report),
}

/// Result type alias using DepbotError
pub type Result<T> = std::result::Result<T, DepbotError>;

impl DepbotError {
    /// Create a forge error with context
    pub fn forge(msg: impl Into<String>) -> Self {
        Self::ForgeError(msg.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a malformed descriptor error for the offending token
    pub fn malformed_descriptor(token: impl Into<String>) -> Self {
        Self::MalformedDescriptor {
            token: token.into(),
        }
    }

    /// Create a command failure error
    pub fn command_failed(
        command: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            stderr: stderr.into(),
        }
    }
}

// Implement From for std::io::Error - wraps in Other variant for generic I/O errors
impl From<std::io::Error> for DepbotError {
    fn from(err: std::io::Error) -> Self {
        Self::Other(color_eyre::Report::from(err))
    }
}

// Implement From for octocrab errors (GitHub API)
impl From<octocrab::Error> for DepbotError {
    fn from(err: octocrab::Error) -> Self {
        match &err {
            octocrab::Error::GitHub { source, .. }
                if source.message.contains("rate limit") =>
            {
                Self::RateLimitExceeded
            }
            _ => Self::ForgeError(format!("GitHub API error: {}", err)),
        }
    }
}
