//! Configuration for the hosting platform connection.
use secrecy::SecretString;

/// Label attached to every update pull request and used to find open ones.
pub const DEFAULT_LABEL: &str = "dependencies";
/// Default GitHub host.
pub const DEFAULT_HOST: &str = "github.com";

/// Remote repository connection configuration for authenticating and
/// interacting with the hosting platform.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Remote forge host (e.g., "github.com").
    pub host: String,
    /// URL scheme (http or https).
    pub scheme: String,
    /// Owner of the repository receiving update pull requests.
    pub owner: String,
    /// Name of the repository receiving update pull requests.
    pub repo: String,
    /// Access token for authentication.
    pub token: SecretString,
}

impl RemoteConfig {
    /// API base URL derived from scheme and host.
    pub fn api_base_uri(&self) -> String {
        if self.host == DEFAULT_HOST {
            format!("{}://api.{}", self.scheme, self.host)
        } else {
            // GitHub Enterprise serves the REST API under /api/v3
            format!("{}://{}/api/v3", self.scheme, self.host)
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            scheme: "https".to_string(),
            owner: "".to_string(),
            repo: "".to_string(),
            token: SecretString::from("".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_base_uri_for_github_dot_com() {
        let config = RemoteConfig::default();
        assert_eq!(config.api_base_uri(), "https://api.github.com");
    }

    #[test]
    fn api_base_uri_for_enterprise() {
        let config = RemoteConfig {
            host: "git.example.com".into(),
            ..Default::default()
        };
        assert_eq!(config.api_base_uri(), "https://git.example.com/api/v3");
    }
}
