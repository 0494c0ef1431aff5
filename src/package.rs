//! Parsed representation of one declared dependency and the derivations the
//! update workflow needs from it: update eligibility, the versions skipped by
//! an update, and the deterministic pull request title and branch name.
use log::*;
use regex::Regex;
use serde::Deserialize;

use crate::error::{DepbotError, Result};

/// Adapter tag of registry-hosted packages, the only kind depbot updates.
pub const SUPPORTED_ADAPTER: &str = "npm";
/// Prefix of every update branch.
pub const DEFAULT_BRANCH_PREFIX: &str = "dependabot";

const GITHUB_HOSTS: [&str; 2] = ["github.com/", "github.com:"];

/// Source repository reference reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRepository {
    /// Repository kind, e.g. "git". `None` for the bare string shorthand.
    pub kind: Option<String>,
    pub url: String,
}

/// Owner / repository pair of an upstream GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamCoordinates {
    pub owner: String,
    pub repo: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawRepository {
    Detailed {
        #[serde(rename = "type")]
        kind: Option<String>,
        url: String,
    },
    Shorthand(String),
}

impl From<RawRepository> for UpstreamRepository {
    fn from(raw: RawRepository) -> Self {
        match raw {
            RawRepository::Detailed { kind, url } => Self { kind, url },
            RawRepository::Shorthand(url) => Self { kind: None, url },
        }
    }
}

/// One record of the batched registry lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct LookupRecord {
    pub name: String,
    /// Latest version published under the registry's "latest" tag.
    pub version: String,
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_repository")]
    pub repository: Option<UpstreamRepository>,
}

fn deserialize_repository<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<UpstreamRepository>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<RawRepository> = Option::deserialize(deserializer)?;
    Ok(raw.map(UpstreamRepository::from))
}

/// A dependency parsed from a `name@adapter:version` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    name: String,
    adapter: String,
    current_version: String,
    available_versions: Vec<String>,
    latest_version: String,
    upstream_repository: Option<UpstreamRepository>,
}

impl PackageDescriptor {
    /// Parse a descriptor token such as `@babel/core@npm:7.24.0`.
    ///
    /// The last `@` splits the name from `adapter:version` so scoped names
    /// keep their leading `@`; the first `:` of the remainder splits adapter
    /// from version.
    pub fn parse(token: &str) -> Result<Self> {
        let malformed = || DepbotError::malformed_descriptor(token);

        let (name, rest) = token.rsplit_once('@').ok_or_else(malformed)?;
        let (adapter, version) = rest.split_once(':').ok_or_else(malformed)?;

        if name.is_empty() || adapter.is_empty() || version.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            name: name.to_string(),
            adapter: adapter.to_string(),
            current_version: version.to_string(),
            available_versions: vec![],
            latest_version: String::new(),
            upstream_repository: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn adapter(&self) -> &str {
        &self.adapter
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub fn latest_version(&self) -> &str {
        &self.latest_version
    }

    pub fn available_versions(&self) -> &[String] {
        &self.available_versions
    }

    pub fn upstream_repository(&self) -> Option<&UpstreamRepository> {
        self.upstream_repository.as_ref()
    }

    /// Whether depbot may update this dependency: it must not match any
    /// ignore pattern and must come from the npm registry.
    pub fn is_updatable(&self, ignore: &[Regex]) -> bool {
        if let Some(pattern) = ignore.iter().find(|p| p.is_match(&self.name)) {
            debug!("ignoring {}: matches pattern {}", self.name, pattern);
            return false;
        }

        self.adapter == SUPPORTED_ADAPTER
    }

    /// Store the result of the registry lookup for this package.
    pub fn apply_lookup(&mut self, record: LookupRecord) {
        self.latest_version = record.version;
        self.available_versions = record.versions;
        self.upstream_repository = record.repository;
    }

    /// Plain string inequality between current and latest version.
    ///
    /// No semantic version ordering is applied: a latest tag pointing at a
    /// pre-release or an older version still counts as an update.
    pub fn is_update_needed(&self) -> bool {
        !self.latest_version.is_empty()
            && self.current_version != self.latest_version
    }

    pub fn has_upstream_repository(&self) -> bool {
        matches!(
            &self.upstream_repository,
            Some(UpstreamRepository { kind: Some(kind), .. }) if kind == "git"
        )
    }

    /// Extract the GitHub owner and repository from the upstream url.
    pub fn resolve_upstream_coordinates(&self) -> Option<UpstreamCoordinates> {
        let url = &self.upstream_repository.as_ref()?.url;

        let rest = GITHUB_HOSTS.iter().find_map(|host| {
            url.find(host).map(|index| &url[index + host.len()..])
        })?;

        let mut segments = rest.split('/');
        let owner = segments.next().unwrap_or_default();
        let repo = segments.next().unwrap_or_default();
        let repo = repo.strip_suffix(".git").unwrap_or(repo);

        if owner.is_empty() || repo.is_empty() {
            return None;
        }

        Some(UpstreamCoordinates {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Every available version published after the current one, ascending.
    pub fn later_versions(&self) -> Result<Vec<String>> {
        let index = self
            .available_versions
            .iter()
            .position(|v| v == &self.current_version)
            .ok_or_else(|| DepbotError::VersionNotFound {
                name: self.name.clone(),
                version: self.current_version.clone(),
            })?;

        Ok(self.available_versions[index + 1..].to_vec())
    }

    pub fn pull_request_title(&self) -> String {
        format!(
            "Bump {} from {} to {}",
            self.name, self.current_version, self.latest_version
        )
    }

    /// Branch carrying the update, safe to use as a git ref name.
    pub fn branch_name(&self) -> String {
        format!(
            "{DEFAULT_BRANCH_PREFIX}/bump_{}_from_{}_to_{}",
            sanitize_ref_component(&self.name),
            sanitize_ref_component(&self.current_version),
            sanitize_ref_component(&self.latest_version),
        )
    }
}

/// Make a string usable inside a single git ref path component.
fn sanitize_ref_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());

    for c in value.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '-'
        };

        // ".." is never valid in a ref
        if c == '.' && out.ends_with('.') {
            continue;
        }

        out.push(c);
    }

    let mut out = out.trim_start_matches(['-', '.']).to_string();

    while out.ends_with(".lock") || out.ends_with('.') {
        if let Some(stripped) = out.strip_suffix(".lock") {
            out = stripped.to_string();
        } else {
            out.pop();
        }
    }

    out
}
