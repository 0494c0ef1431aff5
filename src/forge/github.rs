//! Implements the Forge trait for Github
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::*;
use octocrab::Octocrab;
use reqwest::StatusCode;
use url::Url;

use crate::{
    error::{DepbotError, Result},
    forge::{
        config::RemoteConfig,
        request::{
            ComparedCommit, Comparison, CreatePrRequest, PrLabelsRequest,
            PullRequest, ReleaseByTagResponse,
        },
        traits::Forge,
    },
};

mod types;

use types::{GithubComparison, GithubRelease, SearchParams, SearchResult};

/// Message GitHub returns alongside a 422 when the head branch already has
/// an open pull request.
const DUPLICATE_PR_MESSAGE: &str = "A pull request already exists";

/// GitHub forge implementation using Octocrab for API interactions with
/// releases, comparisons, pull requests, labels and search.
pub struct Github {
    config: RemoteConfig,
    base_uri: String,
    instance: Octocrab,
}

impl Github {
    /// Create GitHub client with personal access token authentication and
    /// verify the target repository is reachable.
    pub async fn new(config: RemoteConfig) -> Result<Self> {
        let base_uri = config.api_base_uri();
        let builder = Octocrab::builder()
            .personal_token(config.token.clone())
            .base_uri(base_uri.clone())?;
        let instance = builder.build()?;

        let repo = instance.repos(&config.owner, &config.repo).get().await?;

        info!(
            "connected to repository: {}",
            repo.full_name.unwrap_or_else(|| config.repo.clone())
        );

        Ok(Self {
            config,
            base_uri,
            instance,
        })
    }
}

/// Whether a failed pull request creation means one already exists.
fn is_duplicate_pr(status: StatusCode, detail: &str) -> bool {
    status == StatusCode::UNPROCESSABLE_ENTITY
        && detail.contains(DUPLICATE_PR_MESSAGE)
}

/// Append `segments` to the API base, percent-encoding each one so tags
/// containing `/`, `#` or `%` stay a single path segment.
fn api_endpoint(base_uri: &str, segments: &[&str]) -> Result<String> {
    let mut url = Url::parse(base_uri)?;

    url.path_segments_mut()
        .map_err(|_| {
            DepbotError::forge(format!("invalid API base url: {base_uri}"))
        })?
        .pop_if_empty()
        .extend(segments);

    Ok(url.to_string())
}

fn parse_published_at(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
        .map(|d| d.with_timezone(&Utc))
}

#[async_trait]
impl Forge for Github {
    fn remote_config(&self) -> RemoteConfig {
        self.config.clone()
    }

    async fn get_release_by_tag(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<ReleaseByTagResponse> {
        let endpoint = api_endpoint(
            &self.base_uri,
            &["repos", owner, repo, "releases", "tags", tag],
        )?;

        debug!("fetching release {tag} of {owner}/{repo}");

        let release: GithubRelease =
            self.instance.get(endpoint, None::<&()>).await?;

        Ok(ReleaseByTagResponse {
            tag_name: release.tag_name,
            published_at: parse_published_at(release.published_at),
            body: release.body.unwrap_or_default(),
        })
    }

    async fn compare_commits(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<Comparison> {
        let range = format!("{base}...{head}");
        let endpoint = api_endpoint(
            &self.base_uri,
            &["repos", owner, repo, "compare", range.as_str()],
        )?;

        debug!("comparing {base}...{head} of {owner}/{repo}");

        let comparison: GithubComparison =
            self.instance.get(endpoint, None::<&()>).await?;

        Ok(Comparison {
            link: comparison.html_url,
            commits: comparison
                .commits
                .into_iter()
                .map(|c| ComparedCommit {
                    sha: c.sha,
                    link: c.html_url,
                    message: c.commit.message,
                })
                .collect(),
        })
    }

    async fn create_pr(&self, req: CreatePrRequest) -> Result<PullRequest> {
        let result = self
            .instance
            .pulls(&self.config.owner, &self.config.repo)
            .create(req.title, req.head_branch.clone(), req.base_branch)
            .body(req.body)
            .draft(req.draft)
            .send()
            .await;

        match result {
            Ok(pr) => Ok(PullRequest { number: pr.number }),
            Err(octocrab::Error::GitHub { source, .. })
                if is_duplicate_pr(
                    source.status_code,
                    &format!("{} {:?}", source.message, source.errors),
                ) =>
            {
                Err(DepbotError::DuplicatePullRequest {
                    branch: req.head_branch,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn add_pr_labels(&self, req: PrLabelsRequest) -> Result<()> {
        self.instance
            .issues(&self.config.owner, &self.config.repo)
            .add_labels(req.pr_number, &req.labels)
            .await?;

        Ok(())
    }

    async fn search_count(&self, query: &str) -> Result<u64> {
        let endpoint = api_endpoint(&self.base_uri, &["search", "issues"])?;

        debug!("searching issues: {query}");

        let result: SearchResult = self
            .instance
            .get(
                endpoint,
                Some(&SearchParams {
                    q: query.to_string(),
                }),
            )
            .await?;

        Ok(result.total_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_pr_requires_status_and_message() {
        let detail = "Validation Failed: A pull request already exists for \
                      owner:dependabot/bump_lodash.";

        assert!(is_duplicate_pr(StatusCode::UNPROCESSABLE_ENTITY, detail));
        assert!(!is_duplicate_pr(StatusCode::FORBIDDEN, detail));
        assert!(!is_duplicate_pr(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Validation Failed: No commits between master and branch"
        ));
    }

    #[test]
    fn builds_endpoints_under_the_api_base() {
        assert_eq!(
            api_endpoint("https://api.github.com", &["search", "issues"])
                .unwrap(),
            "https://api.github.com/search/issues"
        );
        assert_eq!(
            api_endpoint(
                "https://git.example.com/api/v3",
                &["repos", "acme", "webapp", "releases", "tags", "v1.0.0"],
            )
            .unwrap(),
            "https://git.example.com/api/v3/repos/acme/webapp/releases/tags/v1.0.0"
        );
    }

    #[test]
    fn encodes_tags_as_single_path_segments() {
        let release = api_endpoint(
            "https://api.github.com",
            &["repos", "acme", "mono", "releases", "tags", "pkg/v1.0.0"],
        )
        .unwrap();
        assert_eq!(
            release,
            "https://api.github.com/repos/acme/mono/releases/tags/pkg%2Fv1.0.0"
        );

        let compare = api_endpoint(
            "https://api.github.com",
            &["repos", "acme", "mono", "compare", "a#1%...b#2%"],
        )
        .unwrap();
        assert_eq!(
            compare,
            "https://api.github.com/repos/acme/mono/compare/a%231%25...b%232%25"
        );
    }

    #[test]
    fn parses_release_timestamps() {
        let parsed = parse_published_at(Some("2021-02-20T17:38:29Z".into()));
        assert_eq!(
            parsed.unwrap().format("%Y-%m-%d").to_string(),
            "2021-02-20"
        );

        assert!(parse_published_at(Some("yesterday".into())).is_none());
        assert!(parse_published_at(None).is_none());
    }

    #[test]
    fn deserializes_comparison_payload() {
        let payload = r#"{
            "html_url": "https://github.com/o/r/compare/v1...v2",
            "status": "ahead",
            "commits": [{
                "sha": "0123456789abcdef",
                "html_url": "https://github.com/o/r/commit/0123456789abcdef",
                "commit": { "message": "Fix #1\n\nbody" }
            }]
        }"#;

        let comparison: GithubComparison =
            serde_json::from_str(payload).unwrap();

        assert_eq!(comparison.commits.len(), 1);
        assert_eq!(comparison.commits[0].commit.message, "Fix #1\n\nbody");
    }
}
