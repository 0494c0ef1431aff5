//! Traits related to remote git forges
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::{
    error::Result,
    forge::{
        config::RemoteConfig,
        request::{
            Comparison, CreatePrRequest, PrLabelsRequest, PullRequest,
            ReleaseByTagResponse,
        },
    },
};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Forge: Send + Sync {
    /// Connection settings of the repository receiving pull requests.
    fn remote_config(&self) -> RemoteConfig;

    /// Release published for `tag` in an upstream repository.
    async fn get_release_by_tag(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<ReleaseByTagResponse>;

    /// Commits between `base` and `head` in an upstream repository.
    async fn compare_commits(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<Comparison>;

    /// Open a pull request on the configured repository. Fails with
    /// `DepbotError::DuplicatePullRequest` when one already exists for the
    /// head branch.
    async fn create_pr(&self, req: CreatePrRequest) -> Result<PullRequest>;

    async fn add_pr_labels(&self, req: PrLabelsRequest) -> Result<()>;

    /// Number of issues and pull requests matching a search query.
    async fn search_count(&self, query: &str) -> Result<u64>;
}
