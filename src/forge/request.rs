use chrono::{DateTime, Utc};

/// Release metadata for one upstream tag.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseByTagResponse {
    pub tag_name: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Release notes as written on the forge (Markdown).
    pub body: String,
}

/// One commit of a comparison between two tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparedCommit {
    pub sha: String,
    /// Web URL of the commit, `{repo web url}/commit/{sha}`.
    pub link: String,
    pub message: String,
}

/// Commits between two tags and the web URL of the comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub link: String,
    pub commits: Vec<ComparedCommit>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Request to create a new pull request.
pub struct CreatePrRequest {
    pub head_branch: String,
    pub base_branch: String,
    pub title: String,
    pub body: String,
    pub draft: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Request to add labels to a pull request.
pub struct PrLabelsRequest {
    pub pr_number: u64,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Pull request information.
pub struct PullRequest {
    pub number: u64,
}
