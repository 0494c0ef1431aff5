use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct GithubRelease {
    pub tag_name: String,
    pub published_at: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GithubCommitDetail {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct GithubCommit {
    pub sha: String,
    pub html_url: String,
    pub commit: GithubCommitDetail,
}

#[derive(Debug, Deserialize)]
pub struct GithubComparison {
    pub html_url: String,
    #[serde(default)]
    pub commits: Vec<GithubCommit>,
}

#[derive(Debug, Serialize)]
pub struct SearchParams {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    pub total_count: u64,
}
