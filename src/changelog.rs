//! Pull request body assembled from upstream release notes and commits.
//!
//! One update may skip several releases, so the body covers every version
//! between the current and the latest one: each transition gets a section
//! with the release notes of the newer tag and the commits since the
//! previous tag. Sections are rendered newest first.
use log::*;
use regex::{Captures, Regex};
use serde::Serialize;
use std::sync::LazyLock;

use crate::{
    error::Result,
    forge::{
        request::{ComparedCommit, Comparison, ReleaseByTagResponse},
        traits::Forge,
    },
    package::{PackageDescriptor, UpstreamCoordinates},
};

/// Maximum number of commits listed per version before linking out.
pub const NUMBER_OF_COMMITS_TO_DISPLAY: usize = 6;
/// Default prefix of upstream release tags.
pub const DEFAULT_TAG_PREFIX: &str = "v";

const SHORT_SHA_LEN: usize = 8;

const ENTRY_TEMPLATE_NAME: &str = "changelog_entry";

const ENTRY_TEMPLATE: &str = r#"
## {{ tag_name }}

<details>
<summary>Changelog</summary>
<blockquote>
<h2><a href="{{ compare_url }}">{{ version }}</a>{% if published %} ({{ published }}){% endif %}</h2>
{{ body }}
</blockquote>
</details>
<details>
<summary>Commits</summary>
<ul>
{% for commit in commits -%}
<li><a href="{{ commit.link }}">{{ commit.short_sha }}</a> {{ commit.subject }}</li>
{% endfor -%}
{% if overflow -%}
<a href="{{ compare_url }}">...</a>
{% endif -%}
</ul>
</details>

"#;

static ISSUE_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\d+)").unwrap());

/// Release notes and commit comparison for one version transition.
#[derive(Debug, Clone)]
struct ChangelogEntry {
    release: ReleaseByTagResponse,
    comparison: Comparison,
}

#[derive(Debug, Serialize)]
struct CommitContext {
    link: String,
    short_sha: String,
    subject: String,
}

#[derive(Debug, Serialize)]
struct EntryContext {
    tag_name: String,
    version: String,
    compare_url: String,
    published: Option<String>,
    body: String,
    commits: Vec<CommitContext>,
    overflow: bool,
}

/// Builds the changelog document of one update pull request.
pub struct ChangelogAggregator<'f> {
    forge: &'f dyn Forge,
    tag_prefix: String,
}

impl<'f> ChangelogAggregator<'f> {
    pub fn new(forge: &'f dyn Forge, tag_prefix: impl Into<String>) -> Self {
        Self {
            forge,
            tag_prefix: tag_prefix.into(),
        }
    }

    /// Render the changelog covering every version skipped by the update.
    ///
    /// Returns `None` when the package has no GitHub-hosted git repository.
    /// A version whose release or comparison cannot be fetched renders as
    /// an empty section.
    pub async fn build(
        &self,
        package: &PackageDescriptor,
    ) -> Result<Option<String>> {
        if !package.has_upstream_repository() {
            debug!("{} has no git repository: no changelog", package.name());
            return Ok(None);
        }

        let Some(coordinates) = package.resolve_upstream_coordinates() else {
            debug!("{} is not hosted on github: no changelog", package.name());
            return Ok(None);
        };

        let versions = package.later_versions()?;

        info!(
            "building changelog for {} across {} versions from {}/{}",
            package.name(),
            versions.len(),
            coordinates.owner,
            coordinates.repo
        );

        let mut entries = Vec::with_capacity(versions.len());
        let mut previous = package.current_version().to_string();

        for version in versions {
            let entry =
                self.fetch_entry(&coordinates, &previous, &version).await;
            entries.push(entry);
            previous = version;
        }

        let mut tera = tera::Tera::default();
        tera.add_raw_template(ENTRY_TEMPLATE_NAME, ENTRY_TEMPLATE)?;

        let mut sections = vec![];

        for entry in entries.iter().rev() {
            let section = match entry {
                Some(entry) => self.render_entry(&tera, entry)?,
                None => String::new(),
            };
            sections.push(section);
        }

        Ok(Some(format!(
            "# {}\n\n{}\n",
            package.pull_request_title(),
            sections.join("\n").trim()
        )))
    }

    fn tag(&self, version: &str) -> String {
        format!("{}{}", self.tag_prefix, version)
    }

    /// Fetch release notes and comparison of one transition together.
    async fn fetch_entry(
        &self,
        coordinates: &UpstreamCoordinates,
        previous: &str,
        version: &str,
    ) -> Option<ChangelogEntry> {
        let owner = coordinates.owner.as_str();
        let repo = coordinates.repo.as_str();
        let base = self.tag(previous);
        let head = self.tag(version);

        let (release, comparison) = tokio::join!(
            self.forge.get_release_by_tag(owner, repo, &head),
            self.forge.compare_commits(owner, repo, &base, &head),
        );

        match (release, comparison) {
            (Ok(release), Ok(comparison)) => Some(ChangelogEntry {
                release,
                comparison,
            }),
            (Err(err), _) | (_, Err(err)) => {
                warn!("skipping changelog section for {head}: {err}");
                None
            }
        }
    }

    fn render_entry(
        &self,
        tera: &tera::Tera,
        entry: &ChangelogEntry,
    ) -> Result<String> {
        let tag_name = entry.release.tag_name.clone();
        let version = tag_name
            .strip_prefix(&self.tag_prefix)
            .unwrap_or(&tag_name)
            .to_string();

        let commits = &entry.comparison.commits;

        let context = EntryContext {
            tag_name,
            version,
            compare_url: entry.comparison.link.clone(),
            published: entry
                .release
                .published_at
                .map(|d| d.format("%-m/%-d/%Y").to_string()),
            body: markdown_to_html(&entry.release.body),
            commits: commits
                .iter()
                .take(NUMBER_OF_COMMITS_TO_DISPLAY)
                .map(commit_context)
                .collect(),
            overflow: commits.len() > NUMBER_OF_COMMITS_TO_DISPLAY,
        };

        let context = tera::Context::from_serialize(&context)?;

        Ok(tera.render(ENTRY_TEMPLATE_NAME, &context)?)
    }
}

fn commit_context(commit: &ComparedCommit) -> CommitContext {
    CommitContext {
        link: commit.link.clone(),
        short_sha: commit.sha.chars().take(SHORT_SHA_LEN).collect(),
        subject: escape_commit_subject(commit),
    }
}

/// First line of the commit message with its first `#123` reference linked
/// to the upstream pull request.
fn escape_commit_subject(commit: &ComparedCommit) -> String {
    let base_url = commit
        .link
        .find("/commit")
        .map(|index| &commit.link[..index])
        .unwrap_or(&commit.link);

    let subject = commit.message.lines().next().unwrap_or_default();

    ISSUE_REFERENCE
        .replace(subject, |caps: &Captures| {
            format!("<a href=\"{base_url}/pull/{}\">{}</a>", &caps[1], &caps[0])
        })
        .to_string()
}

fn markdown_to_html(markdown: &str) -> String {
    let parser = pulldown_cmark::Parser::new_ext(
        markdown,
        pulldown_cmark::Options::ENABLE_TABLES
            | pulldown_cmark::Options::ENABLE_STRIKETHROUGH,
    );
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}
