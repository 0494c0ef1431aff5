//! Git working tree operations for update branches.
//!
//! This module provides the version control collaborator of the update
//! workflow. Every update follows the same sequence against a single local
//! working tree:
//!
//! - create the update branch from trunk and check it out
//! - hard-reset the working tree to trunk
//! - stage and commit the manifest and lockfile changes
//! - force-push the branch to `origin`
//!
//! The working tree is shared mutable state, so callers must never
//! interleave two updates.
//!
//! # Authentication
//!
//! SSH remotes authenticate with a key served by the running ssh agent.
//! HTTPS remotes authenticate with the configured access token.
//!
//! # Usage
//!
//! ```rust,ignore
//! let repo = Repository::open(Path::new("."), settings)?;
//! repo.create_branch_from_trunk("dependabot/bump_lodash_from_1_to_2")?;
//! // run the package manager...
//! repo.stage_and_commit(&paths, "Bump lodash from 1 to 2")?;
//! repo.push("dependabot/bump_lodash_from_1_to_2", true)?;
//! ```
use derive_builder::Builder;
use git2::{BranchType, Cred, CredentialType, RemoteCallbacks, ResetType};
use log::*;
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;

#[cfg(test)]
use mockall::automock;

use crate::error::{DepbotError, Result};

/// Remote that update branches are pushed to.
pub const DEFAULT_REMOTE: &str = "origin";
/// Default trunk branch.
pub const DEFAULT_TRUNK: &str = "master";
/// Username GitHub expects for token authentication over https.
const TOKEN_USER: &str = "x-access-token";

/// Version control operations the update workflow relies on.
#[cfg_attr(test, automock)]
pub trait VersionControl {
    /// Create (or replace) `name` at trunk, check it out and reset the
    /// working tree to trunk.
    fn create_branch_from_trunk(&self, name: &str) -> Result<()>;

    /// Switch HEAD and the working tree to an existing local branch.
    fn checkout_branch(&self, name: &str) -> Result<()>;

    /// Discard every working tree change, returning to the trunk commit.
    fn hard_reset_to_trunk(&self) -> Result<()>;

    /// Stage `paths` (pathspecs, globs allowed) and commit them on HEAD.
    /// Returns the id of the new commit.
    fn stage_and_commit(&self, paths: &[String], message: &str)
    -> Result<String>;

    /// Push a local branch to the remote branch of the same name.
    fn push(&self, branch: &str, force: bool) -> Result<()>;
}

/// Identity and credentials used for commits and pushes.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct RepositorySettings {
    #[builder(default = "DEFAULT_TRUNK.to_string()")]
    pub trunk: String,
    #[builder(default = "DEFAULT_REMOTE.to_string()")]
    pub remote: String,
    pub committer_name: String,
    pub committer_email: String,
    /// Token used when the remote asks for plaintext credentials.
    #[builder(default = "SecretString::from(String::new())")]
    pub token: SecretString,
}

/// Local git repository wrapper implementing [`VersionControl`].
pub struct Repository {
    settings: RepositorySettings,
    repo: git2::Repository,
}

/// Create Git authentication callbacks.
///
/// SSH key requests are answered by the ssh agent; plaintext requests use
/// the access token. Anything else falls back to libgit2's default
/// credential lookup.
fn get_auth_callbacks<'r>(token: String) -> RemoteCallbacks<'r> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, username, allowed| {
        if allowed.contains(CredentialType::SSH_KEY) {
            return Cred::ssh_key_from_agent(username.unwrap_or("git"));
        }

        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT)
            && !token.is_empty()
        {
            return Cred::userpass_plaintext(TOKEN_USER, &token);
        }

        Cred::default()
    });
    callbacks
}

impl Repository {
    /// Open the existing repository at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is not inside a git repository or the
    /// trunk branch does not exist locally.
    pub fn open(path: &Path, settings: RepositorySettings) -> Result<Self> {
        let repo = git2::Repository::open(path)?;

        // fail early rather than on the first update
        repo.find_branch(&settings.trunk, BranchType::Local)
            .map_err(|err| {
                DepbotError::invalid_config(format!(
                    "trunk branch '{}' not found: {err}",
                    settings.trunk
                ))
            })?;

        info!(
            "opened repository at {} (trunk: {})",
            path.display(),
            settings.trunk
        );

        Ok(Self { settings, repo })
    }

    fn trunk_commit(&self) -> Result<git2::Commit<'_>> {
        let branch = self
            .repo
            .find_branch(&self.settings.trunk, BranchType::Local)?;
        Ok(branch.get().peel_to_commit()?)
    }

    /// Get the repository's working directory path.
    pub fn workdir(&self) -> Result<&Path> {
        self.repo.workdir().ok_or_else(|| {
            DepbotError::invalid_config("repository has no working directory")
        })
    }
}

impl VersionControl for Repository {
    fn create_branch_from_trunk(&self, name: &str) -> Result<()> {
        info!("creating branch {name} from {}", self.settings.trunk);
        let trunk = self.trunk_commit()?;
        // a failed earlier update may have left HEAD on `name`, and git
        // refuses to force-update the checked out branch
        self.repo.set_head_detached(trunk.id())?;
        // force: a stale local branch from a previous run is replaced
        self.repo.branch(name, &trunk, true)?;
        self.checkout_branch(name)?;
        self.hard_reset_to_trunk()
    }

    fn checkout_branch(&self, name: &str) -> Result<()> {
        debug!("switching to branch: {name}");
        let ref_name = format!("refs/heads/{name}");
        let target_obj = self.repo.revparse_single(&ref_name)?;
        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.force();
        self.repo.checkout_tree(&target_obj, Some(&mut checkout))?;
        self.repo.set_head(&ref_name)?;
        Ok(())
    }

    fn hard_reset_to_trunk(&self) -> Result<()> {
        debug!("resetting working tree to {}", self.settings.trunk);
        let trunk = self.trunk_commit()?;
        self.repo.reset(trunk.as_object(), ResetType::Hard, None)?;
        Ok(())
    }

    fn stage_and_commit(
        &self,
        paths: &[String],
        message: &str,
    ) -> Result<String> {
        debug!("staging paths: {:?}", paths);
        let mut index = self.repo.index()?;
        let pathspecs = || paths.iter().map(String::as_str);
        index.add_all(pathspecs(), git2::IndexAddOption::DEFAULT, None)?;
        // picks up deletions, which add_all ignores
        index.update_all(pathspecs(), None)?;
        index.write()?;

        let oid = index.write_tree()?;
        let tree = self.repo.find_tree(oid)?;
        let parent_commit = self.repo.head()?.peel_to_commit()?;
        let committer = git2::Signature::now(
            &self.settings.committer_name,
            &self.settings.committer_email,
        )?;

        debug!("committing changes with msg: {message}");

        let commit_id = self.repo.commit(
            Some("HEAD"),
            &committer,
            &committer,
            message,
            &tree,
            &[&parent_commit],
        )?;

        Ok(commit_id.to_string())
    }

    fn push(&self, branch: &str, force: bool) -> Result<()> {
        info!("pushing branch {branch} (force: {force})");
        let token = self.settings.token.expose_secret().to_string();
        let mut push_opts = git2::PushOptions::default();
        push_opts.remote_callbacks(get_auth_callbacks(token));

        let mut remote = self.repo.find_remote(&self.settings.remote)?;

        // + indicates "force" push
        let prefix = if force { "+" } else { "" };
        let ref_spec =
            format!("{prefix}refs/heads/{branch}:refs/heads/{branch}");
        remote.push(&[ref_spec], Some(&mut push_opts))?;

        Ok(())
    }
}
