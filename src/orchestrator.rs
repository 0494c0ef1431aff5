//! Top-level update pipeline: discover dependencies, resolve their latest
//! versions, drop those already covered by an open pull request, then
//! update the rest one at a time.
use derive_builder::Builder;
use log::*;
use std::fmt;

use crate::{
    changelog::ChangelogAggregator,
    config::BotConfig,
    error::{DepbotError, Result},
    forge::{
        request::{CreatePrRequest, PrLabelsRequest},
        traits::Forge,
    },
    package::PackageDescriptor,
    package_manager::PackageManager,
    repo::VersionControl,
};

pub mod queue;

use queue::{UpdateQueue, UpdateTask};

/// Counters reported at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Dependencies listed by the package manager.
    pub discovered: usize,
    /// Dependencies neither ignored nor served by an unsupported adapter.
    pub updatable: usize,
    /// Updatable dependencies whose latest version differs.
    pub outdated: usize,
    /// Outdated dependencies skipped because a pull request is open.
    pub already_open: usize,
    pub updated: usize,
    pub failed: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "discovered: {}, updatable: {}, outdated: {}, already open: {}, \
             updated: {}, failed: {}",
            self.discovered,
            self.updatable,
            self.outdated,
            self.already_open,
            self.updated,
            self.failed
        )
    }
}

/// Outcome of a single update task.
#[derive(Debug, PartialEq, Eq)]
enum UpdateOutcome {
    Opened(u64),
    AlreadyOpen,
    Planned,
}

#[derive(Builder)]
#[builder(pattern = "owned", build_fn(private, name = "_build"))]
pub struct UpdateOrchestrator {
    config: BotConfig,
    forge: Box<dyn Forge>,
    vcs: Box<dyn VersionControl>,
    package_manager: PackageManager,
}

impl UpdateOrchestratorBuilder {
    pub fn build(self) -> Result<UpdateOrchestrator> {
        self._build().map_err(|e| {
            DepbotError::invalid_config(format!(
                "Failed to build update orchestrator: {}",
                e
            ))
        })
    }
}

impl UpdateOrchestrator {
    pub fn builder() -> UpdateOrchestratorBuilder {
        UpdateOrchestratorBuilder::default()
    }

    /// Run the whole pipeline once.
    ///
    /// Discovery, resolution and the open pull request search are fatal on
    /// failure. Failures inside a single update are logged and counted, and
    /// processing moves on to the next dependency.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        let mut packages = self.discover(&mut summary).await?;
        self.resolve(&mut packages).await?;
        let queue = self.filter(packages, &mut summary).await?;

        info!("{} dependencies to update", queue.len());
        self.update_all(queue, &mut summary).await;

        info!("{summary}");
        Ok(summary)
    }

    async fn discover(
        &self,
        summary: &mut RunSummary,
    ) -> Result<Vec<PackageDescriptor>> {
        let tokens = self.package_manager.list_dependencies().await?;
        summary.discovered = tokens.len();

        let mut packages = vec![];

        for token in tokens {
            let package = PackageDescriptor::parse(&token)?;
            if package.is_updatable(&self.config.ignore) {
                packages.push(package);
            } else {
                debug!("skipping {token}");
            }
        }

        summary.updatable = packages.len();
        info!(
            "found {} dependencies, {} updatable",
            summary.discovered, summary.updatable
        );

        Ok(packages)
    }

    async fn resolve(&self, packages: &mut [PackageDescriptor]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }

        let names = packages
            .iter()
            .map(|p| p.name().to_string())
            .collect::<Vec<_>>();

        for record in self.package_manager.lookup(&names).await? {
            match packages.iter_mut().find(|p| p.name() == record.name) {
                Some(package) => package.apply_lookup(record),
                None => debug!("ignoring lookup record for {}", record.name),
            }
        }

        Ok(())
    }

    /// Search query matching open update pull requests for `package`.
    fn open_pr_query(&self, package: &PackageDescriptor) -> String {
        let remote = self.forge.remote_config();
        format!(
            "\"{}\" in:title is:pr is:open repo:{}/{} label:{}",
            package.pull_request_title(),
            remote.owner,
            remote.repo,
            self.config.label
        )
    }

    async fn filter(
        &self,
        packages: Vec<PackageDescriptor>,
        summary: &mut RunSummary,
    ) -> Result<UpdateQueue> {
        let mut queue = UpdateQueue::new();

        for package in packages {
            if !package.is_update_needed() {
                debug!("{} is up to date", package.name());
                continue;
            }

            summary.outdated += 1;

            let count =
                self.forge.search_count(&self.open_pr_query(&package)).await?;

            if count > 0 {
                info!(
                    "pull request already open: {}",
                    package.pull_request_title()
                );
                summary.already_open += 1;
                continue;
            }

            queue.push(package);
        }

        Ok(queue)
    }

    async fn update_all(
        &self,
        mut queue: UpdateQueue,
        summary: &mut RunSummary,
    ) {
        while let Some(task) = queue.pop() {
            let name = task.descriptor.name().to_string();

            match self.update(task).await {
                Ok(UpdateOutcome::Opened(number)) => {
                    info!("opened pull request #{number} for {name}");
                    summary.updated += 1;
                }
                Ok(UpdateOutcome::AlreadyOpen) => {
                    summary.already_open += 1;
                }
                Ok(UpdateOutcome::Planned) => {}
                Err(err) => {
                    error!("failed to update {name}: {err}");
                    summary.failed += 1;
                }
            }
        }
    }

    async fn update(&self, task: UpdateTask) -> Result<UpdateOutcome> {
        let package = task.descriptor;
        let branch = package.branch_name();
        let title = package.pull_request_title();

        if self.config.dry_run {
            info!("dry run: would push {branch} and open \"{title}\"");
            return Ok(UpdateOutcome::Planned);
        }

        info!("{title}");

        // read-only, and fails on an unknown current version before the
        // working tree or the remote are touched
        let aggregator = ChangelogAggregator::new(
            self.forge.as_ref(),
            &self.config.tag_prefix,
        );
        let changelog = aggregator.build(&package).await?;

        self.vcs.create_branch_from_trunk(&branch)?;
        self.package_manager.upgrade(package.name()).await?;
        let commit = self
            .vcs
            .stage_and_commit(&self.config.repo_stage_paths(), &title)?;
        debug!("created commit {commit} on {branch}");
        self.vcs.push(&branch, true)?;

        let req = CreatePrRequest {
            head_branch: branch,
            base_branch: self.config.trunk.clone(),
            title,
            body: changelog.unwrap_or_default(),
            draft: true,
        };

        let pr = match self.forge.create_pr(req).await {
            Ok(pr) => pr,
            Err(DepbotError::DuplicatePullRequest { branch }) => {
                info!("pull request for {branch} already exists");
                return Ok(UpdateOutcome::AlreadyOpen);
            }
            Err(err) => return Err(err),
        };

        self.forge
            .add_pr_labels(PrLabelsRequest {
                pr_number: pr.number,
                labels: vec![self.config.label.clone()],
            })
            .await?;

        Ok(UpdateOutcome::Opened(pr.number))
    }
}
