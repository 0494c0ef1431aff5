//! Dependency update bot for Yarn projects hosted on GitHub.
//!
//! Lists the dependencies of a project, looks up their latest versions and
//! opens one draft pull request per outdated dependency, annotated with a
//! changelog built from the upstream repository's releases and commits.
pub mod changelog;
pub mod cli;
pub mod config;
pub mod error;
pub mod forge;
pub mod orchestrator;
pub mod package;
pub mod package_manager;
mod path_helpers;
pub mod repo;
pub mod runner;

pub use error::{DepbotError, Result};
pub use orchestrator::{RunSummary, UpdateOrchestrator};
