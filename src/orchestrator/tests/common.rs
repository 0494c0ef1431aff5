//! Common test utilities for orchestrator tests.

use regex::Regex;
use serde_json::{Value, json};

use crate::{
    config::BotConfig,
    forge::{config::RemoteConfig, traits::MockForge},
    orchestrator::UpdateOrchestrator,
    package_manager::PackageManager,
    repo::MockVersionControl,
    runner::{CommandOutput, MockCommandRunner},
};

pub const OWNER: &str = "acme";
pub const REPO: &str = "webapp";

pub fn test_config() -> BotConfig {
    BotConfig::builder()
        .workspace("/repo")
        .ignore(vec![Regex::new("^@types/").unwrap()])
        .build()
        .unwrap()
}

pub fn remote_config() -> RemoteConfig {
    RemoteConfig {
        owner: OWNER.into(),
        repo: REPO.into(),
        ..Default::default()
    }
}

/// Forge mock that already answers `remote_config`.
pub fn mock_forge() -> MockForge {
    let mut forge = MockForge::new();
    forge.expect_remote_config().returning(remote_config);
    forge
}

/// Search query the orchestrator sends for `title`.
pub fn open_pr_query(title: &str) -> String {
    format!(
        "\"{title}\" in:title is:pr is:open repo:{OWNER}/{REPO} label:dependencies"
    )
}

/// Registry lookup record without upstream repository.
pub fn lookup_record(name: &str, latest: &str, versions: &[&str]) -> Value {
    json!({"name": name, "version": latest, "versions": versions})
}

/// Runner mock answering the dependency listing and the batched lookup.
pub fn mock_runner(tokens: &[&str], records: Vec<Value>) -> MockCommandRunner {
    let tokens = tokens.iter().map(|t| json!(t)).collect::<Vec<_>>();
    let mut runner = MockCommandRunner::new();

    runner
        .expect_exec()
        .withf(|cmd, _| cmd == "yarn info --name-only")
        .returning(move |_, _| Ok(CommandOutput::Records(tokens.clone())));

    runner
        .expect_exec()
        .withf(|cmd, _| cmd.starts_with("yarn npm info "))
        .returning(move |_, _| Ok(CommandOutput::Records(records.clone())));

    runner
}

/// Expect exactly one successful `yarn up` for `name`.
pub fn expect_upgrade(runner: &mut MockCommandRunner, name: &str) {
    let command = format!("yarn up \"{name}\"");
    runner
        .expect_exec()
        .withf(move |cmd, opts| cmd == command && !opts.json_output)
        .times(1)
        .returning(|_, _| Ok(CommandOutput::Text(String::new())));
}

/// Creates a test orchestrator from mocks with expectations already set.
pub fn create_test_orchestrator(
    config: BotConfig,
    forge: MockForge,
    vcs: MockVersionControl,
    runner: MockCommandRunner,
) -> UpdateOrchestrator {
    let package_manager =
        PackageManager::new(Box::new(runner), "yarn", config.client_directory());

    UpdateOrchestrator::builder()
        .config(config)
        .forge(Box::new(forge))
        .vcs(Box::new(vcs))
        .package_manager(package_manager)
        .build()
        .unwrap()
}
