//! Tests for the per dependency update workflow.
//!
//! Tests for:
//! - branch, commit, push, pull request and label for one outdated dependency
//! - changelog in the pull request body
//! - duplicate pull requests treated as success
//! - a failed dependency not stopping the next one
//! - unknown current versions failing before any git or forge mutation

use mockall::predicate::eq;
use serde_json::json;

use super::common::*;
use crate::{
    config::default_stage_paths,
    error::DepbotError,
    forge::request::{Comparison, PullRequest, ReleaseByTagResponse},
    repo::MockVersionControl,
    runner::CommandOutput,
};

const LODASH_BRANCH: &str = "dependabot/bump_lodash_from_4.17.20_to_4.17.21";
const LODASH_TITLE: &str = "Bump lodash from 4.17.20 to 4.17.21";

fn lodash_runner() -> crate::runner::MockCommandRunner {
    let mut runner = mock_runner(
        &["lodash@npm:4.17.20", "react@npm:18.0.0"],
        vec![
            lookup_record("lodash", "4.17.21", &["4.17.20", "4.17.21"]),
            lookup_record("react", "18.0.0", &["17.0.0", "18.0.0"]),
        ],
    );
    expect_upgrade(&mut runner, "lodash");
    runner
}

fn expect_successful_git(vcs: &mut MockVersionControl, branch: &'static str) {
    vcs.expect_create_branch_from_trunk()
        .with(eq(branch))
        .times(1)
        .returning(|_| Ok(()));
    vcs.expect_stage_and_commit()
        .times(1)
        .returning(|_, _| Ok("0123abcd".into()));
    vcs.expect_push()
        .with(eq(branch), eq(true))
        .times(1)
        .returning(|_, _| Ok(()));
}

#[tokio::test]
async fn opens_one_labeled_draft_pull_request_per_outdated_dependency() {
    let runner = lodash_runner();

    let mut vcs = MockVersionControl::new();
    vcs.expect_create_branch_from_trunk()
        .with(eq(LODASH_BRANCH))
        .times(1)
        .returning(|_| Ok(()));
    vcs.expect_stage_and_commit()
        .withf(|paths, message| {
            paths == default_stage_paths().as_slice() && message == LODASH_TITLE
        })
        .times(1)
        .returning(|_, _| Ok("0123abcd".into()));
    vcs.expect_push()
        .with(eq(LODASH_BRANCH), eq(true))
        .times(1)
        .returning(|_, _| Ok(()));

    let mut forge = mock_forge();
    forge
        .expect_search_count()
        .withf(|q| q == open_pr_query(LODASH_TITLE))
        .times(1)
        .returning(|_| Ok(0));
    forge
        .expect_create_pr()
        .withf(|req| {
            req.head_branch == LODASH_BRANCH
                && req.base_branch == "master"
                && req.title == LODASH_TITLE
                && req.body.is_empty()
                && req.draft
        })
        .times(1)
        .returning(|_| Ok(PullRequest { number: 42 }));
    forge
        .expect_add_pr_labels()
        .withf(|req| req.pr_number == 42 && req.labels == vec!["dependencies"])
        .times(1)
        .returning(|_| Ok(()));

    let orchestrator =
        create_test_orchestrator(test_config(), forge, vcs, runner);

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.discovered, 2);
    assert_eq!(summary.outdated, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn pull_request_body_carries_the_changelog() {
    let mut runner = mock_runner(
        &["lodash@npm:4.17.20"],
        vec![json!({
            "name": "lodash",
            "version": "4.17.21",
            "versions": ["4.17.20", "4.17.21"],
            "repository": {
                "type": "git",
                "url": "git+https://github.com/lodash/lodash.git"
            }
        })],
    );
    expect_upgrade(&mut runner, "lodash");

    let mut vcs = MockVersionControl::new();
    expect_successful_git(&mut vcs, LODASH_BRANCH);

    let mut forge = mock_forge();
    forge.expect_search_count().returning(|_| Ok(0));
    forge
        .expect_get_release_by_tag()
        .withf(|owner, repo, tag| {
            owner == "lodash" && repo == "lodash" && tag == "v4.17.21"
        })
        .times(1)
        .returning(|_, _, tag| {
            Ok(ReleaseByTagResponse {
                tag_name: tag.to_string(),
                published_at: None,
                body: "Security fixes".into(),
            })
        });
    forge
        .expect_compare_commits()
        .withf(|_, _, base, head| base == "v4.17.20" && head == "v4.17.21")
        .times(1)
        .returning(|_, _, base, head| {
            Ok(Comparison {
                link: format!(
                    "https://github.com/lodash/lodash/compare/{base}...{head}"
                ),
                commits: vec![],
            })
        });
    forge
        .expect_create_pr()
        .withf(|req| {
            req.body.starts_with(&format!("# {LODASH_TITLE}\n\n## v4.17.21"))
                && req.body.contains("Security fixes")
        })
        .times(1)
        .returning(|_| Ok(PullRequest { number: 7 }));
    forge.expect_add_pr_labels().times(1).returning(|_| Ok(()));

    let orchestrator =
        create_test_orchestrator(test_config(), forge, vcs, runner);

    let summary = orchestrator.run().await.unwrap();
    assert_eq!(summary.updated, 1);
}

#[tokio::test]
async fn duplicate_pull_request_is_not_a_failure() {
    let runner = lodash_runner();

    let mut vcs = MockVersionControl::new();
    expect_successful_git(&mut vcs, LODASH_BRANCH);

    let mut forge = mock_forge();
    forge.expect_search_count().returning(|_| Ok(0));
    forge.expect_create_pr().times(1).returning(|req| {
        Err(DepbotError::DuplicatePullRequest {
            branch: req.head_branch,
        })
    });
    forge.expect_add_pr_labels().times(0);

    let orchestrator =
        create_test_orchestrator(test_config(), forge, vcs, runner);

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.failed, 0);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.already_open, 1);
}

#[tokio::test]
async fn failed_dependency_does_not_stop_the_next_one() {
    let mut runner = mock_runner(
        &["axios@npm:0.21.0", "lodash@npm:4.17.20"],
        vec![
            lookup_record("axios", "1.0.0", &["0.21.0", "1.0.0"]),
            lookup_record("lodash", "4.17.21", &["4.17.20", "4.17.21"]),
        ],
    );
    runner
        .expect_exec()
        .withf(|cmd, _| cmd == "yarn up \"axios\"")
        .times(1)
        .returning(|cmd, _| {
            Err(DepbotError::command_failed(cmd, "YN0001: resolution failed"))
        });
    expect_upgrade(&mut runner, "lodash");

    let mut vcs = MockVersionControl::new();
    vcs.expect_create_branch_from_trunk()
        .times(2)
        .returning(|_| Ok(()));
    vcs.expect_stage_and_commit()
        .withf(|_, message| message == LODASH_TITLE)
        .times(1)
        .returning(|_, _| Ok("0123abcd".into()));
    vcs.expect_push()
        .with(eq(LODASH_BRANCH), eq(true))
        .times(1)
        .returning(|_, _| Ok(()));

    let mut forge = mock_forge();
    forge.expect_search_count().times(2).returning(|_| Ok(0));
    forge
        .expect_create_pr()
        .withf(|req| req.title == LODASH_TITLE)
        .times(1)
        .returning(|_| Ok(PullRequest { number: 3 }));
    forge.expect_add_pr_labels().times(1).returning(|_| Ok(()));

    let orchestrator =
        create_test_orchestrator(test_config(), forge, vcs, runner);

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.outdated, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.updated, 1);
}

#[tokio::test]
async fn push_failure_skips_pull_request() {
    let runner = lodash_runner();

    let mut vcs = MockVersionControl::new();
    vcs.expect_create_branch_from_trunk().returning(|_| Ok(()));
    vcs.expect_stage_and_commit()
        .returning(|_, _| Ok("0123abcd".into()));
    vcs.expect_push().times(1).returning(|_, _| {
        Err(git2::Error::from_str("authentication required").into())
    });

    let mut forge = mock_forge();
    forge.expect_search_count().returning(|_| Ok(0));
    forge.expect_create_pr().times(0);

    let orchestrator =
        create_test_orchestrator(test_config(), forge, vcs, runner);

    let summary = orchestrator.run().await.unwrap();
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn upgrade_output_is_ignored() {
    let mut runner = mock_runner(
        &["lodash@npm:4.17.20"],
        vec![lookup_record("lodash", "4.17.21", &["4.17.20", "4.17.21"])],
    );
    runner
        .expect_exec()
        .withf(|cmd, _| cmd.starts_with("yarn up "))
        .times(1)
        .returning(|_, _| Ok(CommandOutput::Text("➤ YN0000: Done".into())));

    let mut vcs = MockVersionControl::new();
    expect_successful_git(&mut vcs, LODASH_BRANCH);

    let mut forge = mock_forge();
    forge.expect_search_count().returning(|_| Ok(0));
    forge
        .expect_create_pr()
        .returning(|_| Ok(PullRequest { number: 1 }));
    forge.expect_add_pr_labels().returning(|_| Ok(()));

    let orchestrator =
        create_test_orchestrator(test_config(), forge, vcs, runner);

    assert_eq!(orchestrator.run().await.unwrap().updated, 1);
}

#[tokio::test]
async fn unknown_current_version_fails_before_touching_the_repository() {
    // the registry no longer lists the installed version
    let runner = mock_runner(
        &["lodash@npm:4.17.20"],
        vec![json!({
            "name": "lodash",
            "version": "4.17.21",
            "versions": ["4.17.21"],
            "repository": {
                "type": "git",
                "url": "git+https://github.com/lodash/lodash.git"
            }
        })],
    );

    let mut vcs = MockVersionControl::new();
    vcs.expect_create_branch_from_trunk().times(0);
    vcs.expect_stage_and_commit().times(0);
    vcs.expect_push().times(0);

    let mut forge = mock_forge();
    forge.expect_search_count().times(1).returning(|_| Ok(0));
    forge.expect_get_release_by_tag().times(0);
    forge.expect_compare_commits().times(0);
    forge.expect_create_pr().times(0);
    forge.expect_add_pr_labels().times(0);

    let orchestrator =
        create_test_orchestrator(test_config(), forge, vcs, runner);

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.outdated, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.updated, 0);
}
