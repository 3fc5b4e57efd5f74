//! End-to-end runs against a real git repository with a bare remote.
//!
//! The release feed and the kernel build are replaced by in-process fakes;
//! everything git does is real. Tests return early when git is missing.

mod helpers;

use anyhow::Result;
use helpers::{assert_file_contains, have_git, GitFixture};
use rebuild_kernel::artifacts::PublishReport;
use rebuild_kernel::container::KernelBuilder;
use rebuild_kernel::pipeline::{Pipeline, PipelineOptions, RunOutcome};
use rebuild_kernel::release::{ReleaseError, ReleaseFeed, ReleaseInfo};
use rebuild_kernel::vcs::{CommitOutcome, Git};
use std::cell::Cell;
use std::fs;
use std::path::PathBuf;

struct StaticFeed(ReleaseInfo);

impl ReleaseFeed for StaticFeed {
    fn latest_stable(&self) -> Result<ReleaseInfo, ReleaseError> {
        Ok(self.0.clone())
    }
}

/// Writes a fake kernel image into the repository instead of compiling.
struct FakeBuilder {
    repo: PathBuf,
    calls: Cell<usize>,
}

impl KernelBuilder for FakeBuilder {
    fn rebuild(&self, release: &ReleaseInfo) -> Result<PublishReport> {
        self.calls.set(self.calls.get() + 1);
        let kernel = self.repo.join("vmlinuz");
        fs::write(&kernel, format!("kernel {}", release.version))?;
        Ok(PublishReport {
            files: vec![kernel],
            pruned: Vec::new(),
            module_files: 0,
            kernel_sha256: String::new(),
        })
    }
}

fn release(version: &str) -> ReleaseInfo {
    ReleaseInfo {
        version: version.to_string(),
        source_url: format!("https://cdn.kernel.org/pub/linux/kernel/v6.x/linux-{}.tar.xz", version),
        is_end_of_life: false,
    }
}

fn options(fixture: &GitFixture) -> PipelineOptions {
    PipelineOptions {
        build_path: fixture.work.join("cmd/gokr-build-kernel"),
        development_branch: "development".to_string(),
    }
}

#[test]
fn test_dry_run_commits_bump_and_creates_build_branch() {
    if !have_git() {
        return;
    }
    let fixture = GitFixture::new();
    let git = Git::in_dir(&fixture.work, "origin");
    let feed = StaticFeed(release("6.1.5"));

    let outcome = Pipeline::new(&feed, &git, None, options(&fixture))
        .run()
        .expect("dry run should succeed");

    assert_eq!(
        outcome,
        RunOutcome::Staged {
            release: release("6.1.5"),
            branch: "build-6.1.5".to_string(),
        }
    );
    assert_file_contains(
        &fixture.work.join("cmd/gokr-build-kernel/url.go"),
        "var latest = \"https://cdn.kernel.org/pub/linux/kernel/v6.x/linux-6.1.5.tar.xz\"",
    );
    assert_eq!(fixture.remote_subject("development"), "Upgrade to version 6.1.5");
    assert_eq!(
        helpers::git(&fixture.work, &["rev-parse", "--abbrev-ref", "HEAD"]),
        "build-6.1.5"
    );
}

#[test]
fn test_second_dry_run_is_no_change() {
    if !have_git() {
        return;
    }
    let fixture = GitFixture::new();
    let git = Git::in_dir(&fixture.work, "origin");
    let feed = StaticFeed(release("6.1.5"));

    Pipeline::new(&feed, &git, None, options(&fixture))
        .run()
        .unwrap();
    let before = helpers::git(&fixture.remote, &["rev-parse", "development"]);

    let outcome = Pipeline::new(&feed, &git, None, options(&fixture))
        .run()
        .unwrap();

    assert_eq!(outcome, RunOutcome::NoChange { release: release("6.1.5") });
    assert_eq!(helpers::git(&fixture.remote, &["rev-parse", "development"]), before);
}

#[test]
fn test_build_publishes_on_build_branch() {
    if !have_git() {
        return;
    }
    let fixture = GitFixture::new();
    let git = Git::in_dir(&fixture.work, "origin");
    let feed = StaticFeed(release("6.1.6"));
    let builder = FakeBuilder {
        repo: fixture.work.clone(),
        calls: Cell::new(0),
    };

    let outcome = Pipeline::new(&feed, &git, Some(&builder), options(&fixture))
        .run()
        .expect("build run should succeed");

    assert_eq!(builder.calls.get(), 1);
    match outcome {
        RunOutcome::Published {
            branch,
            version_bump,
            artifacts,
            ..
        } => {
            assert_eq!(branch, "build-6.1.6");
            assert_eq!(version_bump, CommitOutcome::Created);
            assert_eq!(artifacts, CommitOutcome::Created);
        }
        other => panic!("expected Published, got {:?}", other),
    }
    assert_eq!(fixture.remote_subject("development"), "Upgrade to version 6.1.6");
    assert_eq!(fixture.remote_subject("build-6.1.6"), "Built to version 6.1.6");
    assert_eq!(
        helpers::git(&fixture.remote, &["show", "build-6.1.6:vmlinuz"]),
        "kernel 6.1.6"
    );
}

#[test]
fn test_forced_build_with_unchanged_version_tolerates_empty_bump() {
    if !have_git() {
        return;
    }
    let fixture = GitFixture::new();
    let git = Git::in_dir(&fixture.work, "origin");
    let feed = StaticFeed(release("6.1.5"));

    Pipeline::new(&feed, &git, None, options(&fixture))
        .run()
        .unwrap();
    helpers::git(&fixture.work, &["checkout", "-q", "development"]);

    let builder = FakeBuilder {
        repo: fixture.work.clone(),
        calls: Cell::new(0),
    };
    let outcome = Pipeline::new(&feed, &git, Some(&builder), options(&fixture))
        .run()
        .unwrap();

    match outcome {
        RunOutcome::Published { version_bump, .. } => {
            assert_eq!(version_bump, CommitOutcome::NothingToCommit);
        }
        other => panic!("expected Published, got {:?}", other),
    }
    assert_eq!(fixture.remote_subject("build-6.1.5"), "Built to version 6.1.5");
}

#[test]
fn test_push_to_missing_remote_is_fatal() {
    if !have_git() {
        return;
    }
    let fixture = GitFixture::new();
    let git = Git::in_dir(&fixture.work, "nonexistent");
    let feed = StaticFeed(release("6.1.5"));

    let err = Pipeline::new(&feed, &git, None, options(&fixture))
        .run()
        .unwrap_err();

    assert!(format!("{:#}", err).contains("Failed to push development"));
    assert_eq!(
        helpers::git(&fixture.work, &["rev-parse", "--abbrev-ref", "HEAD"]),
        "development",
        "no build branch after a failed push"
    );
}
