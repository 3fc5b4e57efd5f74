//! The rebuild run, start to finish.
//!
//! ```text
//! CheckVersion -> (unchanged, not forced) NoChange
//!              -> StampVersion -> CommitVersionBump
//!              -> (dry run) Staged
//!              -> Build -> Publish -> CommitArtifacts -> Push -> Published
//! ```
//!
//! Any error aborts the remaining steps. External effects go through the
//! [`ReleaseFeed`], [`VersionControl`] and [`KernelBuilder`] seams.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::artifacts::PublishReport;
use crate::container::KernelBuilder;
use crate::release::{ReleaseFeed, ReleaseInfo};
use crate::stamp;
use crate::vcs::{self, CommitOutcome, VersionControl};

/// Default location of the build helper package.
pub const DEFAULT_BUILD_PATH: &str = "cmd/gokr-build-kernel";

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Package directory receiving `url.go`.
    pub build_path: PathBuf,
    /// Branch that receives the version bump.
    pub development_branch: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            build_path: PathBuf::from(DEFAULT_BUILD_PATH),
            development_branch: crate::config::DEFAULT_DEVELOPMENT_BRANCH.to_string(),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The stamped URL matched the committed one and no build was forced.
    NoChange { release: ReleaseInfo },
    /// Version bump committed and build branch created; build not requested.
    Staged { release: ReleaseInfo, branch: String },
    /// Kernel rebuilt, published, committed and pushed.
    Published {
        release: ReleaseInfo,
        branch: String,
        version_bump: CommitOutcome,
        artifacts: CommitOutcome,
        report: PublishReport,
    },
}

/// One rebuild run.
///
/// Without a builder the run is a dry run: it stops after creating the build
/// branch. With a builder it also rebuilds when the stamped URL is unchanged.
pub struct Pipeline<'a> {
    feed: &'a dyn ReleaseFeed,
    vcs: &'a dyn VersionControl,
    builder: Option<&'a dyn KernelBuilder>,
    options: PipelineOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        feed: &'a dyn ReleaseFeed,
        vcs: &'a dyn VersionControl,
        builder: Option<&'a dyn KernelBuilder>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            feed,
            vcs,
            builder,
            options,
        }
    }

    pub fn run(&self) -> Result<RunOutcome> {
        let release = self
            .feed
            .latest_stable()
            .context("Failed to determine the latest stable kernel")?;
        let branch = vcs::build_branch_name(&release.version)?;

        let url_file = stamp::write_url_fragment(&self.options.build_path, &release.source_url)?;
        let changed = self.vcs.is_modified(&url_file)?;
        if !changed && self.builder.is_none() {
            tracing::info!(version = %release.version, "no changes found, skipping the build");
            return Ok(RunOutcome::NoChange { release });
        }

        let version_bump = self.commit_version_bump(&release, &url_file)?;
        self.vcs.reset_branch(&branch)?;

        let Some(builder) = self.builder else {
            return Ok(RunOutcome::Staged { release, branch });
        };

        let report = builder.rebuild(&release)?;

        self.vcs.stage(&[PathBuf::from(".")])?;
        let artifacts = self.vcs.commit(&vcs::artifacts_message(&release.version))?;
        self.vcs
            .push(&branch)
            .with_context(|| format!("Failed to push {}", branch))?;

        Ok(RunOutcome::Published {
            release,
            branch,
            version_bump,
            artifacts,
            report,
        })
    }

    fn commit_version_bump(&self, release: &ReleaseInfo, url_file: &PathBuf) -> Result<CommitOutcome> {
        let development = &self.options.development_branch;
        self.vcs.checkout(development)?;
        self.vcs.stage(std::slice::from_ref(url_file))?;
        let outcome = self
            .vcs
            .commit(&vcs::version_bump_message(&release.version))?;
        self.vcs
            .push(development)
            .with_context(|| format!("Failed to push {}", development))?;
        Ok(outcome)
    }
}
