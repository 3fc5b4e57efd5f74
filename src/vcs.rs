//! Git driver.
//!
//! The rebuild records two commits: the version bump on the development
//! branch, and the published artifacts on a `build-<version>` branch. Both
//! go through the [`VersionControl`] trait so the pipeline can be exercised
//! without a repository.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::process::Cmd;

/// Result of a commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new commit was recorded.
    Created,
    /// The index had nothing to record.
    NothingToCommit,
}

/// Operations the pipeline needs from version control.
#[cfg_attr(test, mockall::automock)]
pub trait VersionControl {
    /// True if `path` differs from what is committed (or is untracked).
    fn is_modified(&self, path: &Path) -> Result<bool>;
    /// Switch to an existing branch.
    fn checkout(&self, branch: &str) -> Result<()>;
    /// Create `branch` at HEAD, or reset it there if it exists, and switch to it.
    fn reset_branch(&self, branch: &str) -> Result<()>;
    /// Stage the given paths.
    fn stage(&self, paths: &[PathBuf]) -> Result<()>;
    /// Commit the index.
    fn commit(&self, message: &str) -> Result<CommitOutcome>;
    /// Push `branch` to the configured remote.
    fn push(&self, branch: &str) -> Result<()>;
}

/// [`VersionControl`] backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: Option<PathBuf>,
    remote: String,
}

impl Git {
    /// Git operating on the current directory.
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            workdir: None,
            remote: remote.into(),
        }
    }

    /// Git operating on the repository at `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            workdir: Some(dir.into()),
            remote: remote.into(),
        }
    }

    fn git(&self) -> Cmd {
        let cmd = Cmd::new("git");
        match &self.workdir {
            Some(dir) => cmd.dir(dir),
            None => cmd,
        }
    }
}

impl VersionControl for Git {
    fn is_modified(&self, path: &Path) -> Result<bool> {
        let result = self
            .git()
            .args(["status", "--short", "--"])
            .arg(path)
            .error_msg(format!("git status {} failed", path.display()))
            .run()?;
        Ok(!result.stdout_trimmed().is_empty())
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        self.git()
            .args(["checkout", branch])
            .error_msg(format!("git checkout {} failed", branch))
            .run()?;
        tracing::info!(branch, "checked out branch");
        Ok(())
    }

    fn reset_branch(&self, branch: &str) -> Result<()> {
        self.git()
            .args(["checkout", "-B", branch])
            .error_msg(format!("git checkout -B {} failed", branch))
            .run()?;
        tracing::info!(branch, "switched to build branch");
        Ok(())
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        self.git()
            .args(["add", "--"])
            .args(paths)
            .error_msg("git add failed")
            .run()?;
        tracing::debug!(?paths, "staged");
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<CommitOutcome> {
        let result = self
            .git()
            .args(["commit", "-m", message])
            .allow_fail()
            .run()?;

        match result.code() {
            0 => {
                tracing::info!(message, "committed");
                Ok(CommitOutcome::Created)
            }
            1 => {
                tracing::warn!(
                    message,
                    output = %result.combined().trim(),
                    "nothing to commit, continuing"
                );
                Ok(CommitOutcome::NothingToCommit)
            }
            code => bail!(
                "git commit failed (exit code {}):\n{}",
                code,
                result.combined().trim()
            ),
        }
    }

    fn push(&self, branch: &str) -> Result<()> {
        let result = self
            .git()
            .args(["push", self.remote.as_str(), branch])
            .allow_fail()
            .run()?;

        if !result.success() {
            tracing::error!(
                remote = %self.remote,
                branch,
                output = %result.combined().trim(),
                "push failed"
            );
            bail!(
                "git push {} {} failed (exit code {})",
                self.remote,
                branch,
                result.code()
            );
        }
        tracing::info!(remote = %self.remote, branch, "pushed");
        Ok(())
    }
}

/// Name of the branch that carries the artifacts built for `version`.
///
/// The version comes straight from the release feed, so it is checked against
/// git's ref-name rules before it is used in `checkout -B` and `push`.
pub fn build_branch_name(version: &str) -> Result<String> {
    validate_ref_component(version)
        .with_context(|| format!("release version {:?} cannot be used in a branch name", version))?;
    Ok(format!("build-{}", version))
}

fn validate_ref_component(s: &str) -> Result<()> {
    if s.is_empty() {
        bail!("empty");
    }
    if let Some(c) = s
        .chars()
        .find(|c| c.is_ascii_control() || matches!(c, ' ' | '~' | '^' | ':' | '?' | '*' | '[' | '\\' | '/'))
    {
        bail!("contains {:?}", c);
    }
    if s.contains("..") || s.contains("@{") {
        bail!("contains a forbidden sequence");
    }
    if s.starts_with('.') || s.ends_with('.') || s.ends_with(".lock") {
        bail!("has a forbidden prefix or suffix");
    }
    if s == "@" {
        bail!("is a reserved name");
    }
    Ok(())
}

/// Message for the commit that stamps a new release.
pub fn version_bump_message(version: &str) -> String {
    format!("Upgrade to version {}", version)
}

/// Message for the commit that records the rebuilt artifacts.
pub fn artifacts_message(version: &str) -> String {
    format!("Built to version {}", version)
}
