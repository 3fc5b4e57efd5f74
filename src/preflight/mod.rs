//! Preflight checks before a rebuild.
//!
//! A dry run only needs git; a build also needs go, a container engine and
//! every kernel file the publish step overwrites.

mod environment;
mod host_tools;
mod types;

use std::path::Path;

use anyhow::{bail, Result};

pub use types::{CheckResult, CheckStatus, PreflightReport};

/// What the upcoming run will need.
#[derive(Debug, Clone, Copy)]
pub struct PreflightScope<'a> {
    pub build: bool,
    pub build_path: &'a Path,
    pub kernel_tree: &'a Path,
    pub engine_override: Option<&'a str>,
}

/// Run all checks relevant to `scope`.
pub fn run_preflight(scope: &PreflightScope<'_>) -> PreflightReport {
    let mut checks = vec![host_tools::check_git()];
    checks.push(environment::check_work_tree());
    checks.push(environment::check_build_path(scope.build_path));

    if scope.build {
        checks.extend(host_tools::check_build_tools(scope.engine_override));
        checks.extend(environment::check_kernel_files(scope.kernel_tree));
    }

    PreflightReport { checks }
}

/// Run preflight and bail if any check fails.
pub fn run_preflight_or_fail(scope: &PreflightScope<'_>) -> Result<()> {
    let report = run_preflight(scope);

    if !report.all_passed() {
        report.print();
        bail!(
            "Preflight failed: {} check(s) failed. Fix the issues above before rebuilding.",
            report.fail_count()
        );
    }

    tracing::info!(
        checks = report.checks.len(),
        warnings = report.warn_count(),
        "preflight passed"
    );
    Ok(())
}
