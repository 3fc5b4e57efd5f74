//! Rebuild command - stamps the latest stable kernel and optionally builds it.

use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;
use crate::container::{self, ContainerKernelBuilder};
use crate::pipeline::{Pipeline, PipelineOptions, RunOutcome};
use crate::preflight::{self, PreflightScope};
use crate::release::HttpReleaseFeed;
use crate::vcs::Git;

/// Options of a rebuild run, as given on the command line.
#[derive(Debug, Clone)]
pub struct RebuildArgs {
    pub build_path: PathBuf,
    pub enable_build: bool,
    /// Container executable to use instead of autodetection. Empty means detect.
    pub overwrite_container_executable: String,
    pub skip_preflight: bool,
}

impl RebuildArgs {
    fn engine_override(&self) -> Option<&str> {
        Some(self.overwrite_container_executable.as_str()).filter(|s| !s.is_empty())
    }

    pub(crate) fn preflight_scope<'a>(&'a self, config: &'a Config) -> PreflightScope<'a> {
        PreflightScope {
            build: self.enable_build,
            build_path: &self.build_path,
            kernel_tree: &config.kernel_tree,
            engine_override: self.engine_override(),
        }
    }

    /// Command line that continues a dry run into the build.
    pub fn follow_up_command(&self) -> String {
        format!(
            "rebuild-kernel --build-path {} --enable-build",
            self.build_path.display()
        )
    }
}

/// Execute a rebuild run.
pub fn cmd_rebuild(args: &RebuildArgs, config: &Config) -> Result<RunOutcome> {
    if !args.skip_preflight {
        preflight::run_preflight_or_fail(&args.preflight_scope(config))?;
    }

    let feed = HttpReleaseFeed::new(config.releases_url.as_str());
    let git = Git::new(config.remote.as_str());

    // Resolve the engine up front so a missing podman/docker fails before any commit.
    let builder = if args.enable_build {
        let engine = container::select(args.engine_override())?;
        Some(ContainerKernelBuilder::new(
            engine,
            config.helper_package.as_str(),
            config.kernel_tree.as_path(),
        ))
    } else {
        None
    };

    let options = PipelineOptions {
        build_path: args.build_path.clone(),
        development_branch: config.development_branch.clone(),
    };
    let pipeline = Pipeline::new(
        &feed,
        &git,
        builder.as_ref().map(|b| b as &dyn container::KernelBuilder),
        options,
    );
    let outcome = pipeline.run()?;
    report(args, &outcome);
    Ok(outcome)
}

fn report(args: &RebuildArgs, outcome: &RunOutcome) {
    match outcome {
        RunOutcome::NoChange { release } => {
            println!("Kernel {} is already current. Nothing to do.", release.version);
        }
        RunOutcome::Staged { release, branch } => {
            println!();
            println!("=========================================");
            println!("Version bump to {} committed", release.version);
            println!("=========================================");
            println!("  Build branch: {}", branch);
            println!();
            println!("Build not enabled. To compile and publish the kernel, run:");
            println!("  {}", args.follow_up_command());
        }
        RunOutcome::Published {
            release,
            branch,
            report,
            ..
        } => {
            println!();
            println!("=========================================");
            println!("Kernel {} published on {}", release.version, branch);
            println!("=========================================");
            for file in &report.files {
                println!("  {}", file.display());
            }
            println!("  modules: {} files", report.module_files);
            println!("  vmlinuz sha256: {}", report.kernel_sha256);
        }
    }
}
