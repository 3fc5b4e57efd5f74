//! Container engine selection and invocation arguments.
//!
//! The kernel is compiled inside a throwaway image. Podman and Docker take
//! the same build arguments; they differ only in how the container is run:
//! rootless podman needs `--userns=keep-id` so files written to the bind
//! mount belong to the invoking user.

pub mod builder;
pub mod context;
pub mod dockerfile;

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

pub use builder::{ContainerKernelBuilder, KernelBuilder};
pub use context::BuildContext;
pub use dockerfile::DockerfileParameters;

/// Tag of the image the kernel is compiled in.
pub const IMAGE_TAG: &str = "gokr-rebuild-kernel";

/// Where the build context is mounted inside the container.
pub const RESULT_MOUNT: &str = "/tmp/buildresult";

/// Engines probed on `PATH`, in order of preference. Podman comes first
/// because `docker` is often a thin wrapper around podman.
pub const ENGINE_PREFERENCE: [&str; 2] = ["podman", "docker"];

/// A container engine capable of building and running the kernel image.
pub trait ContainerEngine {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Executable invoked for build and run.
    fn program(&self) -> &Path;

    /// Flags placed between `run` and the common run arguments.
    fn run_flags(&self) -> &'static [&'static str];

    /// Arguments for building the image from the context directory (`.`).
    fn build_args(&self, tag: &str) -> Vec<String> {
        vec![
            "build".to_string(),
            "--rm=true".to_string(),
            format!("--tag={}", tag),
            ".".to_string(),
        ]
    }

    /// Arguments for running the image with `context_dir` bind-mounted.
    fn run_args(&self, context_dir: &Path, tag: &str) -> Vec<String> {
        let mut args = vec!["run".to_string()];
        args.extend(self.run_flags().iter().map(|f| f.to_string()));
        args.push("--rm".to_string());
        args.push("--volume".to_string());
        args.push(format!("{}:{}:Z", context_dir.display(), RESULT_MOUNT));
        args.push(tag.to_string());
        args
    }
}

/// Rootless-capable podman.
#[derive(Debug, Clone)]
pub struct Podman {
    program: PathBuf,
}

impl Podman {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ContainerEngine for Podman {
    fn name(&self) -> &'static str {
        "podman"
    }

    fn program(&self) -> &Path {
        &self.program
    }

    fn run_flags(&self) -> &'static [&'static str] {
        &["--userns=keep-id"]
    }
}

#[derive(Debug, Clone)]
pub struct Docker {
    program: PathBuf,
}

impl Docker {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ContainerEngine for Docker {
    fn name(&self) -> &'static str {
        "docker"
    }

    fn program(&self) -> &Path {
        &self.program
    }

    fn run_flags(&self) -> &'static [&'static str] {
        &[]
    }
}

/// Pick the engine implementation from the executable's file name.
///
/// Anything not named `podman` is driven like docker.
pub fn engine_for(program: impl Into<PathBuf>) -> Box<dyn ContainerEngine> {
    let program = program.into();
    let is_podman = program
        .file_name()
        .map(|n| n == "podman")
        .unwrap_or(false);
    if is_podman {
        Box::new(Podman::new(program))
    } else {
        Box::new(Docker::new(program))
    }
}

/// Find the preferred container executable on `PATH`, with symlinks resolved.
pub fn detect() -> Result<PathBuf> {
    for name in ENGINE_PREFERENCE {
        let Ok(found) = which::which(name) else {
            continue;
        };
        let resolved = found
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", found.display()))?;
        tracing::debug!(found = %found.display(), resolved = %resolved.display(), "container engine");
        return Ok(resolved);
    }
    bail!("none of {:?} found in $PATH", ENGINE_PREFERENCE)
}

/// Engine from an explicit override, or autodetected when none is given.
pub fn select(overwrite: Option<&str>) -> Result<Box<dyn ContainerEngine>> {
    let program = match overwrite.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => PathBuf::from(name),
        None => detect()?,
    };
    let engine = engine_for(program);
    tracing::info!(engine = engine.name(), program = %engine.program().display(), "selected container engine");
    Ok(engine)
}
