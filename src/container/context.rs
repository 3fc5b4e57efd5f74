//! Build context: the temporary directory handed to the image build.
//!
//! It holds the helper binary, the kernel patches and the Dockerfile. The
//! container later writes its results back into the same directory through
//! the bind mount. The directory is removed when the context is dropped.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::dockerfile::{DockerfileParameters, HELPER_BINARY};
use crate::common::copy_file_preserving_mode;
use crate::process::Cmd;

/// Kernel patches applied inside the container, in application order.
pub const PATCH_FILES: &[&str] = &[
    "0001-Revert-add-index-to-the-ethernet-alias.patch",
    // spi
    "0201-enable-spidev.patch",
    // logo
    "0001-gokrazy-logo.patch",
];

/// Prefix of the temporary directory name.
const CONTEXT_PREFIX: &str = "gokr-rebuild-kernel";

/// Temporary directory assembled as input to the container build.
pub struct BuildContext {
    dir: TempDir,
    patches: Vec<PathBuf>,
}

impl BuildContext {
    /// Create a fresh context under `/tmp`.
    ///
    /// `/tmp` rather than `$TMPDIR`: Docker Desktop only shares a few host
    /// paths with its VM, and `/tmp` is one of them.
    pub fn create() -> Result<Self> {
        Self::create_in(Path::new("/tmp"))
    }

    /// Create a fresh context below `parent`.
    pub fn create_in(parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(CONTEXT_PREFIX)
            .tempdir_in(parent)
            .with_context(|| format!("Failed to create build context in {}", parent.display()))?;
        tracing::debug!(path = %dir.path().display(), "created build context");
        Ok(Self {
            dir,
            patches: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Paths of the patches copied into the context.
    pub fn patches(&self) -> &[PathBuf] {
        &self.patches
    }

    /// Install the Go helper package into the context as a static linux binary.
    pub fn build_helper(&self, package: &str) -> Result<PathBuf> {
        Cmd::new("go")
            .args(["install", package])
            .env("GOOS", "linux")
            .env("CGO_ENABLED", "0")
            .env("GOBIN", self.path())
            .error_msg(format!("go install {} failed", package))
            .run()?;

        let helper = self.path().join(HELPER_BINARY);
        if !helper.is_file() {
            anyhow::bail!(
                "go install {} did not produce {}",
                package,
                helper.display()
            );
        }
        tracing::info!(path = %helper.display(), "built helper binary");
        Ok(helper)
    }

    /// Copy each patch into the context root under its file name.
    pub fn add_patches(&mut self, sources: &[PathBuf]) -> Result<()> {
        for src in sources {
            let name = src
                .file_name()
                .with_context(|| format!("Patch path {} has no file name", src.display()))?;
            let dest = self.path().join(name);
            copy_file_preserving_mode(src, &dest)?;
            self.patches.push(dest);
        }
        tracing::debug!(count = sources.len(), "copied patches into build context");
        Ok(())
    }

    /// Render the Dockerfile into the context root.
    pub fn write_dockerfile(&self, params: &DockerfileParameters) -> Result<PathBuf> {
        let path = self.path().join("Dockerfile");
        std::fs::write(&path, params.render())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
