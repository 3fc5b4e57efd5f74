//! Containerized kernel build.

use anyhow::{Context, Result};
use std::path::PathBuf;

use super::context::{BuildContext, PATCH_FILES};
use super::dockerfile::DockerfileParameters;
use super::{ContainerEngine, IMAGE_TAG};
use crate::artifacts::{ArtifactSet, PublishReport};
use crate::common::find_in;
use crate::process::Cmd;
use crate::release::ReleaseInfo;
use crate::timing::Timer;

/// Builds a kernel for a release and publishes it into the working tree.
#[cfg_attr(test, mockall::automock)]
pub trait KernelBuilder {
    fn rebuild(&self, release: &ReleaseInfo) -> Result<PublishReport>;
}

/// [`KernelBuilder`] compiling inside a podman or docker container.
pub struct ContainerKernelBuilder {
    engine: Box<dyn ContainerEngine>,
    helper_package: String,
    kernel_tree: PathBuf,
}

impl ContainerKernelBuilder {
    pub fn new(
        engine: Box<dyn ContainerEngine>,
        helper_package: impl Into<String>,
        kernel_tree: impl Into<PathBuf>,
    ) -> Self {
        Self {
            engine,
            helper_package: helper_package.into(),
            kernel_tree: kernel_tree.into(),
        }
    }

    fn locate_patches(&self) -> Result<Vec<PathBuf>> {
        PATCH_FILES
            .iter()
            .map(|name| find_in(name, &self.kernel_tree))
            .collect()
    }

    /// Assemble the build context: helper binary, patches, Dockerfile.
    pub fn prepare_context(&self) -> Result<BuildContext> {
        let mut ctx = BuildContext::create()?;
        ctx.build_helper(&self.helper_package)?;

        let patches = self.locate_patches()?;
        ctx.add_patches(&patches)?;

        let params = DockerfileParameters::for_current_user(
            PATCH_FILES.iter().map(|p| p.to_string()).collect(),
        );
        ctx.write_dockerfile(&params)?;
        Ok(ctx)
    }

    fn build_image(&self, ctx: &BuildContext) -> Result<()> {
        let name = self.engine.name();
        tracing::info!(engine = name, "building container for kernel compilation");
        Cmd::new(self.engine.program())
            .args(self.engine.build_args(IMAGE_TAG))
            .dir(ctx.path())
            .error_msg(format!("{} build failed", name))
            .run_interactive()?;
        Ok(())
    }

    fn compile(&self, ctx: &BuildContext) -> Result<()> {
        let name = self.engine.name();
        tracing::info!(engine = name, "compiling kernel");
        Cmd::new(self.engine.program())
            .args(self.engine.run_args(ctx.path(), IMAGE_TAG))
            .dir(ctx.path())
            .error_msg(format!("{} run failed", name))
            .run_interactive()?;
        Ok(())
    }
}

impl KernelBuilder for ContainerKernelBuilder {
    fn rebuild(&self, release: &ReleaseInfo) -> Result<PublishReport> {
        tracing::info!(version = %release.version, "rebuilding kernel");

        // Fail on a missing destination before spending an hour compiling.
        let artifacts = ArtifactSet::locate(&self.kernel_tree)?;

        let timer = Timer::start("Prepare build context");
        let ctx = self.prepare_context()?;
        timer.finish();

        let timer = Timer::start("Build image");
        self.build_image(&ctx)?;
        timer.finish();

        let timer = Timer::start("Compile kernel");
        self.compile(&ctx)?;
        timer.finish();

        let timer = Timer::start("Publish artifacts");
        let report = artifacts
            .publish(ctx.path())
            .with_context(|| format!("Failed to publish kernel {}", release.version))?;
        timer.finish();

        Ok(report)
    }
}
