//! rebuild-kernel - keeps the gokrazy kernel repository on the latest stable
//! Linux release.
//!
//! A run checks kernel.org for the newest stable release, stamps its tarball
//! URL into the build helper and commits the bump. With `--enable-build` it
//! also compiles the kernel in a podman/docker container and commits the
//! resulting kernel image, device trees and modules.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

use rebuild_kernel::commands::{self, RebuildArgs};
use rebuild_kernel::config::Config;
use rebuild_kernel::pipeline::DEFAULT_BUILD_PATH;

#[derive(Parser)]
#[command(name = "rebuild-kernel")]
#[command(about = "Rebuild the gokrazy kernel for the latest stable Linux release")]
#[command(
    after_help = "QUICK START:\n  rebuild-kernel                 Stamp and commit the latest version\n  rebuild-kernel --enable-build  Also compile and publish the kernel\n  rebuild-kernel preflight       Check host tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory of the build helper package that receives url.go
    #[arg(long, default_value = DEFAULT_BUILD_PATH, global = true)]
    build_path: PathBuf,

    /// Compile and publish the kernel (takes a long time). Also forces a
    /// build when the version did not change.
    #[arg(long, global = true)]
    enable_build: bool,

    /// Container executable to use instead of autodetecting podman or docker
    #[arg(long, default_value = "", global = true)]
    overwrite_container_executable: String,

    /// Release feed URL (overrides RELEASES_URL)
    #[arg(long, global = true)]
    releases_url: Option<String>,

    /// Skip preflight checks
    #[arg(long)]
    skip_preflight: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run preflight checks for the run the other flags describe
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    let mut config = Config::load();
    if let Some(url) = cli.releases_url {
        config.releases_url = url;
    }
    if cli.verbose {
        config.print();
    }

    let args = RebuildArgs {
        build_path: cli.build_path,
        enable_build: cli.enable_build,
        overwrite_container_executable: cli.overwrite_container_executable,
        skip_preflight: cli.skip_preflight,
    };

    match cli.command {
        Some(Commands::Preflight { strict }) => commands::cmd_preflight(&args, &config, strict)?,
        None => {
            commands::cmd_rebuild(&args, &config)?;
        }
    }

    Ok(())
}
