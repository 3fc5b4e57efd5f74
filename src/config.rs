//! Configuration management for rebuild-kernel.
//!
//! Values come from the process environment (a `.env` file is loaded by
//! `main` before this runs). Command-line flags override what is read here.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::process::Cmd;

/// Upstream kernel release feed.
pub const DEFAULT_RELEASES_URL: &str = "https://www.kernel.org/releases.json";

/// Go package of the helper that runs inside the container and builds the kernel.
pub const DEFAULT_HELPER_PACKAGE: &str =
    "development.thatwebsite.xyz/gokrazy/kernel/cmd/gokr-build-kernel";

/// Import path of the kernel repository below `$GOPATH/src`.
const KERNEL_IMPORT_PATH: &str = "development.thatwebsite.xyz/gokrazy/kernel";

pub const DEFAULT_DEVELOPMENT_BRANCH: &str = "development";
pub const DEFAULT_REMOTE: &str = "origin";

/// rebuild-kernel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Release feed URL (RELEASES_URL)
    pub releases_url: String,
    /// Fallback checkout of the kernel repository (KERNEL_TREE)
    pub kernel_tree: PathBuf,
    /// Go package built into the container (HELPER_PACKAGE)
    pub helper_package: String,
    /// Branch receiving the version bump (DEVELOPMENT_BRANCH)
    pub development_branch: String,
    /// Remote every push goes to (GIT_REMOTE)
    pub remote: String,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Without `KERNEL_TREE` or `GOPATH` set, the GOPATH comes from
    /// `go env GOPATH`, which also sees values stored with `go env -w`.
    pub fn load() -> Self {
        let mut vars: HashMap<String, String> = std::env::vars().collect();
        let is_set = |key: &str| vars.get(key).is_some_and(|v| !v.trim().is_empty());
        if !is_set("KERNEL_TREE") && !is_set("GOPATH") {
            if let Some(gopath) = go_env_gopath() {
                vars.insert("GOPATH".to_string(), gopath);
            }
        }
        Self::from_vars(&vars)
    }

    /// Build configuration from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let get = |key: &str| vars.get(key).filter(|v| !v.trim().is_empty()).cloned();

        let kernel_tree = get("KERNEL_TREE").map(PathBuf::from).unwrap_or_else(|| {
            gopath(get("GOPATH"))
                .join("src")
                .join(KERNEL_IMPORT_PATH)
        });

        Self {
            releases_url: get("RELEASES_URL").unwrap_or_else(|| DEFAULT_RELEASES_URL.to_string()),
            kernel_tree,
            helper_package: get("HELPER_PACKAGE")
                .unwrap_or_else(|| DEFAULT_HELPER_PACKAGE.to_string()),
            development_branch: get("DEVELOPMENT_BRANCH")
                .unwrap_or_else(|| DEFAULT_DEVELOPMENT_BRANCH.to_string()),
            remote: get("GIT_REMOTE").unwrap_or_else(|| DEFAULT_REMOTE.to_string()),
        }
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  RELEASES_URL:       {}", self.releases_url);
        println!("  KERNEL_TREE:        {}", self.kernel_tree.display());
        println!("  HELPER_PACKAGE:     {}", self.helper_package);
        println!("  DEVELOPMENT_BRANCH: {}", self.development_branch);
        println!("  GIT_REMOTE:         {}", self.remote);
        if self.kernel_tree.is_dir() {
            println!("  Kernel tree: FOUND");
        } else {
            println!("  Kernel tree: NOT FOUND (artifacts must be in the current directory)");
        }
    }
}

/// GOPATH as reported by the Go toolchain. None if go is missing or fails.
fn go_env_gopath() -> Option<String> {
    let result = Cmd::new("go")
        .args(["env", "GOPATH"])
        .allow_fail()
        .run()
        .ok()?;
    let gopath = result.stdout_trimmed();
    if !result.success() || gopath.is_empty() {
        return None;
    }
    tracing::debug!(gopath, "GOPATH from go env");
    Some(gopath.to_string())
}

/// First GOPATH entry, or Go's default of `~/go`.
fn gopath(configured: Option<String>) -> PathBuf {
    configured
        .as_deref()
        .and_then(|p| std::env::split_paths(p).next())
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("/root"))
                .join("go")
        })
}
