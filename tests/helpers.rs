//! Shared test utilities for rebuild-kernel tests.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use rebuild_kernel::artifacts::{DEVICE_TREES, KERNEL_IMAGE};

/// Test environment with a fake kernel repository and build output directory.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Kernel repository holding the committed artifacts
    pub kernel_tree: PathBuf,
    /// Directory the container writes its results into
    pub build_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let kernel_tree = temp_dir.path().join("kernel");
        let build_dir = temp_dir.path().join("buildresult");

        fs::create_dir_all(&kernel_tree).expect("Failed to create kernel tree");
        fs::create_dir_all(&build_dir).expect("Failed to create build dir");

        Self {
            _temp_dir: temp_dir,
            kernel_tree,
            build_dir,
        }
    }

    pub fn root(&self) -> &Path {
        self._temp_dir.path()
    }
}

/// Populate a kernel repository with stale artifacts and an old module tree.
pub fn create_mock_kernel_tree(tree: &Path) {
    write_file(&tree.join(KERNEL_IMAGE.published), "old kernel", 0o644);
    for dtb in DEVICE_TREES {
        write_file(&tree.join(dtb.published), "old dtb", 0o644);
    }
    write_file(&tree.join("lib/modules/6.1.4-v8/old.ko"), "old module", 0o644);
}

/// Populate a build directory the way the container leaves it.
pub fn create_mock_build_output(build_dir: &Path, version: &str) {
    write_file(&build_dir.join(KERNEL_IMAGE.built), "new kernel", 0o755);
    for dtb in DEVICE_TREES {
        write_file(&build_dir.join(dtb.built), dtb.built, 0o644);
    }
    let modules = build_dir.join("lib/modules").join(version);
    write_file(&modules.join("kernel/drivers/spi/spidev.ko"), "spidev", 0o644);
    write_file(&modules.join("modules.dep"), "", 0o644);
    std::os::unix::fs::symlink("/usr/src/linux", modules.join("build"))
        .expect("Failed to create build symlink");
    std::os::unix::fs::symlink("/usr/src/linux", modules.join("source"))
        .expect("Failed to create source symlink");
}

pub fn write_file(path: &Path, content: &str, mode: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, content).expect("Failed to write file");
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).expect("Failed to set mode");
}

/// Assert that a file exists.
pub fn assert_file_exists(path: &Path) {
    assert!(path.exists(), "Expected file to exist: {}", path.display());
}

pub fn assert_file_contains(path: &Path, expected: &str) {
    let content =
        fs::read_to_string(path).unwrap_or_else(|_| panic!("Failed to read file: {}", path.display()));
    assert!(
        content.contains(expected),
        "File {} does not contain expected content.\nExpected to find: {}\nActual content: {}",
        path.display(),
        expected,
        content
    );
}

/// True when git is on PATH. Tests needing it return early otherwise.
pub fn have_git() -> bool {
    if which::which("git").is_ok() {
        return true;
    }
    eprintln!("git not found on PATH, skipping");
    false
}

/// Run git in `dir`, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A repository on branch `development` with one pushed commit, and its
/// bare `origin`.
pub struct GitFixture {
    pub _temp_dir: TempDir,
    pub work: PathBuf,
    pub remote: PathBuf,
}

impl GitFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let work = temp_dir.path().join("work");
        let remote = temp_dir.path().join("remote.git");
        fs::create_dir_all(&work).expect("Failed to create work dir");

        git(temp_dir.path(), &["init", "--bare", "-q", "remote.git"]);
        git(&work, &["init", "-q"]);
        git(&work, &["config", "user.email", "builder@example.com"]);
        git(&work, &["config", "user.name", "Kernel Builder"]);
        git(&work, &["config", "commit.gpgsign", "false"]);
        git(&work, &["symbolic-ref", "HEAD", "refs/heads/development"]);
        git(&work, &["remote", "add", "origin", remote.to_str().unwrap()]);

        fs::write(work.join("README"), "gokrazy kernel\n").unwrap();
        git(&work, &["add", "README"]);
        git(&work, &["commit", "-q", "-m", "Initial commit"]);
        git(&work, &["push", "-q", "origin", "development"]);

        Self {
            _temp_dir: temp_dir,
            work,
            remote,
        }
    }

    /// Subject of the tip commit of `branch` in the bare remote.
    pub fn remote_subject(&self, branch: &str) -> String {
        git(&self.remote, &["log", "-1", "--format=%s", branch])
    }
}
