//! Repository checks: git work tree, build package, kernel artifacts.

use std::path::Path;

use crate::artifacts::{DEVICE_TREES, KERNEL_IMAGE, LIB_DIR};
use crate::common::find_in;
use crate::container::context::PATCH_FILES;
use crate::process::Cmd;

use super::types::CheckResult;

/// Check that the current directory is inside a git work tree.
pub fn check_work_tree() -> CheckResult {
    let inside = Cmd::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .allow_fail()
        .run()
        .map(|r| r.success() && r.stdout_trimmed() == "true")
        .unwrap_or(false);
    if inside {
        CheckResult::pass("git work tree")
    } else {
        CheckResult::fail("git work tree", "Run from inside the kernel repository")
    }
}

/// Check the build package directory that receives `url.go`.
pub fn check_build_path(build_path: &Path) -> CheckResult {
    if build_path.is_dir() {
        CheckResult::pass_with("build path", &build_path.display().to_string())
    } else {
        CheckResult::warn(
            "build path",
            &format!("{} does not exist and will be created", build_path.display()),
        )
    }
}

/// Check that every patch and publish destination can be located.
pub fn check_kernel_files(kernel_tree: &Path) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let names = PATCH_FILES
        .iter()
        .copied()
        .chain(std::iter::once(KERNEL_IMAGE.published))
        .chain(DEVICE_TREES.iter().map(|a| a.published))
        .chain(std::iter::once(LIB_DIR));

    let mut missing = Vec::new();
    for name in names {
        if find_in(name, kernel_tree).is_err() {
            missing.push(name);
        }
    }

    if missing.is_empty() {
        results.push(CheckResult::pass("kernel files"));
    } else {
        results.push(CheckResult::fail(
            "kernel files",
            &format!(
                "Missing {} (looked in . and {})",
                missing.join(", "),
                kernel_tree.display()
            ),
        ));
    }

    results
}
