//! Host tool availability checks.

use crate::container;

use super::types::CheckResult;

/// Check that `git` is available. Every run needs it.
pub fn check_git() -> CheckResult {
    check_tool("git", "Required to commit and push the rebuild", true)
}

/// Check the tools a container build needs: `go` and a container engine.
pub fn check_build_tools(engine_override: Option<&str>) -> Vec<CheckResult> {
    vec![
        check_tool("go", "Required to build the in-container helper", true),
        check_engine(engine_override),
    ]
}

fn check_engine(engine_override: Option<&str>) -> CheckResult {
    match engine_override.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => match which::which(name) {
            Ok(path) => CheckResult::pass_with("container engine", &path.display().to_string()),
            Err(_) => CheckResult::fail(
                "container engine",
                &format!("Override {:?} not found in $PATH", name),
            ),
        },
        None => match container::detect() {
            Ok(path) => CheckResult::pass_with("container engine", &path.display().to_string()),
            Err(e) => CheckResult::fail(
                "container engine",
                &format!("{}. Install podman (preferred) or docker.", e),
            ),
        },
    }
}

fn check_tool(tool: &str, purpose: &str, required: bool) -> CheckResult {
    match which::which(tool) {
        Ok(path) => CheckResult::pass_with(tool, &path.display().to_string()),
        Err(_) => {
            let msg = format!("Not found in $PATH. {}", purpose);
            if required {
                CheckResult::fail(tool, &msg)
            } else {
                CheckResult::warn(tool, &msg)
            }
        }
    }
}
