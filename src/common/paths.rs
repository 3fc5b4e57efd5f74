//! Locating files that may live in the working directory or a fallback tree.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// Find `name` relative to the current directory, else below `fallback`.
///
/// Both files and directories qualify.
pub fn find_in(name: &str, fallback: &Path) -> Result<PathBuf> {
    let local = PathBuf::from(name);
    if local.exists() {
        return Ok(local);
    }

    let candidate = fallback.join(name);
    if candidate.exists() {
        return Ok(candidate);
    }

    bail!(
        "could not find file {:?} (looked in . and {})",
        name,
        fallback.display()
    )
}
