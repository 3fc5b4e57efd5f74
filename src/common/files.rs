//! File operations shared by the stamper, build context and publisher.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Write a file, creating parent directories as needed.
pub fn write_file_with_dirs<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, content: C) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// Copy `src` over `dest`, giving `dest` the permission bits of `src`.
///
/// An existing `dest` is truncated in place and must be writable.
/// `fs::copy` already carries the mode over; it is set again explicitly so the
/// failure names the destination.
pub fn copy_file_preserving_mode(src: &Path, dest: &Path) -> Result<()> {
    let permissions = fs::metadata(src)
        .with_context(|| format!("Failed to stat {}", src.display()))?
        .permissions();
    fs::copy(src, dest)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dest.display()))?;
    fs::set_permissions(dest, permissions)
        .with_context(|| format!("Failed to set permissions on {}", dest.display()))?;
    Ok(())
}

/// Recursively copy `src` to `dest`, which must not exist yet.
///
/// Symlinks are recreated as symlinks, regular files keep their mode.
/// Returns the number of regular files copied.
pub fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<usize> {
    let mut files = 0;

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk {}", src.display()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("{} is outside {}", entry.path().display(), src.display()))?;
        let target = dest.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())
                .with_context(|| format!("Failed to read link {}", entry.path().display()))?;
            std::os::unix::fs::symlink(&link, &target)
                .with_context(|| format!("Failed to create symlink {}", target.display()))?;
        } else {
            copy_file_preserving_mode(entry.path(), &target)?;
            files += 1;
        }
    }

    Ok(files)
}
