//! Publishing build output into the kernel repository.
//!
//! The container leaves the kernel image, device-tree blobs and a
//! `lib/modules` tree in the build context. They replace the committed copies
//! located in the working directory (or the fallback kernel tree).

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::common::{copy_dir_recursive, copy_file_preserving_mode, find_in};

/// A file produced by the container and the name it is committed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Artifact {
    /// Name in the build output.
    pub built: &'static str,
    /// Name in the repository.
    pub published: &'static str,
}

impl Artifact {
    const fn same(name: &'static str) -> Self {
        Self {
            built: name,
            published: name,
        }
    }
}

pub const KERNEL_IMAGE: Artifact = Artifact::same("vmlinuz");

/// Device trees for the supported boards.
pub const DEVICE_TREES: [Artifact; 5] = [
    Artifact::same("bcm2710-rpi-3-b.dtb"),
    Artifact::same("bcm2710-rpi-3-b-plus.dtb"),
    // The repository predates the "-w" suffix of the Zero 2 W device tree.
    Artifact {
        built: "bcm2710-rpi-zero-2-w.dtb",
        published: "bcm2710-rpi-zero-2.dtb",
    },
    Artifact::same("bcm2710-rpi-cm3.dtb"),
    Artifact::same("bcm2711-rpi-4-b.dtb"),
];

/// Directory holding `modules/`.
pub const LIB_DIR: &str = "lib";

/// Symlinks `modules_install` leaves pointing into the container's source tree.
pub const BUILD_SYMLINKS: [&str; 2] = ["build", "source"];

/// Located destinations for every published artifact.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    files: Vec<(Artifact, PathBuf)>,
    lib: PathBuf,
}

/// Summary of a publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// Destination paths of the copied kernel image and device trees.
    pub files: Vec<PathBuf>,
    /// Symlinks removed from the module tree.
    pub pruned: Vec<PathBuf>,
    /// Regular files in the published module tree.
    pub module_files: usize,
    /// Hex SHA-256 of the published kernel image.
    pub kernel_sha256: String,
}

impl ArtifactSet {
    /// Locate all destinations in `.` or below `fallback`. Fails on the first
    /// missing file.
    pub fn locate(fallback: &Path) -> Result<Self> {
        let mut files = Vec::with_capacity(1 + DEVICE_TREES.len());
        for artifact in std::iter::once(KERNEL_IMAGE).chain(DEVICE_TREES) {
            files.push((artifact, find_in(artifact.published, fallback)?));
        }
        let lib = find_in(LIB_DIR, fallback)?;
        Ok(Self { files, lib })
    }

    /// Destination of the kernel image.
    pub fn kernel(&self) -> &Path {
        &self.files[0].1
    }

    /// Copy the build output in `build_dir` over the located destinations.
    pub fn publish(&self, build_dir: &Path) -> Result<PublishReport> {
        let mut published = Vec::with_capacity(self.files.len());
        for (artifact, dest) in &self.files {
            let src = build_dir.join(artifact.built);
            copy_file_preserving_mode(&src, dest)
                .with_context(|| format!("Failed to publish {}", artifact.built))?;
            tracing::info!(artifact = artifact.built, dest = %dest.display(), "published");
            published.push(dest.clone());
        }

        let pruned = prune_build_symlinks(build_dir)?;
        let module_files = replace_module_tree(&build_dir.join(LIB_DIR).join("modules"), &self.lib)?;
        let kernel_sha256 = sha256_file(self.kernel())?;
        tracing::info!(
            modules = module_files,
            pruned = pruned.len(),
            sha256 = %kernel_sha256,
            "published kernel"
        );

        Ok(PublishReport {
            files: published,
            pruned,
            module_files,
            kernel_sha256,
        })
    }
}

/// Remove `build` and `source` entries directly under each
/// `lib/modules/<version>/` of `build_dir`.
///
/// Returns the removed paths. A missing `lib/modules` prunes nothing.
pub fn prune_build_symlinks(build_dir: &Path) -> Result<Vec<PathBuf>> {
    let modules = build_dir.join(LIB_DIR).join("modules");
    let entries = match fs::read_dir(&modules) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", modules.display()))
        }
    };

    let mut removed = Vec::new();
    for entry in entries {
        let version_dir = entry?.path();
        if !version_dir.is_dir() {
            continue;
        }
        for name in BUILD_SYMLINKS {
            let candidate = version_dir.join(name);
            let Ok(meta) = fs::symlink_metadata(&candidate) else {
                continue;
            };
            let result = if meta.is_dir() {
                fs::remove_dir_all(&candidate)
            } else {
                fs::remove_file(&candidate)
            };
            result.with_context(|| format!("Failed to remove {}", candidate.display()))?;
            tracing::debug!(path = %candidate.display(), "removed build symlink");
            removed.push(candidate);
        }
    }
    removed.sort();
    Ok(removed)
}

/// Replace `<lib_dir>/modules` with a copy of `built_modules`.
///
/// Remove then copy, not an atomic swap: an interrupted replace leaves a
/// partial tree that the next publish overwrites.
pub fn replace_module_tree(built_modules: &Path, lib_dir: &Path) -> Result<usize> {
    if !built_modules.is_dir() {
        bail!(
            "Build produced no module tree at {}",
            built_modules.display()
        );
    }

    let dest = lib_dir.join("modules");
    match fs::remove_dir_all(&dest) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e).with_context(|| format!("Failed to remove {}", dest.display())),
    }

    let files = copy_dir_recursive(built_modules, &dest)
        .with_context(|| format!("Failed to copy modules into {}", dest.display()))?;
    Ok(files)
}

fn sha256_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    #[test]
    fn test_prune_only_direct_build_and_source() {
        let temp = TempDir::new().unwrap();
        let version = temp.path().join("lib/modules/6.1.5-v8");
        fs::create_dir_all(version.join("kernel/build")).unwrap();
        symlink("/usr/src/linux", version.join("build")).unwrap();
        symlink("/usr/src/linux", version.join("source")).unwrap();
        fs::write(version.join("modules.dep"), "").unwrap();
        fs::write(version.join("kernel/build/keep.ko"), "").unwrap();

        let removed = prune_build_symlinks(temp.path()).unwrap();

        assert_eq!(removed, vec![version.join("build"), version.join("source")]);
        assert!(fs::symlink_metadata(version.join("build")).is_err());
        assert!(fs::symlink_metadata(version.join("source")).is_err());
        assert!(version.join("modules.dep").exists());
        assert!(version.join("kernel/build/keep.ko").exists());
    }

    #[test]
    fn test_prune_without_modules_is_noop() {
        let temp = TempDir::new().unwrap();
        assert!(prune_build_symlinks(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_replace_module_tree_drops_stale_versions() {
        let temp = TempDir::new().unwrap();
        let lib = temp.path().join("repo/lib");
        fs::create_dir_all(lib.join("modules/6.1.4")).unwrap();
        fs::write(lib.join("modules/6.1.4/old.ko"), "").unwrap();

        let built = temp.path().join("out/lib/modules");
        fs::create_dir_all(built.join("6.1.5")).unwrap();
        fs::write(built.join("6.1.5/new.ko"), "").unwrap();

        let files = replace_module_tree(&built, &lib).unwrap();

        assert_eq!(files, 1);
        assert!(!lib.join("modules/6.1.4").exists());
        assert!(lib.join("modules/6.1.5/new.ko").exists());
    }

    #[test]
    fn test_replace_module_tree_requires_build_output() {
        let temp = TempDir::new().unwrap();
        let err = replace_module_tree(&temp.path().join("missing"), temp.path()).unwrap_err();
        assert!(err.to_string().contains("no module tree"));
    }

    #[test]
    fn test_zero_2_w_is_published_under_legacy_name() {
        let zero = DEVICE_TREES
            .iter()
            .find(|a| a.built == "bcm2710-rpi-zero-2-w.dtb")
            .unwrap();
        assert_eq!(zero.published, "bcm2710-rpi-zero-2.dtb");
    }

    #[test]
    fn test_sha256_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("f");
        fs::write(&path, "abc").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
