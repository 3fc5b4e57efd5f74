//! Dockerfile for the kernel build image.

/// Base image of the build container.
pub const BASE_IMAGE: &str = "debian:stretch";

/// Packages for cross-compiling an arm64 kernel.
pub const TOOLCHAIN_PACKAGES: &[&str] = &[
    "crossbuild-essential-arm64",
    "bc",
    "libssl-dev",
    "bison",
    "flex",
    "kmod",
];

/// File name of the helper binary in the build context and in the image.
pub const HELPER_BINARY: &str = "gokr-build-kernel";

/// Values substituted into the Dockerfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerfileParameters {
    pub uid: u32,
    pub gid: u32,
    /// Patch file names, relative to the build context.
    pub patches: Vec<String>,
}

impl DockerfileParameters {
    /// Parameters for the invoking user, so the container writes files the
    /// user owns rather than root.
    pub fn for_current_user(patches: Vec<String>) -> Self {
        // SAFETY: getuid/getgid have no preconditions and cannot fail.
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        Self { uid, gid, patches }
    }

    /// Render the Dockerfile text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push('\n');
        out.push_str(&format!("FROM {}\n\n", BASE_IMAGE));
        out.push_str(&format!(
            "RUN apt-get update && apt-get install -y {}\n\n",
            TOOLCHAIN_PACKAGES.join(" ")
        ));
        out.push_str(&format!(
            "COPY {bin} /usr/bin/{bin}",
            bin = HELPER_BINARY
        ));
        for patch in &self.patches {
            out.push_str(&format!("\nCOPY {p} /usr/src/{p}", p = patch));
        }
        out.push_str("\n\n");
        out.push_str(&format!(
            "RUN echo 'builduser:x:{uid}:{gid}:nobody:/:/bin/sh' >> /etc/passwd && \\\n    chown -R {uid}:{gid} /usr/src\n\n",
            uid = self.uid,
            gid = self.gid
        ));
        out.push_str("USER builduser\n");
        out.push_str("WORKDIR /usr/src\n");
        out.push_str(&format!("ENTRYPOINT /usr/bin/{}\n", HELPER_BINARY));
        out
    }
}
