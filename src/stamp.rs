//! Version stamping for the in-container build helper.
//!
//! The helper reads the kernel tarball location from a generated Go file
//! (`url.go`) in its package directory. Rewriting that file is how a new
//! release reaches the build.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::common::files::write_file_with_dirs;

/// Name of the generated file inside the build package.
pub const URL_FILE: &str = "url.go";

/// Render the Go fragment embedding `download_url`.
pub fn render_url_fragment(download_url: &str) -> String {
    format!(
        "\npackage main\n\n// see https://www.kernel.org/releases.json\nvar latest = \"{}\"\n",
        go_string_body(download_url)
    )
}

/// Escape `s` for use between the quotes of a Go interpreted string literal.
fn go_string_body(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Path of the generated file for a build package directory.
pub fn url_file_path(build_path: &Path) -> PathBuf {
    build_path.join(URL_FILE)
}

/// Write the fragment for `download_url` into `<build_path>/url.go`.
///
/// Returns the written path. Same URL in, same bytes out.
pub fn write_url_fragment(build_path: &Path, download_url: &str) -> Result<PathBuf> {
    let path = url_file_path(build_path);
    write_file_with_dirs(&path, render_url_fragment(download_url))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), url = download_url, "stamped download URL");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fragment_layout() {
        assert_eq!(
            render_url_fragment("https://example/linux-6.1.5.tar.xz"),
            "\npackage main\n\n// see https://www.kernel.org/releases.json\nvar latest = \"https://example/linux-6.1.5.tar.xz\"\n"
        );
    }

    #[test]
    fn test_quotes_and_backslashes_are_escaped() {
        assert_eq!(
            go_string_body(r#"https://example/a"b\c.tar.xz"#),
            r#"https://example/a\"b\\c.tar.xz"#
        );
        assert_eq!(go_string_body("x\ny\u{7}"), r"x\ny\u0007");
        let fragment = render_url_fragment("https://example/\"; evil()");
        assert!(fragment.contains(r#"var latest = "https://example/\"; evil()""#));
    }

    #[test]
    fn test_rewrite_is_byte_identical() {
        let temp = TempDir::new().unwrap();
        let url = "https://example/linux-6.1.5.tar.xz";

        let path = write_url_fragment(temp.path(), url).unwrap();
        let first = std::fs::read(&path).unwrap();
        write_url_fragment(temp.path(), url).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_new_url_replaces_old() {
        let temp = TempDir::new().unwrap();
        write_url_fragment(temp.path(), "https://example/linux-6.1.4.tar.xz").unwrap();
        let path = write_url_fragment(temp.path(), "https://example/linux-6.1.5.tar.xz").unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("linux-6.1.5"));
        assert!(!content.contains("linux-6.1.4"));
    }

    #[test]
    fn test_creates_missing_package_dir() {
        let temp = TempDir::new().unwrap();
        let build_path = temp.path().join("cmd/gokr-build-kernel");
        let path = write_url_fragment(&build_path, "https://example/x.tar.xz").unwrap();
        assert_eq!(path, build_path.join("url.go"));
        assert!(path.is_file());
    }
}
