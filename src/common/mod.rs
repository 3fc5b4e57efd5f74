//! Shared utilities across rebuild-kernel modules.

pub mod files;
pub mod paths;

pub use files::{copy_dir_recursive, copy_file_preserving_mode, write_file_with_dirs};
pub use paths::find_in;
