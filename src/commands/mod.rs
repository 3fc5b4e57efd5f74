//! CLI command handlers.
//!
//! - `rebuild` - Check for a new kernel release and rebuild (default)
//! - `preflight` - Run preflight checks

mod preflight;
pub mod rebuild;

pub use preflight::cmd_preflight;
pub use rebuild::{cmd_rebuild, RebuildArgs};
