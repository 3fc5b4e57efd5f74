//! rebuild-kernel library exports.
//!
//! The binary in `main.rs` is a thin CLI over these modules; integration
//! tests drive them directly.

pub mod artifacts;
pub mod commands;
pub mod common;
pub mod config;
pub mod container;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod release;
pub mod stamp;
pub mod timing;
pub mod vcs;
