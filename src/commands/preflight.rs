//! Preflight command - runs preflight checks.

use anyhow::Result;

use super::rebuild::RebuildArgs;
use crate::config::Config;
use crate::preflight;

/// Execute the preflight command for the run described by `args`.
pub fn cmd_preflight(args: &RebuildArgs, config: &Config, strict: bool) -> Result<()> {
    let scope = args.preflight_scope(config);
    if strict {
        preflight::run_preflight_or_fail(&scope)?;
        println!("All preflight checks passed.");
    } else {
        let report = preflight::run_preflight(&scope);
        report.print();
        if !report.all_passed() {
            println!("Some checks failed. Use --strict to exit non-zero.");
        }
    }
    Ok(())
}
