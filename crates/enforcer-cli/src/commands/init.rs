//! Init command implementation

use std::path::Path;

use colored::Colorize;
use enforcer_core::EnforcerConfig;

use crate::error::{CliError, Result};

/// Write the default configuration to `path`
///
/// Refuses to replace an existing file unless `force` is set. The format
/// follows the extension (`.toml` or `.json`).
pub fn run_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(CliError::user(format!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        )));
    }

    EnforcerConfig::default().save(path)?;
    println!(
        "{} Wrote default configuration to {}",
        "OK".green().bold(),
        path.display().to_string().cyan()
    );
    Ok(())
}
