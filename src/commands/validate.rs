//! Check a config file.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;

/// Load and validate `path`, printing warnings.
///
/// # Errors
///
/// Returns an error if the file is missing, unparseable, or invalid.
pub fn execute(path: &Path) -> Result<()> {
    let config = Config::load_from(path)?;
    let result = config.validate()?;

    for warning in &result.warnings {
        println!("warning: {warning}");
    }
    println!("{} is valid", path.display());
    Ok(())
}
