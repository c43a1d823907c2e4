//! Stats command implementation.

use anyhow::{Context, Result};
use std::path::Path;

use super::load_config;
use crate::stats::RunReport;

/// Run the stats command
pub fn run(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let report = RunReport::load(&config.output.report_path)
        .context("No run report yet, run `cidrfold update` or `cidrfold build` first")?;

    println!();
    print!("{}", report.summary());
    println!();
    Ok(())
}
