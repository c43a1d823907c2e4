//! CLI command implementations.

pub mod build;
pub mod check;
pub mod init;
pub mod stats;
pub mod update;

use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

use crate::builder::{BuildOutput, SetBuilder};
use crate::config::{Config, STATIC_SOURCE_NAME};
use crate::output::write_set;
use crate::stats::Side;
use crate::utils::format_count;

/// Load the config file if present, otherwise fall back to defaults
pub(crate) fn load_config(config_path: &Path) -> Result<Config> {
    if config_path.exists() {
        Config::load(config_path)
    } else {
        warn!(
            "Config file {:?} not found, using built-in defaults",
            config_path
        );
        Ok(Config::default())
    }
}

/// Feed the inline `static_allow` / `static_deny` entries into the builder
pub(crate) fn add_static_entries(builder: &mut SetBuilder, config: &Config) {
    for side in [Side::Allow, Side::Deny] {
        let entries = config.static_entries(side);
        if !entries.is_empty() {
            builder.add_source(side, STATIC_SOURCE_NAME, entries);
        }
    }
}

/// Write both sets and the run report, or just log them on a dry run
pub(crate) fn finish(output: &BuildOutput, config: &Config, dry_run: bool) -> Result<()> {
    let report = &output.report;
    info!(
        "Allow: {} ranges, deny: {} ranges ({} removed by allow, {} tokens rejected)",
        format_count(output.allow.len()),
        format_count(output.deny.len()),
        format_count(report.removed),
        format_count(report.total_rejected())
    );

    if dry_run {
        info!("Dry run, nothing written");
        println!("{}", report.summary());
        return Ok(());
    }

    write_set(&config.output.allow_path, &output.allow)?;
    write_set(&config.output.deny_path, &output.deny)?;
    report.save(&config.output.report_path)?;

    println!();
    println!(
        "[OK] allow: {} ranges -> {:?}",
        format_count(output.allow.len()),
        config.output.allow_path
    );
    println!(
        "[OK] deny:  {} ranges -> {:?}",
        format_count(output.deny.len()),
        config.output.deny_path
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_missing_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(&dir.path().join("missing.yaml")).unwrap();
        assert_eq!(config.sources.len(), Config::default().sources.len());
    }

    #[test]
    fn test_add_static_entries() {
        let config = Config {
            static_allow: vec!["192.0.2.0/24".to_string()],
            static_deny: vec!["192.0.2.10".to_string(), "198.51.100.0/24".to_string()],
            ..Default::default()
        };
        let mut builder = SetBuilder::default();
        add_static_entries(&mut builder, &config);
        let output = builder.build();

        assert_eq!(output.allow.to_cidr_strings(), vec!["192.0.2.0/24"]);
        assert_eq!(output.deny.to_cidr_strings(), vec!["198.51.100.0/24"]);
        assert_eq!(output.report.removed, 1);
        assert!(output
            .report
            .sources
            .iter()
            .all(|s| s.name == STATIC_SOURCE_NAME));
    }

    #[test]
    fn test_finish_writes_outputs() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.allow_path = dir.path().join("allow.txt");
        config.output.deny_path = dir.path().join("deny.txt");
        config.output.report_path = dir.path().join("report.json");

        let mut builder = SetBuilder::default();
        builder.add_source(Side::Deny, "d", ["203.0.113.0/25", "203.0.113.128/25"]);
        let output = builder.build();

        finish(&output, &config, false).unwrap();
        assert_eq!(
            std::fs::read_to_string(&config.output.deny_path).unwrap(),
            "203.0.113.0/24\n"
        );
        assert_eq!(
            std::fs::read_to_string(&config.output.allow_path).unwrap(),
            ""
        );
        assert!(config.output.report_path.exists());
    }

    #[test]
    fn test_finish_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.allow_path = dir.path().join("allow.txt");
        config.output.deny_path = dir.path().join("deny.txt");
        config.output.report_path = dir.path().join("report.json");

        let output = SetBuilder::default().build();
        finish(&output, &config, true).unwrap();
        assert!(!config.output.allow_path.exists());
        assert!(!config.output.report_path.exists());
    }
}
