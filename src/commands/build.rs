//! Build command implementation: same pipeline as `update`, fed from local files.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::{add_static_entries, finish, load_config};
use crate::builder::SetBuilder;
use crate::fetcher::parse_text;
use crate::lock::LockGuard;
use crate::stats::Side;

/// Run the build command
pub fn run(allow: &[PathBuf], deny: &[PathBuf], dry_run: bool, config_path: &Path) -> Result<()> {
    if allow.is_empty() && deny.is_empty() {
        anyhow::bail!("Nothing to build: pass at least one --allow or --deny file");
    }

    let config = load_config(config_path)?;
    let _lock = if dry_run {
        None
    } else {
        Some(LockGuard::acquire(&config.output.lock_path())?)
    };

    let mut builder = SetBuilder::new(config.coalesce);
    for (side, files) in [(Side::Allow, allow), (Side::Deny, deny)] {
        for file in files {
            let content = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {} file: {:?}", side, file))?;
            builder.add_source(side, &source_name(file), parse_text(&content));
        }
    }
    add_static_entries(&mut builder, &config);

    let output = builder.build();
    finish(&output, &config, dry_run)
}

/// Report name for a local file: its file name, or the full path as a fallback
fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
