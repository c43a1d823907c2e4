//! Update command implementation.

use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

use super::{add_static_entries, finish, load_config};
use crate::builder::SetBuilder;
use crate::fetcher::Fetcher;
use crate::lock::LockGuard;
use crate::utils::format_bytes;

/// Run the update command
pub async fn run(dry_run: bool, config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let _lock = if dry_run {
        None
    } else {
        Some(LockGuard::acquire(&config.output.lock_path())?)
    };

    let sources = config.enabled_sources(None);
    if sources.is_empty() {
        warn!("No sources enabled, only static entries will be used");
    }

    info!("Fetching {} sources...", sources.len());
    let fetcher = Fetcher::new()?;
    let results = fetcher.fetch_sources(&sources).await;

    let mut builder = SetBuilder::new(config.coalesce);
    let mut failures = 0;
    for (source, result) in results {
        match result {
            Ok(fetched) => {
                builder.add_source(fetched.side, &fetched.name, &fetched.tokens);
            }
            Err(e) => {
                // An unreachable source counts as an empty one
                warn!("Source {} contributed nothing: {:#}", source.name, e);
                failures += 1;
                builder.add_source(source.side, &source.name, Vec::<String>::new());
            }
        }
    }
    add_static_entries(&mut builder, &config);

    info!(
        "Downloaded {} ({} of {} sources failed)",
        format_bytes(fetcher.total_downloaded() as u64),
        failures,
        sources.len()
    );

    let output = builder.build();
    finish(&output, &config, dry_run)
}
