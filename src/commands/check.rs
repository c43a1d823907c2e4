//! Check command implementation.

use anyhow::Result;
use std::path::Path;
use tracing::warn;

use super::load_config;
use crate::normalizer::normalize;
use crate::output::read_set;
use crate::range::AddressRange;
use crate::set::LogicalSet;

/// Where a queried range ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed(AddressRange),
    Denied(AddressRange),
    NotListed,
}

/// Look up `target` in the final sets. Allow wins when both match.
pub fn classify(target: &AddressRange, allow: &LogicalSet, deny: &LogicalSet) -> Verdict {
    if let Some(range) = allow.covering(target) {
        Verdict::Allowed(*range)
    } else if let Some(range) = deny.covering(target) {
        Verdict::Denied(*range)
    } else {
        Verdict::NotListed
    }
}

/// Run the check command
pub fn run(target: &str, config_path: &Path) -> Result<()> {
    let query = normalize(target).map_err(|e| anyhow::anyhow!("Invalid IP or CIDR '{}': {}", target, e))?;
    let config = load_config(config_path)?;

    let allow = read_or_empty(&config.output.allow_path);
    let deny = read_or_empty(&config.output.deny_path);

    println!();
    match classify(&query, &allow, &deny) {
        Verdict::Allowed(range) => println!("{} is ALLOWED (matches {})", query, range),
        Verdict::Denied(range) => println!("{} is DENIED (matches {})", query, range),
        Verdict::NotListed => println!("{} is not listed", query),
    }
    println!();

    Ok(())
}

fn read_or_empty(path: &Path) -> LogicalSet {
    read_set(path).unwrap_or_else(|e| {
        warn!("{:#}", e);
        LogicalSet::new()
    })
}
