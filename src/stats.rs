//! Run report: the counters produced by one build.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::coalescer::MergeMode;
use crate::output::write_atomic;
use crate::utils::{format_count, format_count_with_separator, truncate};

/// Which logical set a source feeds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Allow,
    Deny,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Allow => f.pad("allow"),
            Side::Deny => f.pad("deny"),
        }
    }
}

/// Normalizer counters for a single source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceStats {
    pub name: String,
    pub side: Side,
    pub tokens: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Counters for one logical set, from raw tokens to final output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SideStats {
    pub tokens: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Rejections by reason (see `Rejected::kind`).
    pub rejections: BTreeMap<String, usize>,
    /// Distinct ranges before coalescing.
    pub unique: usize,
    /// Ranges after coalescing.
    pub coalesced: usize,
    /// Ranges written out (after resolution for the deny side).
    pub output: usize,
    /// Addresses covered by the output.
    pub addresses: u64,
}

/// Everything observable about one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub merge_mode: MergeMode,
    pub min_merge_prefix: u8,
    pub sources: Vec<SourceStats>,
    pub allow: SideStats,
    pub deny: SideStats,
    /// Deny ranges dropped because the allow set contains them.
    pub removed: usize,
    /// Allow ranges left inside broader deny ranges.
    pub unresolved_overlaps: usize,
}

impl RunReport {
    pub fn total_tokens(&self) -> usize {
        self.allow.tokens + self.deny.tokens
    }

    pub fn total_rejected(&self) -> usize {
        self.allow.rejected + self.deny.rejected
    }

    /// Load a report written by [`RunReport::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run report: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse run report: {:?}", path))
    }

    /// Save as pretty JSON, atomically.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        write_atomic(path.as_ref(), content.as_bytes())
    }

    /// Human-readable summary for the `stats` command.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let local: DateTime<Local> = self.generated_at.into();

        out.push_str("══════════════════════════════════════════════════════════════════\n");
        out.push_str(" CIDRFOLD RUN REPORT\n");
        out.push_str("══════════════════════════════════════════════════════════════════\n");
        out.push_str(&format!(
            " Generated: {} ({})\n",
            local.format("%Y-%m-%d %H:%M:%S"),
            format_duration_ago(self.generated_at)
        ));
        out.push_str(&format!(
            " Merge: {:?}, min prefix /{}\n\n",
            self.merge_mode, self.min_merge_prefix
        ));

        if !self.sources.is_empty() {
            out.push_str(" SOURCE              SIDE    TOKENS   ACCEPTED   REJECTED\n");
            out.push_str(" ────────────────── ─────── ──────── ────────── ──────────\n");
            for source in &self.sources {
                out.push_str(&format!(
                    " {:<18} {:<7} {:>8} {:>10} {:>10}\n",
                    truncate(&source.name, 18),
                    source.side,
                    format_count(source.tokens),
                    format_count(source.accepted),
                    format_count(source.rejected),
                ));
            }
            out.push('\n');
        }

        for (side, stats) in [(Side::Allow, &self.allow), (Side::Deny, &self.deny)] {
            out.push_str(&format!(
                " {:<5} {} unique -> {} coalesced -> {} written ({} addresses)\n",
                side,
                format_count_with_separator(stats.unique),
                format_count_with_separator(stats.coalesced),
                format_count_with_separator(stats.output),
                format_count_with_separator(stats.addresses as usize),
            ));
        }
        out.push_str(&format!(
            "\n Removed from deny by allow: {}\n",
            format_count_with_separator(self.removed)
        ));
        out.push_str(&format!(
            " Allow ranges inside deny ranges: {}\n",
            format_count_with_separator(self.unresolved_overlaps)
        ));
        out.push_str("══════════════════════════════════════════════════════════════════\n");
        out
    }
}

/// Format duration since a timestamp
fn format_duration_ago(dt: DateTime<Utc>) -> String {
    let seconds = Utc::now().signed_duration_since(dt).num_seconds();
    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 3600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{}h ago", seconds / 3600)
    } else {
        format!("{}d ago", seconds / 86400)
    }
}
