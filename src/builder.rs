//! Orchestration of one run: normalize, coalesce, resolve.
//!
//! Feed adapters hand raw tokens to a [`SetBuilder`], tagged with the source
//! name (for reporting only) and the side they belong to. [`SetBuilder::build`]
//! then produces the two canonical sets together with a [`RunReport`].

use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::coalescer::{coalesce, CoalesceOptions};
use crate::normalizer::normalize;
use crate::resolver::resolve;
use crate::set::LogicalSet;
use crate::stats::{RunReport, Side, SideStats, SourceStats};
use crate::utils::format_count;

/// Final output of a run.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub allow: LogicalSet,
    pub deny: LogicalSet,
    pub report: RunReport,
}

#[derive(Debug, Default)]
struct SideInput {
    ranges: LogicalSet,
    tokens: usize,
    accepted: usize,
    rejected: usize,
    rejections: BTreeMap<String, usize>,
}

impl SideInput {
    fn stats(&self) -> SideStats {
        SideStats {
            tokens: self.tokens,
            accepted: self.accepted,
            rejected: self.rejected,
            rejections: self.rejections.clone(),
            unique: self.ranges.len(),
            ..Default::default()
        }
    }
}

/// Accumulates raw tokens per side and builds the canonical sets.
#[derive(Debug, Default)]
pub struct SetBuilder {
    options: CoalesceOptions,
    allow: SideInput,
    deny: SideInput,
    sources: Vec<SourceStats>,
}

impl SetBuilder {
    pub fn new(options: CoalesceOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Normalize and add the tokens of one source.
    ///
    /// Rejected tokens are counted and skipped; they never abort the batch.
    pub fn add_source<I, S>(&mut self, side: Side, name: &str, tokens: I) -> SourceStats
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let input = match side {
            Side::Allow => &mut self.allow,
            Side::Deny => &mut self.deny,
        };

        let mut stats = SourceStats {
            name: name.to_string(),
            side,
            tokens: 0,
            accepted: 0,
            rejected: 0,
        };

        for token in tokens {
            let token = token.as_ref();
            stats.tokens += 1;
            match normalize(token) {
                Ok(range) => {
                    stats.accepted += 1;
                    input.ranges.insert(range);
                }
                Err(reason) => {
                    stats.rejected += 1;
                    *input.rejections.entry(reason.kind().to_string()).or_default() += 1;
                    debug!("[{}] rejected {:?}: {}", name, token, reason);
                }
            }
        }

        input.tokens += stats.tokens;
        input.accepted += stats.accepted;
        input.rejected += stats.rejected;

        info!(
            "[{}] {}: {} tokens, {} accepted, {} rejected",
            side,
            name,
            format_count(stats.tokens),
            format_count(stats.accepted),
            format_count(stats.rejected)
        );

        self.sources.push(stats.clone());
        stats
    }

    /// Coalesce both sides and resolve deny against allow.
    pub fn build(self) -> BuildOutput {
        let mut allow_stats = self.allow.stats();
        let mut deny_stats = self.deny.stats();

        let allow = coalesce(&self.allow.ranges, &self.options);
        let deny = coalesce(&self.deny.ranges, &self.options);
        allow_stats.coalesced = allow.output_count;
        deny_stats.coalesced = deny.output_count;

        info!(
            "Coalesced allow {} -> {}, deny {} -> {}",
            format_count(allow.input_count),
            format_count(allow.output_count),
            format_count(deny.input_count),
            format_count(deny.output_count)
        );

        let resolution = resolve(&deny.ranges, &allow.ranges);
        if resolution.removed > 0 {
            info!(
                "Removed {} deny ranges covered by the allow set",
                format_count(resolution.removed)
            );
        }

        allow_stats.output = allow.ranges.len();
        allow_stats.addresses = allow.ranges.address_count();
        deny_stats.output = resolution.deny.len();
        deny_stats.addresses = resolution.deny.address_count();

        let report = RunReport {
            generated_at: Utc::now(),
            merge_mode: self.options.merge_mode,
            min_merge_prefix: self.options.min_merge_prefix,
            sources: self.sources,
            allow: allow_stats,
            deny: deny_stats,
            removed: resolution.removed,
            unresolved_overlaps: resolution.unresolved_overlaps,
        };

        BuildOutput {
            allow: allow.ranges,
            deny: resolution.deny,
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_to_end_scenario() {
        let mut builder = SetBuilder::default();
        let stats = builder
            .add_source(
                Side::Allow,
                "googlebot",
                ["8.8.8.0/24", "8.8.8.0/24", "bad-token", "8.8.9.0/24"],
            );
        assert_eq!(stats.tokens, 4);
        assert_eq!(stats.accepted, 3);
        assert_eq!(stats.rejected, 1);

        builder.add_source(Side::Deny, "firehol", Vec::<String>::new());
        let output = builder.build();

        assert_eq!(output.allow.to_cidr_strings(), vec!["8.8.8.0/23"]);
        assert!(output.deny.is_empty());
        assert_eq!(output.report.allow.rejected, 1);
        assert_eq!(output.report.allow.unique, 2);
        assert_eq!(output.report.allow.coalesced, 1);
        assert_eq!(output.report.removed, 0);
        assert_eq!(
            output.report.allow.rejections.get("malformed_address"),
            Some(&1)
        );
    }

    #[test]
    fn test_deny_resolved_against_coalesced_allow() {
        let mut builder = SetBuilder::default();
        // Neither /25 alone contains the denied /24, the coalesced allow set does
        builder.add_source(Side::Allow, "a", ["10.0.0.0/25", "10.0.0.128/25"]);
        builder.add_source(
            Side::Deny,
            "d",
            ["10.0.0.0/24", "10.0.1.5", "10.0.0.200 ; spammer"],
        );
        let output = builder.build();

        assert_eq!(output.allow.to_cidr_strings(), vec!["10.0.0.0/24"]);
        assert_eq!(output.deny.to_cidr_strings(), vec!["10.0.1.5/32"]);
        assert_eq!(output.report.removed, 1);
        assert_eq!(output.report.deny.coalesced, 2);
        assert_eq!(output.report.deny.output, 1);
    }

    #[test]
    fn test_sources_accumulate_per_side() {
        let mut builder = SetBuilder::default();
        builder.add_source(Side::Deny, "one", ["1.1.1.1", "2.2.2.2"]);
        builder.add_source(Side::Deny, "two", ["2.2.2.2", "::1"]);
        let output = builder.build();

        assert_eq!(output.report.sources.len(), 2);
        assert_eq!(output.report.deny.tokens, 4);
        assert_eq!(output.report.deny.accepted, 3);
        assert_eq!(output.report.deny.unique, 2);
        assert_eq!(output.report.total_tokens(), 4);
        assert_eq!(
            output.report.deny.rejections.get("unsupported_family"),
            Some(&1)
        );
        assert!(output.allow.is_empty());
    }

    #[test]
    fn test_empty_run() {
        let output = SetBuilder::default().build();
        assert!(output.allow.is_empty());
        assert!(output.deny.is_empty());
        assert_eq!(output.report.total_tokens(), 0);
    }

    #[test]
    fn test_broader_deny_survives_narrow_allow() {
        let mut builder = SetBuilder::default();
        builder.add_source(Side::Allow, "a", ["66.249.64.0/27"]);
        builder.add_source(Side::Deny, "d", ["66.249.0.0/16"]);
        let output = builder.build();
        assert_eq!(output.deny.to_cidr_strings(), vec!["66.249.0.0/16"]);
        assert_eq!(output.report.unresolved_overlaps, 1);
    }

    #[test]
    fn test_address_counts() {
        let mut builder = SetBuilder::default();
        builder.add_source(Side::Allow, "a", ["10.0.0.0/24", "10.0.1.0/24"]);
        let output = builder.build();
        assert_eq!(output.report.allow.addresses, 512);
    }
}
