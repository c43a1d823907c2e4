//! CIDR coalescing.
//!
//! Reduces a set of ranges to an equivalent set of disjoint ranges in two
//! stages:
//!
//! 1. A sorted sweep drops every range already covered by a broader one
//!    (`10.0.5.0/24` disappears under `10.0.0.0/16`).
//! 2. An upward merge joins sibling halves of the same supernet
//!    (`10.0.0.0/25` + `10.0.0.128/25` -> `10.0.0.0/24`).
//!
//! Sibling merging stops at [`DEFAULT_MIN_MERGE_PREFIX`]: two adjacent /8s
//! still merge into a /7, but nothing broader is ever synthesized from
//! incidental adjacency.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::range::AddressRange;
use crate::set::LogicalSet;

/// Narrowest prefix length at which sibling merging still happens.
pub const DEFAULT_MIN_MERGE_PREFIX: u8 = 8;

/// How many times the sibling merge pass runs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Repeat the merge pass until a full scan merges nothing.
    #[default]
    FixedPoint,
    /// Run the merge pass exactly once. Chains of siblings spanning more
    /// than one level may be left partially collapsed.
    SinglePass,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CoalesceOptions {
    /// Sibling pairs with a prefix length below this are never merged.
    pub min_merge_prefix: u8,
    pub merge_mode: MergeMode,
}

impl Default for CoalesceOptions {
    fn default() -> Self {
        Self {
            min_merge_prefix: DEFAULT_MIN_MERGE_PREFIX,
            merge_mode: MergeMode::default(),
        }
    }
}

/// Result of a coalesce run.
#[derive(Debug, Clone)]
pub struct Coalesced {
    pub ranges: LogicalSet,
    pub input_count: usize,
    pub output_count: usize,
    /// Number of sibling merge passes performed.
    pub merge_passes: usize,
}

/// Coalesce a set of ranges.
///
/// # Examples
/// ```
/// use cidrfold::coalescer::{coalesce, CoalesceOptions};
/// use cidrfold::set::LogicalSet;
///
/// let input: LogicalSet = ["10.0.0.0/25", "10.0.0.128/25"]
///     .iter()
///     .map(|s| s.parse().unwrap())
///     .collect();
/// let result = coalesce(&input, &CoalesceOptions::default());
/// assert_eq!(result.ranges.render(), "10.0.0.0/24\n");
/// ```
pub fn coalesce(input: &LogicalSet, options: &CoalesceOptions) -> Coalesced {
    let ranges: Vec<AddressRange> = input.iter().copied().collect();
    let (kept, merge_passes) = coalesce_ranges(ranges, options);

    let output_count = kept.len();
    debug!(
        "Coalesced {} ranges -> {} ({} merge passes)",
        input.len(),
        output_count,
        merge_passes
    );

    Coalesced {
        ranges: kept.into_iter().collect(),
        input_count: input.len(),
        output_count,
        merge_passes,
    }
}

/// Coalesce an arbitrary list of ranges (duplicates and any order allowed).
///
/// Returns the sorted, disjoint result and the number of merge passes run.
pub fn coalesce_ranges(
    mut ranges: Vec<AddressRange>,
    options: &CoalesceOptions,
) -> (Vec<AddressRange>, usize) {
    ranges.sort_unstable();
    let mut kept = absorb_covered(ranges);

    let mut passes = 0;
    if kept.len() < 2 {
        return (kept, passes);
    }
    loop {
        let (merged, merges) = merge_siblings(&kept, options.min_merge_prefix);
        passes += 1;
        kept = merged;
        if merges == 0 || options.merge_mode == MergeMode::SinglePass || kept.len() < 2 {
            break;
        }
    }
    (kept, passes)
}

/// Sweep over sorted ranges, keeping only those not covered by another.
fn absorb_covered(sorted: Vec<AddressRange>) -> Vec<AddressRange> {
    let mut kept: Vec<AddressRange> = Vec::with_capacity(sorted.len());

    for range in sorted {
        let Some(&last) = kept.last() else {
            kept.push(range);
            continue;
        };

        if last.contains(&range) {
            continue;
        }

        if range.contains(&last) {
            // Not reachable from sorted input
            kept.pop();
            kept.push(range);
            collapse_tail(&mut kept);
        } else {
            kept.push(range);
        }
    }

    kept
}

/// Absorb backwards after the last element was widened.
fn collapse_tail(kept: &mut Vec<AddressRange>) {
    while kept.len() >= 2 {
        let last = kept[kept.len() - 1];
        let prev = kept[kept.len() - 2];
        if prev.contains(&last) {
            kept.pop();
        } else if last.contains(&prev) {
            kept.remove(kept.len() - 2);
        } else {
            break;
        }
    }
}

/// One left-to-right pass joining sibling pairs into their supernet.
///
/// Consumed pairs are not reconsidered within the same pass.
fn merge_siblings(kept: &[AddressRange], min_merge_prefix: u8) -> (Vec<AddressRange>, usize) {
    let mut out = Vec::with_capacity(kept.len());
    let mut merges = 0;
    let mut i = 0;

    while i < kept.len() {
        let current = kept[i];
        if let Some(merged) = kept
            .get(i + 1)
            .and_then(|next| sibling_supernet(&current, next, min_merge_prefix))
        {
            out.push(merged);
            merges += 1;
            i += 2;
        } else {
            out.push(current);
            i += 1;
        }
    }

    (out, merges)
}

/// The supernet of `current` and `next` if they are its lower and upper half.
fn sibling_supernet(
    current: &AddressRange,
    next: &AddressRange,
    min_merge_prefix: u8,
) -> Option<AddressRange> {
    let prefix_len = current.prefix_len();
    if prefix_len != next.prefix_len() || prefix_len < min_merge_prefix {
        return None;
    }
    let supernet = current.supernet()?;
    let is_pair = supernet.base() == current.base()
        && next.base_bits() > current.broadcast_bits()
        && supernet.broadcast_bits() >= next.broadcast_bits();
    is_pair.then_some(supernet)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> LogicalSet {
        items.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn run(items: &[&str]) -> Vec<String> {
        coalesce(&set(items), &CoalesceOptions::default())
            .ranges
            .to_cidr_strings()
    }

    #[test]
    fn test_coalesce_empty() {
        let result = coalesce(&LogicalSet::new(), &CoalesceOptions::default());
        assert!(result.ranges.is_empty());
        assert_eq!(result.input_count, 0);
        assert_eq!(result.output_count, 0);
    }

    #[test]
    fn test_coalesce_single() {
        assert_eq!(run(&["192.168.1.0/24"]), vec!["192.168.1.0/24"]);
    }

    #[test]
    fn test_adjacent_merge() {
        assert_eq!(run(&["10.0.0.0/25", "10.0.0.128/25"]), vec!["10.0.0.0/24"]);
    }

    #[test]
    fn test_supernet_absorption() {
        assert_eq!(run(&["10.0.0.0/16", "10.0.5.0/24"]), vec!["10.0.0.0/16"]);
    }

    #[test]
    fn test_whole_space_absorbs_everything() {
        assert_eq!(
            run(&["0.0.0.0/0", "10.0.0.0/8", "192.168.1.1", "255.255.255.0/24"]),
            vec!["0.0.0.0/0"]
        );
    }

    #[test]
    fn test_adjacent_but_not_siblings() {
        // 10.0.1.0/24 and 10.0.2.0/24 touch but belong to different /23s
        assert_eq!(
            run(&["10.0.1.0/24", "10.0.2.0/24"]),
            vec!["10.0.1.0/24", "10.0.2.0/24"]
        );
    }

    #[test]
    fn test_different_prefix_lengths_not_merged() {
        assert_eq!(
            run(&["10.0.0.0/25", "10.0.0.128/26", "10.0.0.192/26"]),
            vec!["10.0.0.0/24"]
        );
        assert_eq!(
            run(&["10.0.0.0/25", "10.0.0.128/26"]),
            vec!["10.0.0.0/25", "10.0.0.128/26"]
        );
    }

    #[test]
    fn test_min_merge_prefix_threshold() {
        // Two /8 siblings merge into a /7, two /7 siblings do not
        assert_eq!(run(&["10.0.0.0/8", "11.0.0.0/8"]), vec!["10.0.0.0/7"]);
        assert_eq!(
            run(&["8.0.0.0/7", "10.0.0.0/7"]),
            vec!["8.0.0.0/7", "10.0.0.0/7"]
        );

        let options = CoalesceOptions {
            min_merge_prefix: 0,
            ..Default::default()
        };
        let result = coalesce(&set(&["8.0.0.0/7", "10.0.0.0/7"]), &options);
        assert_eq!(result.ranges.to_cidr_strings(), vec!["8.0.0.0/6"]);
    }

    #[test]
    fn test_fixed_point_collapses_chains() {
        // Four /26 quarters need two levels of merging
        let input = ["10.0.0.0/26", "10.0.0.64/26", "10.0.0.128/26", "10.0.0.192/26"];
        let result = coalesce(&set(&input), &CoalesceOptions::default());
        assert_eq!(result.ranges.to_cidr_strings(), vec!["10.0.0.0/24"]);
        assert_eq!(result.merge_passes, 2);
    }

    #[test]
    fn test_single_pass_leaves_chains() {
        let input = ["10.0.0.0/26", "10.0.0.64/26", "10.0.0.128/26", "10.0.0.192/26"];
        let options = CoalesceOptions {
            merge_mode: MergeMode::SinglePass,
            ..Default::default()
        };
        let result = coalesce(&set(&input), &options);
        assert_eq!(
            result.ranges.to_cidr_strings(),
            vec!["10.0.0.0/25", "10.0.0.128/25"]
        );
        assert_eq!(result.merge_passes, 1);
    }

    #[test]
    fn test_merge_cascades_into_existing_sibling() {
        // /25 pair becomes a /24 that then pairs with the neighbouring /24
        assert_eq!(
            run(&["10.0.0.0/24", "10.0.1.0/25", "10.0.1.128/25"]),
            vec!["10.0.0.0/23"]
        );
    }

    #[test]
    fn test_counts() {
        let result = coalesce(
            &set(&["10.0.0.0/25", "10.0.0.128/25", "10.0.0.7", "172.16.0.0/12"]),
            &CoalesceOptions::default(),
        );
        assert_eq!(result.input_count, 4);
        assert_eq!(result.output_count, 2);
    }

    #[test]
    fn test_unsorted_input_with_broader_later() {
        let ranges: Vec<AddressRange> = ["10.0.1.0/24", "10.0.0.0/24", "10.0.0.0/16", "10.0.0.0/24"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let (kept, _) = coalesce_ranges(ranges, &CoalesceOptions::default());
        assert_eq!(kept, vec!["10.0.0.0/16".parse::<AddressRange>().unwrap()]);
    }

    #[test]
    fn test_collapse_tail_removes_covered_predecessors() {
        let mut kept: Vec<AddressRange> = ["10.0.0.0/24", "10.0.1.0/24", "10.0.0.0/16"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        collapse_tail(&mut kept);
        assert_eq!(kept, vec!["10.0.0.0/16".parse::<AddressRange>().unwrap()]);
    }

    #[test]
    fn test_serde_options() {
        let yaml = "min_merge_prefix: 16\nmerge_mode: single_pass\n";
        let options: CoalesceOptions = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(options.min_merge_prefix, 16);
        assert_eq!(options.merge_mode, MergeMode::SinglePass);

        let options: CoalesceOptions = serde_yaml::from_str("{}").unwrap();
        assert_eq!(options, CoalesceOptions::default());
    }
}
