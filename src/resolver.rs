//! Allow-over-deny conflict resolution.
//!
//! A deny range is dropped when some allow range fully contains it. The
//! reverse case, an allow range sitting inside a broader deny range, is left
//! alone: the deny range is never split into deny-minus-allow fragments.
//! Those overlaps are counted and reported so they can be reviewed.

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::range::{mask, AddressRange, MAX_PREFIX_LEN};
use crate::set::LogicalSet;

/// What happens to a deny range that only partially overlaps the allow set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialOverlapPolicy {
    /// Keep the deny range whole.
    KeepDeny,
}

/// Policy applied by [`resolve`].
pub const PARTIAL_OVERLAP_POLICY: PartialOverlapPolicy = PartialOverlapPolicy::KeepDeny;

/// Outcome of resolving a deny set against an allow set.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub deny: LogicalSet,
    /// Deny ranges removed because an allow range contains them.
    pub removed: usize,
    /// Allow ranges strictly inside a kept deny range.
    pub unresolved_overlaps: usize,
}

/// Exact-match index of a set of prefixes.
///
/// Answers "is any member a supernet of X" with at most 33 probes, one per
/// candidate prefix length.
pub struct PrefixIndex {
    entries: HashSet<(u32, u8)>,
    /// Bit `n` set when some member has prefix length `n`.
    lengths: u64,
}

impl PrefixIndex {
    pub fn new<'a, I>(ranges: I) -> Self
    where
        I: IntoIterator<Item = &'a AddressRange>,
    {
        let mut entries = HashSet::new();
        let mut lengths = 0u64;
        for range in ranges {
            entries.insert((range.base_bits(), range.prefix_len()));
            lengths |= 1u64 << range.prefix_len();
        }
        Self { entries, lengths }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if some indexed range contains `range` (non-strict).
    pub fn contains_covering(&self, range: &AddressRange) -> bool {
        (0..=range.prefix_len().min(MAX_PREFIX_LEN)).any(|len| {
            self.lengths & (1u64 << len) != 0
                && self.entries.contains(&(range.base_bits() & mask(len), len))
        })
    }
}

/// Remove from `deny` every range contained in some range of `allow`.
///
/// Neither input is modified. An empty allow set removes nothing.
pub fn resolve(deny: &LogicalSet, allow: &LogicalSet) -> Resolution {
    if allow.is_empty() {
        debug!("Allow set empty, nothing to resolve");
        return Resolution {
            deny: deny.clone(),
            removed: 0,
            unresolved_overlaps: 0,
        };
    }

    let allow_index = PrefixIndex::new(allow.iter());
    let (kept, dropped): (Vec<AddressRange>, Vec<AddressRange>) = deny
        .iter()
        .copied()
        .partition(|range| !allow_index.contains_covering(range));

    for range in &dropped {
        debug!("Deny range {} is allowlisted, removing", range);
    }

    let kept: LogicalSet = kept.into_iter().collect();
    let unresolved_overlaps = count_unresolved(&kept, allow);
    if unresolved_overlaps > 0 {
        warn!(
            "{} allow ranges lie inside broader deny ranges and stay denied ({:?})",
            unresolved_overlaps, PARTIAL_OVERLAP_POLICY
        );
    }

    Resolution {
        deny: kept,
        removed: dropped.len(),
        unresolved_overlaps,
    }
}

/// Allow ranges that a kept deny range strictly contains.
fn count_unresolved(deny: &LogicalSet, allow: &LogicalSet) -> usize {
    let deny_index = PrefixIndex::new(deny.iter());
    allow
        .iter()
        .filter(|range| deny_index.contains_covering(range))
        .count()
}
