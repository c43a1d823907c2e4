//! Set of address ranges with canonical ordering and rendering.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use crate::range::AddressRange;

/// A collection of [`AddressRange`] with set semantics.
///
/// Iteration always follows [`AddressRange`] ordering (base ascending, then
/// prefix length ascending), which is also the order used for output files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogicalSet {
    ranges: BTreeSet<AddressRange>,
}

impl LogicalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a range. Returns `false` if an equal range was already present.
    pub fn insert(&mut self, range: AddressRange) -> bool {
        self.ranges.insert(range)
    }

    pub fn contains(&self, range: &AddressRange) -> bool {
        self.ranges.contains(range)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AddressRange> {
        self.ranges.iter()
    }

    /// First member that contains `query`, if any.
    pub fn covering(&self, query: &AddressRange) -> Option<&AddressRange> {
        self.ranges.iter().find(|range| range.contains(query))
    }

    /// First member that contains the single address `addr`, if any.
    pub fn covering_addr(&self, addr: Ipv4Addr) -> Option<&AddressRange> {
        self.covering(&AddressRange::host(addr))
    }

    /// Sum of the sizes of all members.
    ///
    /// Only meaningful as an address count once the set is coalesced;
    /// overlapping members are counted twice. Saturates instead of wrapping.
    pub fn address_count(&self) -> u64 {
        self.ranges
            .iter()
            .fold(0u64, |acc, range| acc.saturating_add(range.size()))
    }

    /// Canonical CIDR strings in set order.
    pub fn to_cidr_strings(&self) -> Vec<String> {
        self.ranges.iter().map(ToString::to_string).collect()
    }

    /// One CIDR per line, each terminated by a newline. Empty set renders as
    /// an empty string.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.ranges.len() * 19);
        for range in &self.ranges {
            out.push_str(&range.to_string());
            out.push('\n');
        }
        out
    }
}

impl FromIterator<AddressRange> for LogicalSet {
    fn from_iter<I: IntoIterator<Item = AddressRange>>(iter: I) -> Self {
        Self {
            ranges: iter.into_iter().collect(),
        }
    }
}

impl Extend<AddressRange> for LogicalSet {
    fn extend<I: IntoIterator<Item = AddressRange>>(&mut self, iter: I) {
        self.ranges.extend(iter);
    }
}

impl IntoIterator for LogicalSet {
    type Item = AddressRange;
    type IntoIter = std::collections::btree_set::IntoIter<AddressRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.into_iter()
    }
}

impl<'a> IntoIterator for &'a LogicalSet {
    type Item = &'a AddressRange;
    type IntoIter = std::collections::btree_set::Iter<'a, AddressRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}
