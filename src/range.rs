//! Canonical IPv4 network prefix.
//!
//! [`AddressRange`] is the value type the whole engine works with. It is
//! always stored in masked form, so `10.0.0.5/24` and `10.0.0.0/24` are the
//! same value once parsed.

use ipnet::Ipv4Net;
use std::cmp::Ordering;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::Rejected;
use crate::normalizer::normalize;

/// Longest IPv4 prefix length.
pub const MAX_PREFIX_LEN: u8 = 32;

/// Netmask for a prefix length. `prefix_len` must be at most 32.
pub(crate) fn mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (MAX_PREFIX_LEN - prefix_len)
    }
}

/// One IPv4 network prefix in canonical (masked) form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    base: u32,
    prefix_len: u8,
}

impl AddressRange {
    /// Build a range, masking `addr` down to `prefix_len` bits.
    ///
    /// Returns `None` if `prefix_len` is greater than 32.
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Option<Self> {
        if prefix_len > MAX_PREFIX_LEN {
            return None;
        }
        Some(Self {
            base: u32::from(addr) & mask(prefix_len),
            prefix_len,
        })
    }

    /// A single host address (/32).
    pub fn host(addr: Ipv4Addr) -> Self {
        Self {
            base: u32::from(addr),
            prefix_len: MAX_PREFIX_LEN,
        }
    }

    /// Lowest address of the range.
    pub fn base(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.base)
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Highest address of the range.
    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.broadcast_bits())
    }

    /// Number of addresses covered. `u64` so that /0 fits.
    pub fn size(&self) -> u64 {
        1u64 << (MAX_PREFIX_LEN - self.prefix_len)
    }

    /// True if every address of `other` lies within `self`. Reflexive.
    pub fn contains(&self, other: &AddressRange) -> bool {
        self.prefix_len <= other.prefix_len && other.base & mask(self.prefix_len) == self.base
    }

    pub fn contains_addr(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & mask(self.prefix_len) == self.base
    }

    /// Two prefixes overlap exactly when one contains the other.
    pub fn overlaps(&self, other: &AddressRange) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// The range one bit broader than this one, or `None` for /0.
    pub fn supernet(&self) -> Option<AddressRange> {
        if self.prefix_len == 0 {
            return None;
        }
        let prefix_len = self.prefix_len - 1;
        Some(Self {
            base: self.base & mask(prefix_len),
            prefix_len,
        })
    }

    pub(crate) fn base_bits(&self) -> u32 {
        self.base
    }

    pub(crate) fn broadcast_bits(&self) -> u32 {
        self.base | !mask(self.prefix_len)
    }
}

impl Ord for AddressRange {
    fn cmp(&self, other: &Self) -> Ordering {
        self.base
            .cmp(&other.base)
            .then(self.prefix_len.cmp(&other.prefix_len))
    }
}

impl PartialOrd for AddressRange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base(), self.prefix_len)
    }
}

impl FromStr for AddressRange {
    type Err = Rejected;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
    }
}

impl From<Ipv4Addr> for AddressRange {
    fn from(addr: Ipv4Addr) -> Self {
        Self::host(addr)
    }
}

impl From<Ipv4Net> for AddressRange {
    fn from(net: Ipv4Net) -> Self {
        Self {
            base: u32::from(net.network()),
            prefix_len: net.prefix_len(),
        }
    }
}

impl From<AddressRange> for Ipv4Net {
    fn from(range: AddressRange) -> Self {
        // prefix_len is kept within 0..=32 by every constructor
        Ipv4Net::new(range.base(), range.prefix_len)
            .unwrap_or_else(|_| Ipv4Net::from(range.base()))
    }
}
