//! Raw token to [`AddressRange`] normalization.
//!
//! Feeds mix bare hosts, CIDRs, hosts-in-subnet notation (`10.0.0.5/24`)
//! and trailing comments. Everything that can be read as an IPv4 prefix is
//! brought to canonical masked form; everything else is rejected with a
//! reason and left to the caller to count.

use std::net::Ipv4Addr;

use crate::error::Rejected;
use crate::range::{AddressRange, MAX_PREFIX_LEN};

/// Characters that start an inline comment (`#` for FireHOL netsets,
/// `;` for Spamhaus DROP lists).
pub const COMMENT_MARKERS: &[char] = &['#', ';'];

/// Normalize one raw token into a canonical [`AddressRange`].
///
/// # Examples
/// ```
/// use cidrfold::normalizer::normalize;
/// let a = normalize("10.0.0.5/24").unwrap();
/// let b = normalize("10.0.0.0/24").unwrap();
/// assert_eq!(a, b);
/// assert!(normalize("10.0.0.0/33").is_err());
/// ```
pub fn normalize(token: &str) -> Result<AddressRange, Rejected> {
    let token = token.trim();
    if token.is_empty() {
        return Err(Rejected::Empty);
    }

    let token = strip_comment(token);
    if token.is_empty() {
        return Err(Rejected::CommentOnly);
    }

    match token.split_once('/') {
        None => parse_address(token).map(AddressRange::host),
        Some((addr, prefix)) => {
            let addr = parse_address(addr)?;
            let prefix_len = parse_prefix_len(prefix)?;
            AddressRange::new(addr, prefix_len)
                .ok_or(Rejected::PrefixOutOfRange(u32::from(prefix_len)))
        }
    }
}

/// Drop everything from the first comment marker onward and re-trim.
fn strip_comment(token: &str) -> &str {
    match token.find(COMMENT_MARKERS) {
        Some(idx) => token[..idx].trim(),
        None => token,
    }
}

fn parse_address(s: &str) -> Result<Ipv4Addr, Rejected> {
    if s.contains(':') {
        return Err(Rejected::UnsupportedFamily(s.to_string()));
    }
    s.parse::<Ipv4Addr>()
        .map_err(|_| Rejected::MalformedAddress(s.to_string()))
}

fn parse_prefix_len(s: &str) -> Result<u8, Rejected> {
    // Only plain decimal digits; `u32::from_str` would also take a leading '+'
    if s.is_empty() || s.len() > 3 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Rejected::MalformedPrefix(s.to_string()));
    }
    let value: u32 = s
        .parse()
        .map_err(|_| Rejected::MalformedPrefix(s.to_string()))?;
    if value > u32::from(MAX_PREFIX_LEN) {
        return Err(Rejected::PrefixOutOfRange(value));
    }
    Ok(value as u8)
}
