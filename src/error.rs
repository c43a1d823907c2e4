//! Error types for cidrfold.

use thiserror::Error;

/// Why the normalizer refused a raw token.
///
/// Rejections are never fatal: the caller counts them and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejected {
    #[error("empty token")]
    Empty,

    #[error("token contains only a comment")]
    CommentOnly,

    #[error("malformed IPv4 address: {0}")]
    MalformedAddress(String),

    #[error("malformed prefix length: {0}")]
    MalformedPrefix(String),

    #[error("prefix length {0} out of range (0-32)")]
    PrefixOutOfRange(u32),

    #[error("unsupported address family: {0}")]
    UnsupportedFamily(String),
}

impl Rejected {
    /// Short stable label, used as a counter key in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Rejected::Empty => "empty",
            Rejected::CommentOnly => "comment_only",
            Rejected::MalformedAddress(_) => "malformed_address",
            Rejected::MalformedPrefix(_) => "malformed_prefix",
            Rejected::PrefixOutOfRange(_) => "prefix_out_of_range",
            Rejected::UnsupportedFamily(_) => "unsupported_family",
        }
    }
}

#[derive(Error, Debug)]
pub enum CidrfoldError {
    #[error("Source error: {0}")]
    Source(String),

    #[error("Output error: {0}")]
    Output(String),
}
