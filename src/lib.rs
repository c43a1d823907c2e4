//! # cidrfold - canonical allow/deny CIDR sets
//!
//! Turns heterogeneous, noisy IPv4 feeds (crawler publications, blocklists,
//! hand-maintained lists) into two compact, canonical sets suitable for a
//! WAF rule engine: an allow set and a deny set with everything the allow set
//! already covers removed.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        cidrfold                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                                 │
//! │    └── Commands: update, build, check, stats, init          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config (serde_yaml)                                        │
//! │    └── Sources, static entries, coalesce options, outputs   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Fetcher (reqwest + rustls)                                 │
//! │    └── JSON, plain-text and HTML-table feed parsers         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SetBuilder                                                 │
//! │    ├── Normalizer   token -> AddressRange | Rejected        │
//! │    ├── Coalescer    containment + sibling merges            │
//! │    └── Resolver     drop deny ranges covered by allow       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Output (tempfile)                                          │
//! │    └── One CIDR per line, JSON run report                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```
//! use cidrfold::{CoalesceOptions, SetBuilder, Side};
//!
//! let mut builder = SetBuilder::new(CoalesceOptions::default());
//! builder.add_source(Side::Allow, "crawler", ["8.8.8.0/24", "8.8.9.0/24", "junk"]);
//! builder.add_source(Side::Deny, "blocklist", ["8.8.8.8", "5.5.5.0/24"]);
//!
//! let output = builder.build();
//! assert_eq!(output.allow.to_cidr_strings(), vec!["8.8.8.0/23"]);
//! assert_eq!(output.deny.to_cidr_strings(), vec!["5.5.5.0/24"]);
//! assert_eq!(output.report.allow.rejected, 1);
//! ```
//!
//! ## Modules
//!
//! - [`builder`] - Pipeline orchestration and per-run accounting
//! - [`cli`] - Command-line interface definitions
//! - [`coalescer`] - Containment removal and sibling merging
//! - [`commands`] - CLI command implementations
//! - [`config`] - Configuration parsing and validation
//! - [`error`] - Rejection reasons and I/O error types
//! - [`fetcher`] - HTTP client and feed parsers
//! - [`lock`] - File locking for concurrent execution prevention
//! - [`normalizer`] - Token to canonical range conversion
//! - [`output`] - Atomic set and report persistence
//! - [`range`] - The IPv4 CIDR value type
//! - [`resolver`] - Allow-over-deny conflict resolution
//! - [`set`] - Ordered, deduplicated range collection
//! - [`stats`] - Run report and statistics
//! - [`utils`] - Common utility functions (formatting, truncation)

pub mod builder;
pub mod cli;
pub mod coalescer;
pub mod commands;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod lock;
pub mod normalizer;
pub mod output;
pub mod range;
pub mod resolver;
pub mod set;
pub mod stats;
pub mod utils;

pub use builder::{BuildOutput, SetBuilder};
pub use cli::{Cli, Commands};
pub use coalescer::{coalesce, CoalesceOptions, Coalesced, MergeMode};
pub use config::Config;
pub use error::Rejected;
pub use normalizer::normalize;
pub use range::AddressRange;
pub use resolver::{resolve, Resolution};
pub use set::LogicalSet;
pub use stats::{RunReport, Side};
