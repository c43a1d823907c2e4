//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(name = "cidrfold")]
#[command(author, version, about = "Build canonical allow/deny CIDR sets for WAF rule engines")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Quiet mode (for cron/CI jobs)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output, including every rejected token)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch all enabled sources, build both sets and write them
    Update {
        /// Fetch and process but don't write any file
        #[arg(long)]
        dry_run: bool,
    },

    /// Build both sets from local token files (one entry per line)
    Build {
        /// File with allow entries (repeatable)
        #[arg(long, value_name = "FILE")]
        allow: Vec<PathBuf>,

        /// File with deny entries (repeatable)
        #[arg(long, value_name = "FILE")]
        deny: Vec<PathBuf>,

        /// Process but don't write any file
        #[arg(long)]
        dry_run: bool,
    },

    /// Check whether an IP or CIDR is covered by the written sets
    Check {
        /// IP address or CIDR to check
        target: String,
    },

    /// Show the report of the last run
    Stats,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show version
    Version,
}
