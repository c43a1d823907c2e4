//! Configuration management for cidrfold.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::coalescer::CoalesceOptions;
use crate::output::write_atomic;
use crate::range::MAX_PREFIX_LEN;
use crate::stats::Side;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "cidrfold.yaml";

/// Name under which inline `static_allow` / `static_deny` entries are reported
pub const STATIC_SOURCE_NAME: &str = "static";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote feeds, each tagged with the set it contributes to
    pub sources: Vec<SourceConfig>,

    /// Inline allow entries (IPs/CIDRs), always included
    pub static_allow: Vec<String>,

    /// Inline deny entries (IPs/CIDRs), always included
    pub static_deny: Vec<String>,

    /// Coalescing behaviour
    pub coalesce: CoalesceOptions,

    /// Where the final sets and the run report are written
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            static_allow: Vec::new(),
            static_deny: Vec::new(),
            coalesce: CoalesceOptions::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                bail!("Source name cannot be empty (url: {})", source.url);
            }
            if source.name == STATIC_SOURCE_NAME {
                bail!("Source name '{}' is reserved", STATIC_SOURCE_NAME);
            }
            if !names.insert(source.name.as_str()) {
                bail!("Duplicate source name '{}'", source.name);
            }
            if source.enabled && !source.url.starts_with("https://") {
                bail!(
                    "Source '{}' URL must use HTTPS: {}",
                    source.name,
                    source.url
                );
            }
            if let SourceFormat::Json { field } = &source.format {
                if field.trim().is_empty() {
                    bail!("Source '{}' needs a non-empty JSON field", source.name);
                }
            }
        }

        if self.coalesce.min_merge_prefix > MAX_PREFIX_LEN {
            bail!(
                "Invalid coalesce.min_merge_prefix {}. Must be between 0 and {}",
                self.coalesce.min_merge_prefix,
                MAX_PREFIX_LEN
            );
        }

        if self.output.allow_path == self.output.deny_path {
            bail!(
                "output.allow_path and output.deny_path must differ: {:?}",
                self.output.allow_path
            );
        }

        Ok(())
    }

    /// Save configuration to YAML file atomically
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        write_atomic(path.as_ref(), content.as_bytes())
            .with_context(|| format!("Failed to persist config file: {:?}", path.as_ref()))
    }

    /// Enabled sources, optionally restricted to one side
    pub fn enabled_sources(&self, side: Option<Side>) -> Vec<&SourceConfig> {
        self.sources
            .iter()
            .filter(|s| s.enabled && side.map_or(true, |side| s.side == side))
            .collect()
    }

    /// Inline entries for one side
    pub fn static_entries(&self, side: Side) -> &[String] {
        match side {
            Side::Allow => &self.static_allow,
            Side::Deny => &self.static_deny,
        }
    }

    /// Generate default config with comments
    pub fn generate_default_yaml() -> String {
        include_str!("../templates/config.yaml").to_string()
    }
}

/// One remote feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    pub name: String,
    pub side: Side,
    pub url: String,
    pub format: SourceFormat,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Shape of a feed's response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceFormat {
    /// JSON document; every string found under `field` is a token
    Json { field: String },
    /// One IP/CIDR per line, `#`/`;` comments
    Text,
    /// HTML page; the `column`-th cell (0-based) of each table row is a token
    HtmlTable {
        #[serde(default)]
        column: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    pub allow_path: PathBuf,
    pub deny_path: PathBuf,
    pub report_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            allow_path: PathBuf::from("output/allow.txt"),
            deny_path: PathBuf::from("output/deny.txt"),
            report_path: PathBuf::from("output/report.json"),
        }
    }
}

impl OutputConfig {
    /// Lock file guarding concurrent runs writing to the same outputs
    pub fn lock_path(&self) -> PathBuf {
        let dir = match self.deny_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        dir.join(".cidrfold.lock")
    }
}

fn default_true() -> bool {
    true
}

fn json_source(name: &str, url: &str) -> SourceConfig {
    SourceConfig {
        name: name.to_string(),
        side: Side::Allow,
        url: url.to_string(),
        format: SourceFormat::Json {
            field: "ipv4Prefix".to_string(),
        },
        enabled: true,
    }
}

fn text_source(name: &str, url: &str) -> SourceConfig {
    SourceConfig {
        name: name.to_string(),
        side: Side::Deny,
        url: url.to_string(),
        format: SourceFormat::Text,
        enabled: true,
    }
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        json_source(
            "googlebot",
            "https://developers.google.com/static/search/apis/ipranges/googlebot.json",
        ),
        json_source("bingbot", "https://www.bing.com/toolbox/bingbot.json"),
        json_source("applebot", "https://search.developer.apple.com/applebot.json"),
        text_source(
            "firehol_level1",
            "https://iplists.firehol.org/files/firehol_level1.netset",
        ),
        text_source(
            "spamhaus_drop",
            "https://iplists.firehol.org/files/spamhaus_drop.netset",
        ),
    ]
}
