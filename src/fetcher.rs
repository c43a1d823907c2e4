//! HTTP fetcher and response parsers for allow/deny feeds.
//!
//! The fetcher only turns a feed into raw token strings. Whether a token is
//! a usable address is decided later by the normalizer.

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{SourceConfig, SourceFormat};
use crate::error::CidrfoldError;
use crate::normalizer::COMMENT_MARKERS;
use crate::stats::Side;
use crate::utils::{format_bytes, format_count};

const TIMEOUT_SECS: u64 = 30;
const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 2000;

/// Maximum size per feed response (10 MB)
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Maximum total size for all downloads combined (50 MB)
const MAX_TOTAL_SIZE: usize = 50 * 1024 * 1024;

/// Maximum concurrent HTTP requests
const MAX_CONCURRENT_REQUESTS: usize = 6;

/// Raw tokens extracted from one feed
#[derive(Debug)]
pub struct FetchResult {
    pub name: String,
    pub side: Side,
    pub tokens: Vec<String>,
    pub bytes: usize,
}

/// HTTP client for fetching feeds
pub struct Fetcher {
    client: Client,
    /// Cumulative download size tracker (shared by concurrent fetches)
    total_downloaded: AtomicUsize,
}

impl Fetcher {
    /// Create a new fetcher with default settings
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(format!("cidrfold/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            total_downloaded: AtomicUsize::new(0),
        })
    }

    /// Get the total bytes downloaded so far
    pub fn total_downloaded(&self) -> usize {
        self.total_downloaded.load(Ordering::Relaxed)
    }

    /// Fetch one feed and extract its tokens
    pub async fn fetch_source(&self, source: &SourceConfig) -> Result<FetchResult> {
        info!("Fetching {}...", source.name);

        let content = self
            .fetch_with_retry(&source.url)
            .await
            .with_context(|| format!("Failed to fetch {}", source.name))?;

        let tokens = parse_body(&source.format, &content)
            .with_context(|| format!("Failed to parse {}", source.name))?;

        info!(
            "Fetched {} - {} tokens ({})",
            source.name,
            format_count(tokens.len()),
            format_bytes(content.len() as u64)
        );

        Ok(FetchResult {
            name: source.name.clone(),
            side: source.side,
            tokens,
            bytes: content.len(),
        })
    }

    /// Fetch several feeds concurrently with limited parallelism.
    ///
    /// Each result is paired with the source it came from, so failures can
    /// be attributed.
    pub async fn fetch_sources<'a>(
        &self,
        sources: &[&'a SourceConfig],
    ) -> Vec<(&'a SourceConfig, Result<FetchResult>)> {
        use futures::stream::{self, StreamExt};

        stream::iter(
            sources
                .iter()
                .map(|&source| async move { (source, self.fetch_source(source).await) }),
        )
        .buffer_unordered(MAX_CONCURRENT_REQUESTS)
        .collect()
        .await
    }

    /// Fetch content with retry logic and size validation
    async fn fetch_with_retry(&self, url: &str) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = RETRY_DELAY_MS * (1 << (attempt - 1));
                debug!("Retry {} after {}ms for {}", attempt, delay, url);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let response = match self.client.get(url).send().await {
                Ok(response) => response,
                Err(e) => {
                    last_error = Some(anyhow::Error::from(e));
                    continue;
                }
            };

            if !response.status().is_success() {
                last_error = Some(anyhow::anyhow!("HTTP {}", response.status()));
                continue;
            }

            if let Some(content_length) = response.content_length() {
                self.check_size(content_length as usize)?;
            }

            let body = response
                .text()
                .await
                .context("Failed to read response body")?;
            self.check_size(body.len())?;

            let new_total = self
                .total_downloaded
                .fetch_add(body.len(), Ordering::Relaxed)
                + body.len();
            if new_total > MAX_TOTAL_SIZE {
                return Err(CidrfoldError::Source(format!(
                    "Cumulative download limit exceeded: {} bytes (max: {} bytes)",
                    new_total, MAX_TOTAL_SIZE
                ))
                .into());
            }

            return Ok(body);
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Unknown error")))
    }

    /// Reject responses over the per-response or remaining cumulative budget
    fn check_size(&self, size: usize) -> Result<()> {
        if size > MAX_RESPONSE_SIZE {
            return Err(CidrfoldError::Source(format!(
                "Response too large: {} bytes (max: {} bytes)",
                size, MAX_RESPONSE_SIZE
            ))
            .into());
        }
        let current_total = self.total_downloaded();
        if current_total + size > MAX_TOTAL_SIZE {
            return Err(CidrfoldError::Source(format!(
                "Cumulative download limit exceeded: {} + {} > {} bytes",
                current_total, size, MAX_TOTAL_SIZE
            ))
            .into());
        }
        Ok(())
    }
}

/// Extract raw tokens from a response body according to its format
pub fn parse_body(format: &SourceFormat, content: &str) -> Result<Vec<String>> {
    match format {
        SourceFormat::Json { field } => parse_json(content, field),
        SourceFormat::Text => Ok(parse_text(content)),
        SourceFormat::HtmlTable { column } => parse_html_table(content, *column),
    }
}

/// Collect every string found under key `field`, at any depth.
///
/// Handles both `{"prefixes": [{"ipv4Prefix": "..."}]}` (Googlebot, Bingbot,
/// Applebot) and `{"hooks": ["...", "..."]}` (GitHub meta) layouts.
pub fn parse_json(content: &str, field: &str) -> Result<Vec<String>> {
    let document: Value = serde_json::from_str(content).context("Invalid JSON document")?;
    let mut tokens = Vec::new();
    collect_field(&document, field, &mut tokens);
    Ok(tokens)
}

fn collect_field(value: &Value, field: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == field {
                    push_strings(child, out);
                } else {
                    collect_field(child, field, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_field(item, field, out);
            }
        }
        _ => {}
    }
}

fn push_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                push_strings(item, out);
            }
        }
        _ => {}
    }
}

/// One token per non-empty, non-comment line
///
/// Whole-line comments are dropped here; inline comments are left for the
/// normalizer.
pub fn parse_text(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_MARKERS))
        .map(str::to_string)
        .collect()
}

/// Text of the `column`-th `<td>` cell of every table row
pub fn parse_html_table(content: &str, column: usize) -> Result<Vec<String>> {
    let row_re = Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>")?;
    let cell_re = Regex::new(r"(?is)<td\b[^>]*>(.*?)</td>")?;
    let tag_re = Regex::new(r"(?s)<[^>]*>")?;

    let tokens = row_re
        .captures_iter(content)
        .filter_map(|row| {
            let cells = row.get(1)?.as_str();
            let cell = cell_re.captures_iter(cells).nth(column)?;
            let text = tag_re.replace_all(cell.get(1)?.as_str(), "");
            let text = text.replace("&nbsp;", " ");
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
        .collect();

    Ok(tokens)
}
