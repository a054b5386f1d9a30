//! Fetching of blocklist sources.
//!
//! A source is either a URL or a local file path. [`Fetcher::fetch_all`]
//! spawns one task per source; tasks only start work while holding a permit
//! from a counting semaphore, so at most `concurrency` retrievals are in
//! flight at once. A failed source is logged and skipped, it never aborts
//! its siblings.

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::utils::{format_bytes, format_count};

/// Default number of concurrent downloads
pub const DEFAULT_WORKERS: usize = 10;

/// Default per-source timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Maximum accepted size for one list (64 MB)
/// The largest public domain lists are in the tens of megabytes.
pub const MAX_LIST_SIZE: usize = 64 * 1024 * 1024;

/// Where a blocklist comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    File(PathBuf),
}

impl Source {
    /// Classify a source reference: anything with an http(s) scheme is a URL,
    /// everything else a local path.
    pub fn parse(reference: &str) -> Self {
        let reference = reference.trim();
        let lower = reference.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Source::Url(reference.to_string())
        } else {
            Source::File(PathBuf::from(reference))
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => f.write_str(url),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Load source references from a list file.
///
/// Blank lines and lines starting with `#` are ignored.
pub fn load_sources(path: &Path) -> Result<Vec<Source>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read source list: {}", path.display()))?;
    Ok(parse_sources(&content))
}

/// Parse the contents of a source list
pub fn parse_sources(content: &str) -> Vec<Source> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(Source::parse)
        .collect()
}

/// Outcome counts of a [`Fetcher::fetch_all`] run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Lines delivered to the callback across all successful sources
    pub lines: usize,
}

/// Retrieves list bodies over HTTP or from disk
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    timeout: Duration,
    max_size: usize,
}

impl Fetcher {
    /// Create a fetcher whose every retrieval is bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("blocklist-merger/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            timeout,
            max_size: MAX_LIST_SIZE,
        })
    }

    /// Override the per-list size limit
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Retrieve one source body. Performs a single attempt.
    pub async fn fetch(&self, source: &Source) -> Result<String> {
        match source {
            Source::Url(url) => self.fetch_url(url).await,
            Source::File(path) => self.read_file(path).await,
        }
    }

    async fn fetch_url(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;

        if response.status() != StatusCode::OK {
            anyhow::bail!("HTTP {}", response.status());
        }

        if let Some(content_length) = response.content_length() {
            if content_length as usize > self.max_size {
                anyhow::bail!(
                    "Response too large: {} (max: {})",
                    format_bytes(content_length),
                    format_bytes(self.max_size as u64)
                );
            }
        }

        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        self.check_size(body.len())?;
        Ok(body)
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        let bytes = tokio::time::timeout(self.timeout, tokio::fs::read(path))
            .await
            .map_err(|_| anyhow::anyhow!("Timed out after {:?}", self.timeout))?
            .with_context(|| format!("Failed to read {}", path.display()))?;

        self.check_size(bytes.len())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn check_size(&self, len: usize) -> Result<()> {
        if len > self.max_size {
            anyhow::bail!(
                "Downloaded content too large: {} (max: {})",
                format_bytes(len as u64),
                format_bytes(self.max_size as u64)
            );
        }
        Ok(())
    }

    /// Fetch every source concurrently and feed each body line to `on_line`.
    ///
    /// At most `concurrency` sources are retrieved at once; the rest wait for
    /// a permit. Returns once every task has finished. Failures are logged
    /// and counted, never returned.
    pub async fn fetch_all<F>(
        &self,
        sources: &[Source],
        concurrency: usize,
        on_line: F,
    ) -> FetchSummary
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let on_line = Arc::new(on_line);
        let mut handles = Vec::with_capacity(sources.len());

        for source in sources {
            let semaphore = Arc::clone(&semaphore);
            let on_line = Arc::clone(&on_line);
            let fetcher = self.clone();
            let source = source.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .context("Admission gate closed")?;

                debug!("Fetching {}", source);
                let body = fetcher.fetch(&source).await.map_err(|e| {
                    warn!("Failed to fetch {}: {:#}", source, e);
                    e
                })?;

                let mut lines = 0;
                for line in body.lines() {
                    on_line(line);
                    lines += 1;
                }
                info!("Fetched {} - {} lines", source, format_count(lines));
                Ok::<_, anyhow::Error>(lines)
            }));
        }

        let mut summary = FetchSummary::default();
        for handle in handles {
            match handle.await {
                Ok(Ok(lines)) => {
                    summary.succeeded += 1;
                    summary.lines += lines;
                }
                Ok(Err(_)) => summary.failed += 1,
                Err(e) => {
                    error!("Fetch task failed: {}", e);
                    summary.failed += 1;
                }
            }
        }

        if summary.succeeded == 0 && !sources.is_empty() {
            warn!("No source could be fetched ({} failed)", summary.failed);
        }

        summary
    }
}
