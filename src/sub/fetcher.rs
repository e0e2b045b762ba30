//! Subscription document fetching and link harvesting
//!
//! Downloads subscription documents with bounded concurrency, runs each
//! body through the extractor, and merges everything into one deduplicated
//! link list. A single bad source never aborts the harvest.

use crate::sub::extractor;
use crate::Result;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::warn;

/// Default timeout for one subscription download
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Default user agent for HTTP requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Default number of simultaneously in-flight downloads
fn default_concurrency() -> usize {
    num_cpus::get() * 8
}

/// Configuration for the subscription fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Timeout for each HTTP request
    pub timeout: Duration,
    /// Number of simultaneously in-flight downloads
    pub concurrency: usize,
    /// User agent for HTTP requests
    pub user_agent: String,
    /// Treat bare base64 lines in documents as implicit vmess payloads
    pub decode_base64_lines: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: default_concurrency(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            decode_base64_lines: false,
        }
    }
}

impl FetcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_base64_lines(mut self, enabled: bool) -> Self {
        self.decode_base64_lines = enabled;
        self
    }
}

/// Outcome of harvesting a single subscription source
#[derive(Debug, Clone)]
pub struct SourceReport {
    /// The subscription URL that was fetched
    pub source: String,
    /// Links extracted from this source before global dedup
    pub link_count: usize,
    /// Error message if the fetch failed
    pub error: Option<String>,
}

impl SourceReport {
    pub fn success(source: String, link_count: usize) -> Self {
        Self {
            source,
            link_count,
            error: None,
        }
    }

    pub fn failure(source: String, error: String) -> Self {
        Self {
            source,
            link_count: 0,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of harvesting an entire source list
#[derive(Debug, Clone)]
pub struct Harvest {
    /// Globally deduplicated candidate links
    pub links: Vec<String>,
    /// Per-source outcomes, in completion order
    pub reports: Vec<SourceReport>,
}

impl Harvest {
    /// Number of sources that failed to fetch
    pub fn failed_sources(&self) -> usize {
        self.reports.iter().filter(|r| !r.is_success()).count()
    }
}

/// Fetcher for subscription documents
pub struct Fetcher {
    config: FetcherConfig,
    client: Client,
}

impl Fetcher {
    /// Create a fetcher with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(FetcherConfig::default())
    }

    /// Create a fetcher with custom configuration
    pub fn with_config(config: FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { config, client })
    }

    /// Download one subscription document; non-2xx statuses are errors
    pub async fn fetch_document(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Fetch every source, extract links, and merge them into one
    /// deduplicated list
    ///
    /// Always completes once every URL has been attempted; fetch failures
    /// are logged and skipped.
    pub async fn harvest(&self, urls: &[String]) -> Harvest {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));

        let outcomes = stream::iter(urls.iter().cloned())
            .map(|url| {
                let sem = Arc::clone(&semaphore);
                let fetcher = self.clone();
                async move {
                    // Semaphore acquire only fails if the semaphore is closed,
                    // which won't happen here since we own the Arc and keep it
                    // alive for the duration of the harvest.
                    let _permit = sem
                        .acquire()
                        .await
                        .expect("Semaphore closed unexpectedly");
                    match fetcher.fetch_document(&url).await {
                        Ok(body) => {
                            let links = fetcher.extract(&body);
                            (SourceReport::success(url, links.len()), links)
                        }
                        Err(e) => {
                            warn!(source = %url, error = %e, "skipping unreachable subscription");
                            (SourceReport::failure(url, e.to_string()), Vec::new())
                        }
                    }
                }
            })
            .buffer_unordered(self.config.concurrency)
            .collect::<Vec<_>>()
            .await;

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        let mut reports = Vec::with_capacity(outcomes.len());
        for (report, extracted) in outcomes {
            reports.push(report);
            for link in extracted {
                if seen.insert(link.clone()) {
                    links.push(link);
                }
            }
        }

        Harvest { links, reports }
    }

    fn extract(&self, body: &str) -> Vec<String> {
        if self.config.decode_base64_lines {
            extractor::extract_links_with_base64(body)
        } else {
            extractor::extract_links(body)
        }
    }
}

impl Clone for Fetcher {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            client: self.client.clone(),
        }
    }
}
