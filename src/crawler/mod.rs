pub mod corpus;
pub mod domain;
pub mod extractor;


use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use ureq::Agent;

use self::domain::{CrawlDomain, PageUrl};
use self::extractor::{ExtractionConfig, Section, extract_sections};
use crate::progress::{progress_bar, progress_spinner};

/// Configuration for the web crawler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// User agent string to use for requests
    pub user_agent: String,
    /// Timeout for HTTP requests in seconds
    pub timeout_seconds: u64,
    /// Minimum delay between requests in milliseconds
    pub rate_limit_ms: u64,
    /// Maximum number of retry attempts for retryable errors
    pub max_retries: u32,
    /// Delay between retry attempts in seconds
    pub retry_delay_seconds: u64,
    /// How many link levels to follow from the seed
    pub max_depth: usize,
    /// Upper bound on pages visited per domain
    pub max_pages: usize,
}

impl Default for CrawlerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            user_agent: "handbook-rag/0.1 (+handbook crawler)".to_string(),
            timeout_seconds: 10,
            rate_limit_ms: 500,
            max_retries: 0,
            retry_delay_seconds: 5,
            max_depth: 3,
            max_pages: 100,
        }
    }
}

impl CrawlerConfig {
    #[inline]
    pub fn limits(&self) -> CrawlLimits {
        CrawlLimits {
            max_depth: self.max_depth,
            max_pages: self.max_pages,
        }
    }
}

/// Source of page markup for the crawler
#[async_trait]
pub trait PageFetcher: Send {
    /// Fetch the markup at `url`. Errors are per-page and never fatal to a crawl.
    async fn fetch(&mut self, url: &PageUrl) -> Result<String>;
}

/// HTTP client wrapper with rate limiting and retry logic
#[derive(Debug)]
pub struct HttpClient {
    agent: Agent,
    config: CrawlerConfig,
    last_request_time: Option<Instant>,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    #[inline]
    pub fn new(config: CrawlerConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .user_agent(&config.user_agent)
            .build()
            .into();

        Self {
            agent,
            config,
            last_request_time: None,
        }
    }

    /// Perform an HTTP GET request with rate limiting and retry logic
    #[inline]
    pub async fn get(&mut self, url: &str) -> Result<String> {
        self.apply_rate_limit().await;

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                debug!("Retrying request to {} (attempt {})", url, attempt + 1);
                sleep(Duration::from_secs(self.config.retry_delay_seconds)).await;
            }

            match self.try_get(url) {
                Ok(response) => {
                    debug!("Successfully fetched {} (attempt {})", url, attempt + 1);
                    return Ok(response);
                }
                Err(e) if is_retryable_error(&e) && attempt < self.config.max_retries => {
                    warn!("Retryable error for {}: {}", url, e);
                    last_error = Some(e);
                }
                Err(e) => {
                    debug!("Request to {} failed: {}", url, e);
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("All retry attempts failed")))
    }

    /// Apply rate limiting by sleeping if necessary
    async fn apply_rate_limit(&mut self) {
        if let Some(last_time) = self.last_request_time {
            let elapsed = last_time.elapsed();
            let rate_limit_duration = Duration::from_millis(self.config.rate_limit_ms);

            if elapsed < rate_limit_duration {
                let sleep_duration = rate_limit_duration - elapsed;
                debug!("Rate limiting: sleeping for {:?}", sleep_duration);
                sleep(sleep_duration).await;
            }
        }

        self.last_request_time = Some(Instant::now());
    }

    /// Attempt a single HTTP GET request without retry logic
    fn try_get(&self, url: &str) -> Result<String> {
        debug!("Making HTTP GET request to: {}", url);

        match self.agent.get(url).call() {
            Ok(mut response) => {
                let text = response
                    .body_mut()
                    .read_to_string()
                    .with_context(|| format!("Failed to read response body from {}", url))?;
                debug!("Read {} bytes from {}", text.len(), url);
                Ok(text)
            }
            Err(ureq::Error::StatusCode(status)) => {
                debug!("HTTP request failed with status {}: {}", status, url);
                Err(anyhow!("HTTP error {}", status))
            }
            Err(e) => Err(anyhow::Error::from(e))
                .with_context(|| format!("Failed to make HTTP request to {}", url)),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    #[inline]
    async fn fetch(&mut self, url: &PageUrl) -> Result<String> {
        self.get(url.as_str()).await
    }
}

/// Check if an error is retryable (network timeouts, 5xx errors)
fn is_retryable_error(error: &anyhow::Error) -> bool {
    let error_str = format!("{:#}", error).to_lowercase();

    if error_str.contains("timeout")
        || error_str.contains("timed out")
        || error_str.contains("connection")
        || error_str.contains("network")
    {
        return true;
    }

    // HTTP 5xx server errors and 429 rate limiting
    error_str.contains("http error 5") || error_str.contains("http error 429")
}

/// Extract every in-scope link on a page, normalized and deduplicated in document order
#[inline]
pub fn extract_links(html: &str, page_url: &PageUrl, domain: &CrawlDomain) -> Result<Vec<PageUrl>> {
    let document = Html::parse_document(html);
    let link_selector = Selector::parse("a[href]")
        .map_err(|e| anyhow!("Failed to create CSS selector: {:?}", e))?;

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&link_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }

        match page_url.join(href) {
            Ok(link) => {
                if domain.is_valid_url(&link) && seen.insert(link.clone()) {
                    links.push(link);
                }
            }
            Err(e) => {
                debug!("Skipping link '{}' on {}: {}", href, page_url, e);
            }
        }
    }

    debug!("Extracted {} in-scope links from {}", links.len(), page_url);
    Ok(links)
}

/// Bounds on a single crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlLimits {
    /// Deepest link level followed; 0 means seeds only
    pub max_depth: usize,
    /// Discovery stops once this many pages have been visited
    pub max_pages: usize,
}

impl Default for CrawlLimits {
    #[inline]
    fn default() -> Self {
        CrawlerConfig::default().limits()
    }
}

/// State for one crawl of one domain.
///
/// The visited set lives here rather than on the crawler, so separate crawls
/// never share state.
#[derive(Debug)]
pub struct CrawlSession {
    limits: CrawlLimits,
    visited: HashSet<PageUrl>,
    failed: HashSet<PageUrl>,
    discovered: Vec<PageUrl>,
}

impl CrawlSession {
    #[inline]
    pub fn new(limits: CrawlLimits) -> Self {
        Self {
            limits,
            visited: HashSet::new(),
            failed: HashSet::new(),
            discovered: Vec::new(),
        }
    }

    /// Whether the page budget is spent
    #[inline]
    pub fn is_full(&self) -> bool {
        self.visited.len() >= self.limits.max_pages
    }

    /// Whether `url` was already fetched or already failed in this session
    #[inline]
    pub fn has_seen(&self, url: &PageUrl) -> bool {
        self.visited.contains(url) || self.failed.contains(url)
    }

    fn mark_visited(&mut self, url: PageUrl) {
        if self.visited.insert(url.clone()) {
            self.discovered.push(url);
        }
    }

    fn mark_failed(&mut self, url: PageUrl) {
        self.failed.insert(url);
    }

    #[inline]
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    #[inline]
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Visited pages in the order they were first reached
    #[inline]
    pub fn discovered(&self) -> &[PageUrl] {
        &self.discovered
    }

    #[inline]
    pub fn into_discovered(self) -> Vec<PageUrl> {
        self.discovered
    }
}

/// Breadth-first discovery of in-scope pages, one depth level at a time.
///
/// Each fetched page is marked visited before its links are queued, so cycles
/// and repeated links are never fetched twice. Pages that fail to fetch
/// contribute no links and are not retried.
#[inline]
pub async fn crawl<F>(
    fetcher: &mut F,
    seeds: &[PageUrl],
    domain: &CrawlDomain,
    session: &mut CrawlSession,
) where
    F: PageFetcher + ?Sized,
{
    let bar = progress_spinner("{spinner} [{pos}] Discovering {msg}");

    let mut frontier: Vec<PageUrl> = Vec::new();
    for seed in seeds {
        if !frontier.contains(seed) {
            frontier.push(seed.clone());
        }
    }

    let mut depth = 0;
    while !frontier.is_empty() && depth <= session.limits.max_depth && !session.is_full() {
        info!(
            "[{}] Depth {}: {} URLs in frontier",
            domain.name,
            depth,
            frontier.len()
        );

        let follow_links = depth < session.limits.max_depth;
        let mut next_frontier: Vec<PageUrl> = Vec::new();
        let mut next_seen: HashSet<PageUrl> = HashSet::new();

        for url in frontier {
            if session.has_seen(&url) {
                continue;
            }
            if session.is_full() {
                debug!("Page budget of {} reached", session.limits.max_pages);
                break;
            }

            bar.set_message(url.to_string());
            let html = match fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("Error discovering links from {}: {:#}", url, e);
                    session.mark_failed(url);
                    continue;
                }
            };

            session.mark_visited(url.clone());
            bar.set_position(session.visited_count() as u64);

            if !follow_links {
                continue;
            }

            let links = extract_links(&html, &url, domain).unwrap_or_else(|e| {
                warn!("Failed to extract links from {}: {}", url, e);
                Vec::new()
            });

            for link in links {
                if !session.has_seen(&link) && next_seen.insert(link.clone()) {
                    next_frontier.push(link);
                }
            }
        }

        frontier = next_frontier;
        depth += 1;
    }

    bar.finish_and_clear();
    info!(
        "[{}] Discovered {} pages ({} failed)",
        domain.name,
        session.visited_count(),
        session.failed_count()
    );
}

/// Result of scraping one domain
#[derive(Debug, Clone, Default)]
pub struct DomainScrape {
    /// Pages discovered by the crawl, in discovery order
    pub urls: Vec<PageUrl>,
    /// Sections extracted from those pages
    pub sections: Vec<Section>,
    /// Pages whose content fetch failed
    pub failed_pages: usize,
}

/// Fetch each page and extract its sections, skipping pages that fail
#[inline]
pub async fn scrape_pages<F>(
    fetcher: &mut F,
    urls: &[PageUrl],
    config: &ExtractionConfig,
) -> (Vec<Section>, usize)
where
    F: PageFetcher + ?Sized,
{
    let bar = progress_bar(urls.len() as u64, "{bar:30} [{pos}/{len}] Scraping {msg}");

    let mut sections = Vec::new();
    let mut failed = 0;

    for url in urls {
        bar.set_message(url.to_string());
        match fetcher.fetch(url).await {
            Ok(html) => {
                let page_sections = extract_sections(&html, url, config);
                debug!("Extracted {} sections from {}", page_sections.len(), url);
                sections.extend(page_sections);
            }
            Err(e) => {
                error!("Error scraping {}: {:#}", url, e);
                failed += 1;
            }
        }
        bar.inc(1);
    }

    bar.finish_and_clear();
    (sections, failed)
}

/// Discover a domain's pages from its seed, then extract their sections
#[inline]
pub async fn scrape_domain<F>(
    fetcher: &mut F,
    domain: &CrawlDomain,
    limits: CrawlLimits,
    extraction: &ExtractionConfig,
) -> Result<DomainScrape>
where
    F: PageFetcher + ?Sized,
{
    let seed = domain
        .seed()
        .with_context(|| format!("Invalid base URL for domain {}", domain.name))?;

    info!(
        "Discovering {} pages (max depth: {}, max pages: {})",
        domain.name, limits.max_depth, limits.max_pages
    );

    let mut session = CrawlSession::new(limits);
    crawl(fetcher, &[seed], domain, &mut session).await;
    let urls = session.into_discovered();

    let (sections, failed_pages) = scrape_pages(fetcher, &urls, extraction).await;
    info!(
        "[{}] Extracted {} sections from {} pages",
        domain.name,
        sections.len(),
        urls.len()
    );

    Ok(DomainScrape {
        urls,
        sections,
        failed_pages,
    })
}
