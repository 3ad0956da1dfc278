#[cfg(test)]
mod tests;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// URL substrings that never point at handbook content
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "/search",
    "/login",
    "/logout",
    "/sign",
    "/api/",
    ".pdf",
    ".zip",
    ".jpg",
    ".png",
    ".gif",
    ".svg",
    "#",
    "mailto:",
    "tel:",
    "javascript:",
];

/// A normalized absolute page URL: fragment removed and no trailing slash.
///
/// Two links that differ only by fragment or trailing slash map to the same
/// `PageUrl`, so it doubles as the crawl visited-set key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageUrl(String);

impl PageUrl {
    /// Parse and normalize an absolute http(s) URL
    #[inline]
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim()).with_context(|| format!("Invalid URL format: {}", raw))?;
        Self::from_url(url)
    }

    /// Resolve `href` against this page and normalize the result
    #[inline]
    pub fn join(&self, href: &str) -> Result<Self> {
        let base = Url::parse(&self.0).with_context(|| format!("Invalid base URL: {}", self.0))?;
        let joined = base
            .join(href.trim())
            .with_context(|| format!("Failed to resolve '{}' relative to '{}'", href, self.0))?;
        Self::from_url(joined)
    }

    fn from_url(mut url: Url) -> Result<Self> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(anyhow!("URL must use HTTP or HTTPS scheme: {}", url));
        }
        if url.host_str().is_none() {
            return Err(anyhow!("URL must have a valid host: {}", url));
        }

        url.set_fragment(None);
        let normalized = url.as_str().trim_end_matches('/').to_string();
        Ok(Self(normalized))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Host portion of the URL, lowercased by the URL parser
    #[inline]
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.0)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
    }

    #[inline]
    pub fn path(&self) -> String {
        Url::parse(&self.0)
            .map(|url| url.path().to_string())
            .unwrap_or_default()
    }
}

impl fmt::Display for PageUrl {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PageUrl {
    type Error = anyhow::Error;

    #[inline]
    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PageUrl> for String {
    #[inline]
    fn from(value: PageUrl) -> Self {
        value.0
    }
}

/// One crawl target: where to start and which discovered links stay in scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlDomain {
    /// Short name used on the command line (e.g. "handbook")
    pub name: String,
    /// Seed URL for the crawl
    pub base_url: String,
    /// Links must have a host containing this string
    pub host: String,
    /// Links must have a path containing this string, when set
    #[serde(default)]
    pub path_contains: Option<String>,
    /// Lowercased URL substrings that disqualify a link
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

fn default_exclude_patterns() -> Vec<String> {
    DEFAULT_EXCLUDE_PATTERNS
        .iter()
        .map(|p| (*p).to_string())
        .collect()
}

impl CrawlDomain {
    #[inline]
    pub fn new(name: &str, base_url: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.to_string(),
            host: host.to_string(),
            path_contains: None,
            exclude_patterns: default_exclude_patterns(),
        }
    }

    #[inline]
    pub fn with_path_contains(mut self, fragment: &str) -> Self {
        self.path_contains = Some(fragment.to_string());
        self
    }

    /// The GitLab Handbook
    #[inline]
    pub fn handbook() -> Self {
        Self::new(
            "handbook",
            "https://handbook.gitlab.com",
            "handbook.gitlab.com",
        )
    }

    /// The GitLab Direction pages, which live under about.gitlab.com
    #[inline]
    pub fn direction() -> Self {
        Self::new(
            "direction",
            "https://about.gitlab.com/direction",
            "about.gitlab.com",
        )
        .with_path_contains("/direction")
    }

    #[inline]
    pub fn seed(&self) -> Result<PageUrl> {
        PageUrl::parse(&self.base_url)
    }

    /// Whether a normalized URL is in scope for this domain
    #[inline]
    pub fn is_valid_url(&self, url: &PageUrl) -> bool {
        let Some(host) = url.host() else {
            return false;
        };
        if !host.contains(&self.host.to_lowercase()) {
            return false;
        }

        if let Some(fragment) = &self.path_contains {
            if !url.path().contains(fragment.as_str()) {
                return false;
            }
        }

        let lowered = url.as_str().to_lowercase();
        !self
            .exclude_patterns
            .iter()
            .any(|pattern| lowered.contains(pattern.as_str()))
    }
}

/// The crawl targets used when the configuration names none
#[inline]
pub fn default_domains() -> Vec<CrawlDomain> {
    vec![CrawlDomain::handbook(), CrawlDomain::direction()]
}
