// src/config.rs
// =============================================================================
// Crawler settings.
//
// Settings come from three layers, last one wins:
// 1. Built-in defaults (Settings::default)
// 2. An optional JSON file (camelCase keys, any subset of options)
// 3. Command-line overrides applied by main.rs
//
// After loading, `validate()` must be called. It is the only place a run can
// fail before it starts: a bad regex or an empty seed list is a fatal error,
// everything after that is recovered per URL.
//
// Rust concepts:
// - #[serde(default)]: missing JSON keys fall back to Default::default()
// - rename_all = "camelCase": Rust fields are snake_case, JSON is camelCase
// =============================================================================

use crate::error::{CrawlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// All recognized crawler options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Default target count when the caller doesn't pass one
    pub number_of_urls: usize,
    /// Per-attempt fetch deadline, in milliseconds
    pub timeout: u64,
    /// Minimum delay between two requests to the same domain, in milliseconds
    pub crawl_delay: u64,
    /// Hard cap on accepted URLs per domain
    pub max_urls_per_domain: usize,
    /// Maximum link-following depth from a seed
    pub max_depth: usize,
    /// Worker pool size
    pub concurrent_requests: usize,
    pub min_content_length: usize,
    pub min_text_content_ratio: f64,
    pub allowed_content_types: Vec<String>,
    pub excluded_domains: Vec<String>,
    pub excluded_extensions: Vec<String>,
    pub excluded_paths: Vec<String>,
    pub url_patterns: UrlPatterns,
    pub seed_urls: Vec<String>,
    pub enable_sitemap_discovery: bool,
    pub check_robots_txt: bool,
    pub normalize_urls: bool,
    /// Minimum number of labels in a hostname ("example.com" = 2)
    pub min_domain_level: usize,
    /// Discovered links with more path segments than this are not queued
    pub max_path_segments: usize,
    pub max_redirects: usize,
    pub max_retries: u32,
    pub retry_delay_min_ms: u64,
    pub retry_delay_max_ms: u64,
    /// Global wall-clock budget, as a multiple of `timeout`
    pub run_budget_factor: u32,
    /// Headers sent with every request
    pub headers: BTreeMap<String, String>,
    pub use_random_referer: bool,
    pub randomize_request_order: bool,
    /// Overrides the default registry location under the home directory
    pub registry_path: Option<PathBuf>,
}

/// Regex allow/deny lists. Patterns are compiled by the validator.
///
/// A settings file that only mentions `include` keeps the default `exclude`
/// list, and the other way round.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlPatterns {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for UrlPatterns {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: strings(&[
                r"\.(min|bundle|vendor)\.",
                r"\?(?:v|ver|version)=[^&]+",
                r"/feed/?$",
                r"(?i)signin|login|logout",
                r"/wp-admin/",
            ]),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Settings {
    fn default() -> Self {
        let headers = [
            (
                "User-Agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
            ),
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,\
                 image/webp,image/apng,*/*;q=0.8",
            ),
            ("Accept-Language", "en-US,en;q=0.9"),
            ("Upgrade-Insecure-Requests", "1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            number_of_urls: 1000,
            timeout: 10_000,
            crawl_delay: 200,
            max_urls_per_domain: 3,
            max_depth: 5,
            concurrent_requests: 20,
            min_content_length: 500,
            min_text_content_ratio: 0.1,
            allowed_content_types: strings(&[
                "text/html",
                "application/xhtml+xml",
                "application/xml",
                "text/plain",
            ]),
            excluded_domains: strings(&[
                "facebook.com",
                "instagram.com",
                "twitter.com",
                "linkedin.com",
                "captcha.com",
                "recaptcha.net",
                "solvemedia.com",
            ]),
            excluded_extensions: strings(&[
                ".css", ".js", ".jpg", ".jpeg", ".png", ".gif", ".ico", ".zip", ".rar", ".gz",
                ".mp3", ".mp4", ".woff", ".woff2", ".ttf", ".eot", ".svg",
            ]),
            excluded_paths: strings(&["/wp-admin/", "/cdn-cgi/", "/api/", "/wp-json/"]),
            url_patterns: UrlPatterns::default(),
            seed_urls: default_seeds(),
            enable_sitemap_discovery: true,
            check_robots_txt: true,
            normalize_urls: true,
            min_domain_level: 2,
            max_path_segments: 5,
            max_redirects: 3,
            max_retries: 2,
            retry_delay_min_ms: 500,
            retry_delay_max_ms: 1500,
            run_budget_factor: 2,
            headers,
            use_random_referer: true,
            randomize_request_order: true,
            registry_path: None,
        }
    }
}

// A broad, hand-picked starting set: directories, reference sites, news,
// academia, alternative search engines, open source hubs and portals.
fn default_seeds() -> Vec<String> {
    strings(&[
        "https://curlie.org",
        "https://en.wikipedia.org/wiki/List_of_websites",
        "https://en.wikipedia.org/wiki/List_of_most_popular_websites",
        "https://en.wikipedia.org/wiki/Portal:Contents",
        "https://archive.is",
        "https://stackoverflow.com",
        "https://reuters.com",
        "https://apnews.com",
        "https://bbc.com",
        "https://aljazeera.com",
        "https://france24.com",
        "https://dw.com",
        "https://arxiv.org",
        "https://mit.edu",
        "https://stanford.edu",
        "https://ox.ac.uk",
        "https://duckduckgo.com",
        "https://ecosia.org",
        "https://github.com/topics",
        "https://gitlab.com/explore/projects",
        "https://sourceforge.net/directory",
        "https://dev.to",
        "https://slashdot.org",
        "https://globo.com",
        "https://forums.gentoo.org",
        "https://discourse.org",
        "https://un.org",
        "https://europa.eu",
        "https://who.int",
        "https://worldbank.org",
        "https://medium.com/topics",
        "https://wordpress.com/discover",
        "https://coinmarketcap.com",
        "https://allrecipes.com",
        "https://imdb.com",
        "https://goodreads.com",
    ])
}

impl Settings {
    // Loads settings from a JSON file, falling back to defaults for
    // any key the file doesn't mention.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CrawlError::Config(format!("cannot read settings file {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            CrawlError::Config(format!("cannot parse settings file {}: {}", path.display(), e))
        })
    }

    // Rejects settings that would make a run meaningless.
    // Regex syntax is checked here too so a typo fails fast.
    pub fn validate(&self) -> Result<()> {
        if self.seed_urls.is_empty() {
            return Err(CrawlError::Config("seedUrls must not be empty".into()));
        }
        if self.concurrent_requests == 0 {
            return Err(CrawlError::Config("concurrentRequests must be at least 1".into()));
        }
        if self.max_urls_per_domain == 0 {
            return Err(CrawlError::Config("maxUrlsPerDomain must be at least 1".into()));
        }
        if self.number_of_urls == 0 {
            return Err(CrawlError::Config("numberOfUrls must be at least 1".into()));
        }
        if self.min_domain_level > 5 {
            return Err(CrawlError::Config("minDomainLevel must be 5 or less".into()));
        }
        if self.retry_delay_min_ms > self.retry_delay_max_ms {
            return Err(CrawlError::Config(
                "retryDelayMinMs must not exceed retryDelayMaxMs".into(),
            ));
        }
        for pattern in self.url_patterns.include.iter().chain(&self.url_patterns.exclude) {
            regex::Regex::new(pattern).map_err(|e| {
                CrawlError::Config(format!("invalid URL pattern '{}': {}", pattern, e))
            })?;
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    pub fn crawl_delay(&self) -> Duration {
        Duration::from_millis(self.crawl_delay)
    }

    // Wall-clock budget for a whole run
    pub fn run_budget(&self) -> Duration {
        self.fetch_timeout() * self.run_budget_factor.max(1)
    }
}
