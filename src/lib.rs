// src/lib.rs
// =============================================================================
// url-scout: a polite discovery crawler.
//
// Start from a handful of seed pages, follow links outward, and come back
// with a set of live, well-formed URLs spread across many domains.
//
// Module map:
// - config: the Settings record (defaults + JSON overrides)
// - error: the error taxonomy
// - validate: normalization and static URL filters
// - fetch: the PageFetcher seam and its reqwest implementation
// - extract: finding candidate links in a page (HTML, sitemaps, robots.txt)
// - crawl: frontier, politeness, result set and the run loop
// - registry: domains harvested by earlier runs
//
// Most callers only need fetch_urls(). Tests and embedders build a Crawler
// directly so they can plug in their own fetcher and store.
// =============================================================================

pub mod config;
pub mod crawl;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod registry;
pub mod validate;

pub use config::Settings;
pub use crawl::Crawler;
pub use error::{CrawlError, RejectReason, Result};

use fetch::HttpFetcher;
use registry::JsonFileStore;
use std::sync::Arc;

// Runs one crawl over the real network, remembering harvested domains in
// the JSON registry (settings.registry_path, or ~/.url-scout/).
//
// Parameters:
//   settings: the full configuration
//   target: how many URLs to collect (None = settings.number_of_urls)
//
// Returns: the accepted URLs. Fewer than `target` is not an error; it means
// the frontier ran dry or the time budget ran out.
//
// Example:
//   let urls = url_scout::fetch_urls(Settings::default(), Some(50)).await?;
pub async fn fetch_urls(settings: Settings, target: Option<usize>) -> Result<Vec<String>> {
    let store = JsonFileStore::new(
        settings
            .registry_path
            .clone()
            .unwrap_or_else(JsonFileStore::default_path),
    );
    let fetcher = HttpFetcher::new(&settings)?;
    Crawler::new(settings, Arc::new(fetcher), Arc::new(store))?
        .run(target)
        .await
}
