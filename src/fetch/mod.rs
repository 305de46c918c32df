// src/fetch/mod.rs
// =============================================================================
// Fetching pages over HTTP.
//
// The crawler never talks to reqwest directly. It goes through the
// PageFetcher trait, so tests can hand it canned pages instead of a network.
//
// Submodules:
// - http: the real implementation (timeouts, redirects, retries with jitter)
// =============================================================================

mod http;

pub use http::{HttpFetcher, RetryPolicy};

use crate::error::Result;
use async_trait::async_trait;

/// Which HTTP method to use for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    /// Full download; needed when we want the page's links
    Get,
    /// Status + headers only; enough to decide if a URL is alive
    Head,
}

/// What came back from the server. For HEAD requests `body` is empty.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// Case-insensitive substring match against the allow-list, so
// "text/html; charset=utf-8" matches "text/html".
pub fn content_type_allowed(content_type: &str, allowed: &[String]) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    allowed
        .iter()
        .any(|entry| content_type.contains(&entry.to_ascii_lowercase()))
}

/// Anything that can retrieve a URL.
///
/// Failures (after whatever retrying the implementation does) are reported
/// as `CrawlError::Network`; non-2xx responses are NOT errors and come back
/// as a `FetchedPage` with the status set.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        method: FetchMethod,
        referer: Option<&str>,
    ) -> Result<FetchedPage>;
}
