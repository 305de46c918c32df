// src/fetch/http.rs
// =============================================================================
// The real page fetcher, built on reqwest.
//
// Key functionality:
// - Sends browser-like default headers with every request
// - Follows redirects up to a configured limit
// - Gives every attempt its own deadline; a slow server is cut off
// - Retries failed attempts after a random 500-1500ms pause
// - Reports the LAST error once all attempts are used up
//
// Only transport failures (timeouts, DNS, TLS, connection resets...) are
// retried. A 404 or 500 is a perfectly good answer and is returned as-is;
// the crawler decides what to do with it.
//
// Rust concepts:
// - async_trait: lets HttpFetcher be used as Arc<dyn PageFetcher>
// - Client is cheap to clone (reference counted), so we build it once
// =============================================================================

use super::{FetchMethod, FetchedPage, PageFetcher};
use crate::config::Settings;
use crate::error::{CrawlError, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, REFERER};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// How often, and how patiently, to retry a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_retries: settings.max_retries,
            min_delay: Duration::from_millis(settings.retry_delay_min_ms),
            max_delay: Duration::from_millis(settings.retry_delay_max_ms),
        }
    }

    // Uniform random pause in [min_delay, max_delay]
    fn jittered_delay(&self) -> Duration {
        let max = self.max_delay.max(self.min_delay);
        rand::rng().random_range(self.min_delay..=max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(1500),
        }
    }
}

/// reqwest-backed implementation of [`PageFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpFetcher {
    // Builds the shared client from settings.
    // Invalid header names/values are configuration errors.
    pub fn new(settings: &Settings) -> Result<Self> {
        let headers = build_headers(settings)?;

        let client = Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
            .build()
            .map_err(|e| CrawlError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout: settings.fetch_timeout(),
            retry: RetryPolicy::from_settings(settings),
        })
    }

    // One attempt, with its own deadline.
    // reqwest's per-request timeout covers connecting, sending AND reading
    // the body, and drops the connection when it fires.
    async fn attempt(
        &self,
        url: &str,
        method: FetchMethod,
        referer: Option<&str>,
    ) -> Result<FetchedPage> {
        let mut request = match method {
            FetchMethod::Get => self.client.get(url),
            FetchMethod::Head => self.client.head(url),
        }
        .timeout(self.timeout);

        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await.map_err(|e| categorize_error(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let body = match method {
            FetchMethod::Get => response.text().await.map_err(|e| categorize_error(url, e))?,
            FetchMethod::Head => String::new(),
        };

        Ok(FetchedPage {
            url: final_url,
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        method: FetchMethod,
        referer: Option<&str>,
    ) -> Result<FetchedPage> {
        let attempts = self.retry.max_retries + 1;
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.retry.jittered_delay()).await;
            }

            match self.attempt(url, method, referer).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    debug!(
                        url,
                        attempt = attempt + 1,
                        attempts,
                        error = %e,
                        "fetch attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CrawlError::network(url, "no attempt made")))
    }
}

fn build_headers(settings: &Settings) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in &settings.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| CrawlError::Config(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| CrawlError::Config(format!("invalid header value for {}: {}", name, e)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

// Turns a reqwest error into a short, human-readable reason.
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - DNS resolution failure
// - SSL certificate issues
// - Too many redirects
fn categorize_error(url: &str, error: reqwest::Error) -> CrawlError {
    let error_string = error.to_string();

    let message = if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_redirect() {
        "too many redirects".to_string()
    } else if error.is_connect() {
        if error_string.contains("dns") {
            "could not resolve hostname".to_string()
        } else {
            "connection failed".to_string()
        }
    } else if error_string.contains("certificate") || error_string.contains("ssl") {
        "SSL certificate error".to_string()
    } else {
        error_string
    };

    CrawlError::network(url, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_settings(timeout_ms: u64) -> Settings {
        Settings {
            timeout: timeout_ms,
            retry_delay_min_ms: 10,
            retry_delay_max_ms: 20,
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_get_returns_body_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><body>hi</body></html>", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&fast_settings(2_000)).unwrap();
        let url = format!("{}/page", server.uri());
        let page = fetcher.fetch(&url, FetchMethod::Get, None).await.unwrap();

        assert_eq!(page.status, 200);
        assert!(page.is_success());
        assert_eq!(page.content_type.as_deref(), Some("text/html; charset=utf-8"));
        assert!(page.body.contains("hi"));
    }

    #[tokio::test]
    async fn test_head_has_empty_body_and_sends_referer() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/"))
            .and(header("referer", "https://seed.example.com"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&fast_settings(2_000)).unwrap();
        let page = fetcher
            .fetch(&server.uri(), FetchMethod::Head, Some("https://seed.example.com"))
            .await
            .unwrap();

        assert_eq!(page.status, 200);
        assert!(page.body.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&fast_settings(2_000)).unwrap();
        let page = fetcher
            .fetch(&server.uri(), FetchMethod::Get, None)
            .await
            .unwrap();
        assert_eq!(page.status, 404);
    }

    #[tokio::test]
    async fn test_retries_after_timeout_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(800)))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("ok", "text/html"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&fast_settings(200)).unwrap();
        let page = fetcher
            .fetch(&server.uri(), FetchMethod::Get, None)
            .await
            .unwrap();
        assert_eq!(page.body, "ok");
        assert_eq!(page.content_type.as_deref(), Some("text/html"));
    }

    #[tokio::test]
    async fn test_gives_up_after_all_attempts_time_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(800)))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&fast_settings(100)).unwrap();
        let result = fetcher.fetch(&server.uri(), FetchMethod::Get, None).await;

        match result {
            Err(CrawlError::Network { message, .. }) => assert_eq!(message, "request timed out"),
            other => panic!("expected network error, got {:?}", other),
        }
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let mut settings = Settings::default();
        settings
            .headers
            .insert("Bad Header".to_string(), "x".to_string());
        assert!(matches!(HttpFetcher::new(&settings), Err(CrawlError::Config(_))));
    }

    #[test]
    fn test_jittered_delay_stays_in_window() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let delay = policy.jittered_delay();
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1500));
        }
    }

    #[test]
    fn test_jittered_delay_with_inverted_window_uses_min() {
        let policy = RetryPolicy {
            max_retries: 0,
            min_delay: Duration::from_millis(800),
            max_delay: Duration::from_millis(200),
        };
        assert_eq!(policy.jittered_delay(), Duration::from_millis(800));
    }
}
