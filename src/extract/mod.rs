// src/extract/mod.rs
// =============================================================================
// Link discovery.
//
// Given a fetched page, find candidate URLs. This module only finds
// candidate strings: it checks they are well-formed http(s) URLs and nothing
// more. Exclusion lists, caps and dedup against earlier pages are handled
// downstream by the validator and the crawler.
//
// Submodules:
// - html: page screening + anchors, <link> tags and plain-text URLs
// - sitemap: sitemap.xml <loc> entries and robots.txt Sitemap: lines
//
// The sitemap and robots.txt requests go to the same host as the page, so
// each one waits for the domain's turn in the run's DomainScheduler first.
// =============================================================================

mod html;
mod sitemap;

pub use html::{extract_html_links, find_text_urls};
pub use sitemap::{parse_robots_sitemaps, parse_sitemap_locs};

use crate::config::Settings;
use crate::crawl::DomainScheduler;
use crate::error::{CrawlError, RejectReason, Result};
use crate::fetch::{content_type_allowed, FetchedPage, PageFetcher};
use crate::validate::is_valid_url_format;
use html::LinkSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Screens pages and mines them for candidate links.
pub struct LinkExtractor {
    fetcher: Arc<dyn PageFetcher>,
    scheduler: Arc<DomainScheduler>,
    /// robots.txt gets half the normal fetch timeout
    robots_timeout: Duration,
    allowed_content_types: Vec<String>,
    min_content_length: usize,
    min_text_ratio: f64,
    sitemap_discovery: bool,
    check_robots_txt: bool,
}

impl LinkExtractor {
    // Parameters:
    //   settings: filters and discovery toggles
    //   fetcher: used for the sitemap.xml and robots.txt lookups
    //   scheduler: the run's politeness scheduler, shared with the workers
    pub fn new(
        settings: &Settings,
        fetcher: Arc<dyn PageFetcher>,
        scheduler: Arc<DomainScheduler>,
    ) -> Self {
        Self {
            fetcher,
            scheduler,
            robots_timeout: settings.fetch_timeout() / 2,
            allowed_content_types: settings.allowed_content_types.clone(),
            min_content_length: settings.min_content_length,
            min_text_ratio: settings.min_text_content_ratio,
            sitemap_discovery: settings.enable_sitemap_discovery,
            check_robots_txt: settings.check_robots_txt,
        }
    }

    // Returns every candidate link on the page, or ContentRejected when the
    // page fails a quality/security check.
    pub async fn extract(&self, page: &FetchedPage) -> Result<Vec<String>> {
        self.screen_response(page)
            .map_err(|reason| CrawlError::rejected(&page.url, reason))?;

        let base = Url::parse(&page.url).map_err(|e| CrawlError::format(&page.url, e))?;

        let mut links = LinkSet::default();
        for link in extract_html_links(&page.body, &base, self.min_text_ratio)
            .map_err(|reason| CrawlError::rejected(&page.url, reason))?
        {
            links.insert(link);
        }

        if sitemap::is_site_root(&base) {
            let origin = sitemap::origin_of(&base);
            let domain = base.host_str().unwrap_or_default().to_ascii_lowercase();
            let fetcher = self.fetcher.as_ref();
            let from_sitemap = async {
                if !self.sitemap_discovery {
                    return Vec::new();
                }
                self.scheduler.await_turn(&domain).await;
                sitemap::sitemap_urls(fetcher, &origin).await
            };
            let from_robots = async {
                if !self.check_robots_txt {
                    return Vec::new();
                }
                self.scheduler.await_turn(&domain).await;
                let lookup = sitemap::robots_sitemaps(fetcher, &origin);
                match tokio::time::timeout(self.robots_timeout, lookup).await {
                    Ok(urls) => urls,
                    Err(_) => {
                        debug!(origin = %origin, "robots.txt lookup timed out");
                        Vec::new()
                    }
                }
            };
            let (sitemap_links, robots_links) = futures::join!(from_sitemap, from_robots);
            for link in sitemap_links.into_iter().chain(robots_links) {
                links.insert(link);
            }
        }

        Ok(links
            .into_vec()
            .into_iter()
            .filter(|link| is_valid_url_format(link))
            .collect())
    }

    // Response-level checks that don't need a parsed document
    fn screen_response(&self, page: &FetchedPage) -> std::result::Result<(), RejectReason> {
        if !page.is_success() {
            return Err(RejectReason::Status(page.status));
        }

        match page.content_type.as_deref() {
            Some(ct) if content_type_allowed(ct, &self.allowed_content_types) => {}
            other => return Err(RejectReason::ContentType(other.map(str::to_string))),
        }

        if page.body.len() < self.min_content_length {
            return Err(RejectReason::TooShort(page.body.len()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchMethod;
    use async_trait::async_trait;
    use std::collections::HashMap;

    // Serves fixed bodies for GETs; everything else is a 404.
    // Records when each request arrived and can hold some of them back.
    #[derive(Default)]
    struct StaticFetcher {
        pages: HashMap<String, (&'static str, String)>,
        delays: HashMap<String, Duration>,
        log: std::sync::Mutex<Vec<(String, tokio::time::Instant)>>,
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(
            &self,
            url: &str,
            _method: FetchMethod,
            _referer: Option<&str>,
        ) -> Result<FetchedPage> {
            self.log
                .lock()
                .unwrap()
                .push((url.to_string(), tokio::time::Instant::now()));
            if let Some(delay) = self.delays.get(url) {
                tokio::time::sleep(*delay).await;
            }
            let (status, content_type, body) = match self.pages.get(url) {
                Some((ct, body)) => (200, Some(ct.to_string()), body.clone()),
                None => (404, None, String::new()),
            };
            Ok(FetchedPage {
                url: url.to_string(),
                status,
                content_type,
                body,
            })
        }
    }

    fn no_delay() -> Arc<DomainScheduler> {
        Arc::new(DomainScheduler::new(Duration::ZERO, Duration::ZERO, 3))
    }

    fn extractor(
        pages: HashMap<String, (&'static str, String)>,
        settings: Settings,
    ) -> LinkExtractor {
        let fetcher = StaticFetcher {
            pages,
            ..StaticFetcher::default()
        };
        LinkExtractor::new(&settings, Arc::new(fetcher), no_delay())
    }

    fn sitemap_pages() -> HashMap<String, (&'static str, String)> {
        let mut pages = HashMap::new();
        pages.insert(
            "https://example.com/sitemap.xml".to_string(),
            (
                "application/xml",
                "<urlset><url><loc>https://example.com/from-sitemap</loc></url></urlset>"
                    .to_string(),
            ),
        );
        pages.insert(
            "https://example.com/robots.txt".to_string(),
            ("text/plain", "Sitemap: https://example.com/news-sitemap.xml".to_string()),
        );
        pages
    }

    fn lenient() -> Settings {
        Settings {
            min_content_length: 0,
            min_text_content_ratio: 0.0,
            ..Settings::default()
        }
    }

    fn html_page(url: &str, body: &str) -> FetchedPage {
        FetchedPage {
            url: url.to_string(),
            status: 200,
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_site_root_adds_sitemap_and_robots_urls() {
        let pages = sitemap_pages();
        let extractor = extractor(pages, lenient());

        let page = html_page(
            "https://example.com/",
            r#"<html><body><a href="/about">About</a></body></html>"#,
        );
        let links = extractor.extract(&page).await.unwrap();

        assert_eq!(
            links,
            vec![
                "https://example.com/about",
                "https://example.com/from-sitemap",
                "https://example.com/news-sitemap.xml",
            ]
        );
    }

    #[tokio::test]
    async fn test_discovery_sources_can_be_disabled() {
        let pages = sitemap_pages();
        let settings = Settings {
            enable_sitemap_discovery: false,
            check_robots_txt: false,
            ..lenient()
        };
        let extractor = extractor(pages, settings);

        let page = html_page("https://example.com/", "<html><body><p>x</p></body></html>");
        assert!(extractor.extract(&page).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sitemap_and_robots_wait_for_the_domain() {
        let fetcher = Arc::new(StaticFetcher {
            pages: sitemap_pages(),
            ..StaticFetcher::default()
        });
        let scheduler = Arc::new(DomainScheduler::new(
            Duration::from_millis(1000),
            Duration::ZERO,
            3,
        ));
        let extractor = LinkExtractor::new(&lenient(), fetcher.clone(), scheduler.clone());

        // the worker's own request for the page takes the first slot
        let start = tokio::time::Instant::now();
        scheduler.await_turn("example.com").await;

        let page = html_page("https://example.com/", "<html><body><p>hi</p></body></html>");
        let links = extractor.extract(&page).await.unwrap();
        assert_eq!(links.len(), 2);

        let mut offsets: Vec<Duration> = fetcher
            .log
            .lock()
            .unwrap()
            .iter()
            .map(|(_, at)| *at - start)
            .collect();
        offsets.sort();
        assert_eq!(offsets.len(), 2);
        assert!(offsets[0] >= Duration::from_millis(1000));
        assert!(offsets[1] >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_robots_txt_is_abandoned() {
        let mut delays = HashMap::new();
        delays.insert("https://example.com/robots.txt".to_string(), Duration::from_millis(800));
        let fetcher = StaticFetcher {
            pages: sitemap_pages(),
            delays,
            ..StaticFetcher::default()
        };
        // 1s fetch timeout -> 500ms for robots.txt
        let settings = Settings {
            timeout: 1000,
            ..lenient()
        };
        let extractor = LinkExtractor::new(&settings, Arc::new(fetcher), no_delay());

        let page = html_page("https://example.com/", "<html><body><p>hi</p></body></html>");
        let links = extractor.extract(&page).await.unwrap();
        assert_eq!(links, vec!["https://example.com/from-sitemap"]);
    }

    #[tokio::test]
    async fn test_non_root_pages_skip_sitemaps() {
        let extractor = extractor(HashMap::new(), lenient());
        let page = html_page(
            "https://example.com/blog",
            r#"<html><body><a href="post-1">One</a></body></html>"#,
        );
        let links = extractor.extract(&page).await.unwrap();
        assert_eq!(links, vec!["https://example.com/post-1"]);
    }

    #[tokio::test]
    async fn test_response_screening() {
        let extractor = extractor(HashMap::new(), Settings::default());

        let mut page = html_page("https://example.com/a", "<html></html>");
        page.status = 500;
        assert!(matches!(
            extractor.extract(&page).await,
            Err(CrawlError::ContentRejected { reason: RejectReason::Status(500), .. })
        ));

        let mut page = html_page("https://example.com/a", "<html></html>");
        page.content_type = Some("image/png".to_string());
        assert!(matches!(
            extractor.extract(&page).await,
            Err(CrawlError::ContentRejected { reason: RejectReason::ContentType(_), .. })
        ));

        let page = html_page("https://example.com/a", "<html><body>short</body></html>");
        assert!(matches!(
            extractor.extract(&page).await,
            Err(CrawlError::ContentRejected { reason: RejectReason::TooShort(_), .. })
        ));
    }
}
