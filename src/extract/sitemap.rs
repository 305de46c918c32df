// src/extract/sitemap.rs
// =============================================================================
// Extra discovery sources for site roots: sitemap.xml and robots.txt.
//
// - sitemap.xml lists pages as <loc>https://...</loc> entries
// - robots.txt may point at sitemaps with "Sitemap: https://..." lines
//
// Both are best-effort. Any failure (network, 404, garbage content) simply
// yields no URLs.
// =============================================================================

use crate::fetch::{FetchMethod, PageFetcher};
use crate::validate::is_valid_url_format;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static LOC: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("loc").expect("static CSS selector"));
static SITEMAP_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*sitemap:\s*(\S+)").expect("static sitemap regex"));

// A "site root" is a page with an empty or "/" path and no query string.
pub fn is_site_root(url: &Url) -> bool {
    (url.path().is_empty() || url.path() == "/") && url.query().is_none()
}

// Scheme + host (+ non-default port), e.g. "https://example.com"
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

// Pulls every <loc> value out of a sitemap (or sitemap index) document.
pub fn parse_sitemap_locs(xml: &str) -> Vec<String> {
    let document = Html::parse_document(xml);
    document
        .select(&LOC)
        .map(|loc| loc.text().collect::<String>().trim().to_string())
        .filter(|loc| is_valid_url_format(loc))
        .collect()
}

// Pulls "Sitemap:" directives (case-insensitive) out of robots.txt.
pub fn parse_robots_sitemaps(robots_txt: &str) -> Vec<String> {
    SITEMAP_DIRECTIVE
        .captures_iter(robots_txt)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|url| is_valid_url_format(url))
        .collect()
}

pub async fn sitemap_urls(fetcher: &dyn PageFetcher, origin: &str) -> Vec<String> {
    let sitemap_url = format!("{}/sitemap.xml", origin);
    match fetcher.fetch(&sitemap_url, FetchMethod::Get, None).await {
        Ok(page) if page.is_success() => parse_sitemap_locs(&page.body),
        Ok(page) => {
            debug!(url = %sitemap_url, status = page.status, "no sitemap");
            Vec::new()
        }
        Err(e) => {
            debug!(url = %sitemap_url, error = %e, "sitemap fetch failed");
            Vec::new()
        }
    }
}

pub async fn robots_sitemaps(fetcher: &dyn PageFetcher, origin: &str) -> Vec<String> {
    let robots_url = format!("{}/robots.txt", origin);
    match fetcher.fetch(&robots_url, FetchMethod::Get, None).await {
        Ok(page) if page.is_success() => parse_robots_sitemaps(&page.body),
        Ok(_) => Vec::new(),
        Err(e) => {
            debug!(url = %robots_url, error = %e, "robots.txt fetch failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sitemap_locs() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url><loc>https://example.com/a</loc><lastmod>2024-01-01</lastmod></url>
              <url><loc>
                  https://example.com/b
              </loc></url>
              <url><loc>not a url</loc></url>
            </urlset>"#;
        assert_eq!(
            parse_sitemap_locs(xml),
            vec!["https://example.com/a", "https://example.com/b"]
        );
    }

    #[test]
    fn test_parse_robots_sitemaps() {
        let robots = "User-agent: *\n\
                      Disallow: /private\n\
                      Sitemap: https://example.com/sitemap.xml\n\
                      sitemap:https://example.com/news.xml\n\
                      # Sitemap: in a comment is ignored";
        assert_eq!(
            parse_robots_sitemaps(robots),
            vec![
                "https://example.com/sitemap.xml",
                "https://example.com/news.xml"
            ]
        );
    }

    #[test]
    fn test_site_root_and_origin() {
        let root = Url::parse("https://example.com").unwrap();
        let page = Url::parse("https://example.com/docs").unwrap();
        let with_port = Url::parse("http://127.0.0.1:8080/").unwrap();

        assert!(is_site_root(&root));
        assert!(!is_site_root(&page));
        assert!(is_site_root(&with_port));
        assert_eq!(origin_of(&with_port), "http://127.0.0.1:8080");
        assert_eq!(origin_of(&root), "https://example.com");
    }
}
