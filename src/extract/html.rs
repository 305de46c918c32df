// src/extract/html.rs
// =============================================================================
// This module inspects an HTML page and pulls candidate links out of it.
//
// Two jobs:
// 1. Screening - is this page worth mining at all? We skip login walls,
//    CAPTCHA/bot checks and JS shells with almost no visible text.
// 2. Collecting - every URL-looking thing on the page:
//    a) <a href="..."> (resolved against the page URL)
//    b) <link rel="canonical"> and <link rel="alternate">
//    c) bare "https://..." text inside <p>, <span> and <div>
//
// We use the `scraper` crate which parses HTML into a DOM and supports CSS
// selectors, and the `url` crate to resolve relative links.
//
// Note: scraper::Html is not Send, so everything here is synchronous and the
// document is dropped before the caller awaits anything.
// =============================================================================

use crate::error::RejectReason;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static CSS selector")
}

static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static LINK_TAGS: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"link[rel="canonical"], link[rel="alternate"]"#));
static TEXT_BLOCKS: LazyLock<Selector> = LazyLock::new(|| selector("p, span, div"));
static PASSWORD_INPUT: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"input[type="password"]"#));

// Permissive on purpose: anything from the scheme up to whitespace or a quote
static TEXT_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'>]+"#).expect("static URL regex"));

// Screens an HTML page and, if it passes, returns every link found on it.
//
// Parameters:
//   html: the raw page body
//   page_url: where the page was fetched from (base for relative links)
//   min_text_ratio: minimum visible-text length / HTML length
//
// Returns: the links (absolute, deduplicated, in discovery order) or the
//          reason the page was rejected
pub fn extract_html_links(
    html: &str,
    page_url: &Url,
    min_text_ratio: f64,
) -> Result<Vec<String>, RejectReason> {
    let document = Html::parse_document(html);

    screen_document(&document, html.len(), min_text_ratio)?;

    let mut links = LinkSet::default();

    // 1. Standard anchors, skipping same-page "#section" links
    for element in document.select(&ANCHORS) {
        if let Some(href) = element.value().attr("href") {
            if let Some(absolute_url) = resolve_url(page_url, href) {
                links.insert(absolute_url);
            }
        }
    }

    // 2. Canonical and alternate <link> tags
    for element in document.select(&LINK_TAGS) {
        if let Some(href) = element.value().attr("href") {
            if let Some(absolute_url) = resolve_url(page_url, href) {
                links.insert(absolute_url);
            }
        }
    }

    // 3. URLs written out as plain text (common on JS-heavy pages)
    for element in document.select(&TEXT_BLOCKS) {
        let text: String = element.text().collect();
        for found in find_text_urls(&text) {
            links.insert(found);
        }
    }

    Ok(links.into_vec())
}

// Rejects login walls, bot checks and pages that are mostly markup.
fn screen_document(
    document: &Html,
    html_len: usize,
    min_text_ratio: f64,
) -> Result<(), RejectReason> {
    let text: String = document
        .select(&BODY)
        .next()
        .map(|body| body.text().collect())
        .unwrap_or_default();
    let lower = text.to_lowercase();

    if lower.contains("captcha") || (lower.contains("robot") && lower.contains("check")) {
        return Err(RejectReason::Captcha);
    }

    if document.select(&PASSWORD_INPUT).next().is_some() {
        return Err(RejectReason::LoginWall);
    }

    let ratio = if html_len == 0 {
        0.0
    } else {
        text.len() as f64 / html_len as f64
    };
    if ratio < min_text_ratio {
        return Err(RejectReason::LowTextRatio(ratio));
    }

    Ok(())
}

// Finds "https://..." substrings in free text.
// Trailing sentence punctuation is not part of the URL.
pub fn find_text_urls(text: &str) -> Vec<String> {
    TEXT_URL
        .find_iter(text)
        .map(|m| {
            m.as_str()
                .trim_end_matches(['.', ',', ';', ':', ')', ']', '!', '?'])
                .to_string()
        })
        .collect()
}

// Resolves a possibly-relative href to an absolute http(s) URL
//
// Examples:
//   base = "https://example.com/page"
//   href = "/docs" -> Some("https://example.com/docs")
//   href = "https://other.com" -> Some("https://other.com/")
//   href = "#top" -> None (same-page anchor)
//   href = "javascript:void(0)" -> None (not HTTP)
fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let url = base.join(href).ok()?;
    if is_checkable_link(&url) {
        Some(url.to_string())
    } else {
        None
    }
}

// Only http(s) links lead anywhere we can crawl
fn is_checkable_link(url: &Url) -> bool {
    url.scheme() == "http" || url.scheme() == "https"
}

// Vec + HashSet: dedup while keeping discovery order stable
#[derive(Default)]
pub(crate) struct LinkSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl LinkSet {
    pub(crate) fn insert(&mut self, link: String) {
        if self.seen.insert(link.clone()) {
            self.order.push(link);
        }
    }

    pub(crate) fn into_vec(self) -> Vec<String> {
        self.order
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why LazyLock for selectors?
//    - Selector::parse is not free, and these selectors never change
//    - LazyLock builds each one on first use and shares it afterwards
//    - The expect() can only fire if the constant itself is wrong
//
// 2. Why is the text ratio computed on <body> only?
//    - Scripts and styles in <head> are exactly the "markup" we want to
//      measure against; counting their text would hide a JS-only shell
//
// 3. Why not filter domains here?
//    - This module only finds candidate strings; exclusion lists, caps and
//      normalization all live in the validator and the crawler
// -----------------------------------------------------------------------------
