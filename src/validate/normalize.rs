// src/validate/normalize.rs
// =============================================================================
// URL parsing and normalization.
//
// Two strings that point at the same resource should compare equal after
// normalization, so the crawler never fetches or returns the same page twice.
//
// What normalization does:
// - Lower-cases the hostname
// - Removes tracking query parameters (utm_*, fbclid, gclid)
// - Removes default ports (80 for http, 443 for https)
// - Drops the trailing "/" of a bare root path ("https://a.com/" -> "https://a.com")
// - Removes the #fragment
//
// normalize_url is idempotent: normalize(normalize(x)) == normalize(x).
// =============================================================================

use crate::error::{CrawlError, Result};
use url::Url;

// Query parameters that only exist to track where a click came from
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
];

// Parses a string as an absolute http(s) URL with a host.
//
// Returns: the parsed Url, or CrawlError::Format explaining why it's unusable
pub fn parse_http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| CrawlError::format(raw, e))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(CrawlError::format(
            raw,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(CrawlError::format(raw, "missing host")),
    }
}

// Basic format check used on every discovered link
pub fn is_valid_url_format(raw: &str) -> bool {
    parse_http_url(raw).is_ok()
}

// Canonicalizes a URL string.
//
// Example:
//   "https://Example.com:443/?utm_source=x#top" -> "https://example.com"
pub fn normalize_url(raw: &str) -> Result<String> {
    let mut url = parse_http_url(raw)?;

    // url::Url already lower-cases hosts of special schemes and forgets their
    // default ports while parsing, so those two rules come for free here.

    strip_tracking_params(&mut url);
    url.set_fragment(None);

    let root_only = url.path() == "/" && url.query().is_none();
    let mut normalized = String::from(url);
    if root_only && normalized.ends_with('/') {
        normalized.pop();
    }

    Ok(normalized)
}

// Parses without normalizing; used when `normalizeUrls` is switched off
pub fn canonical_form(raw: &str) -> Result<String> {
    parse_http_url(raw).map(String::from)
}

// Returns the lower-case hostname of a URL string, if it has one
pub fn domain_of(raw: &str) -> Option<String> {
    Url::parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_ascii_lowercase()))
}

fn is_tracking_param(name: &str) -> bool {
    TRACKING_PARAMS.contains(&name)
}

fn strip_tracking_params(url: &mut Url) {
    if url.query() == Some("") {
        url.set_query(None);
        return;
    }

    // Only rewrite the query when something actually has to go, so untouched
    // queries keep their original encoding.
    if !url.query_pairs().any(|(name, _)| is_tracking_param(&name)) {
        return;
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !is_tracking_param(name))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
}
