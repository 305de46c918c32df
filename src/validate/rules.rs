// src/validate/rules.rs
// =============================================================================
// Static validity rules for candidate URLs.
//
// A URL is valid when ALL of these pass:
// 1. It parses as an http(s) URL with a host
// 2. Its host is not an excluded domain (or a subdomain of one)
// 3. It doesn't end in an excluded file extension
// 4. It doesn't contain an excluded path fragment
// 5. It matches no exclude pattern (and at least one include pattern, if any)
// 6. Its hostname has between min_domain_level and 5 labels
//
// These checks never touch the network. Whether the URL actually answers is
// decided later, by the crawler, from the fetch result.
// =============================================================================

use super::normalize::{canonical_form, normalize_url, parse_http_url};
use crate::config::Settings;
use crate::error::{CrawlError, Result};
use regex::Regex;
use url::Url;

// Hosts with more labels than this look like spam or tracking subdomains
const MAX_DOMAIN_LEVEL: usize = 5;

/// Compiled form of the filtering settings.
#[derive(Debug, Clone)]
pub struct UrlValidator {
    excluded_domains: Vec<String>,
    excluded_extensions: Vec<String>,
    excluded_paths: Vec<String>,
    include: Vec<Regex>,
    exclude: Vec<Regex>,
    min_domain_level: usize,
    max_path_segments: usize,
    normalize: bool,
}

impl UrlValidator {
    // Builds a validator, compiling every configured pattern.
    // A pattern that doesn't compile is a configuration error.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Vec<Regex>> {
            patterns
                .iter()
                .map(|p| {
                    Regex::new(p).map_err(|e| {
                        CrawlError::Config(format!("invalid URL pattern '{}': {}", p, e))
                    })
                })
                .collect()
        };

        Ok(Self {
            excluded_domains: lowercase_all(&settings.excluded_domains),
            excluded_extensions: lowercase_all(&settings.excluded_extensions),
            excluded_paths: settings.excluded_paths.clone(),
            include: compile(&settings.url_patterns.include)?,
            exclude: compile(&settings.url_patterns.exclude)?,
            min_domain_level: settings.min_domain_level,
            max_path_segments: settings.max_path_segments,
            normalize: settings.normalize_urls,
        })
    }

    // Turns a raw candidate string into the form used for dedup and output,
    // together with its domain.
    pub fn prepare(&self, raw: &str) -> Result<(String, String)> {
        let canonical = if self.normalize {
            normalize_url(raw)?
        } else {
            canonical_form(raw)?
        };
        let domain = parse_http_url(&canonical)?
            .host_str()
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| CrawlError::format(raw, "missing host"))?;
        Ok((canonical, domain))
    }

    pub fn is_valid(&self, url: &str) -> bool {
        self.violation(url).is_none()
    }

    // Stricter check for links discovered on a page: on top of being valid,
    // the path must be shallow enough to likely be a content page.
    pub fn is_worth_crawling(&self, url: &str) -> bool {
        if !self.is_valid(url) {
            return false;
        }
        match Url::parse(url) {
            Ok(parsed) => path_segment_count(&parsed) <= self.max_path_segments,
            Err(_) => false,
        }
    }

    // Names the first rule a URL breaks, or None if it passes them all.
    // The returned text is only used for debug logging.
    pub fn violation(&self, url: &str) -> Option<&'static str> {
        let parsed = match parse_http_url(url) {
            Ok(parsed) => parsed,
            Err(_) => return Some("malformed URL"),
        };
        let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();

        if self.is_excluded_domain(&host) {
            return Some("excluded domain");
        }

        let level = host.split('.').count();
        if level < self.min_domain_level || level > MAX_DOMAIN_LEVEL {
            return Some("domain level out of range");
        }

        let lower = url.to_ascii_lowercase();
        if self.excluded_extensions.iter().any(|ext| lower.ends_with(ext.as_str())) {
            return Some("excluded extension");
        }

        if self.excluded_paths.iter().any(|path| url.contains(path.as_str())) {
            return Some("excluded path");
        }

        if self.exclude.iter().any(|re| re.is_match(url)) {
            return Some("matches exclude pattern");
        }

        if !self.include.is_empty() && !self.include.iter().any(|re| re.is_match(url)) {
            return Some("matches no include pattern");
        }

        None
    }

    // "blocked.com" excludes both "blocked.com" and "www.blocked.com",
    // but not "notblocked.com".
    fn is_excluded_domain(&self, host: &str) -> bool {
        self.excluded_domains.iter().any(|domain| {
            host == domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

fn lowercase_all(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.to_ascii_lowercase()).collect()
}

fn path_segment_count(url: &Url) -> usize {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).count())
        .unwrap_or(0)
}
