// src/error.rs
// =============================================================================
// Error taxonomy for the crawler.
//
// Only `Config` is fatal. Every other variant describes what happened to a
// single candidate URL (or to the domain registry) and is recovered locally:
// the URL is dropped, the registry is treated as empty, and the run goes on.
//
// Rust concepts:
// - thiserror: derives Display + std::error::Error from attributes
// - Enums with named fields: each failure carries the context it needs
// =============================================================================

use std::fmt;
use thiserror::Error;

/// Everything that can go wrong while discovering URLs.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The candidate is not a usable http(s) URL.
    #[error("malformed URL '{url}': {reason}")]
    Format { url: String, reason: String },

    /// The request failed or timed out on every attempt.
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    /// The page was fetched but did not pass the quality/security filters.
    #[error("content rejected for {url}: {reason}")]
    ContentRejected { url: String, reason: RejectReason },

    /// Reading or writing the domain registry failed.
    #[error("domain registry at {path}: {message}")]
    Persistence { path: String, message: String },

    /// Bad settings; the only error that stops a run before it starts.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CrawlError {
    pub fn format(url: &str, reason: impl fmt::Display) -> Self {
        CrawlError::Format {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn network(url: &str, message: impl fmt::Display) -> Self {
        CrawlError::Network {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    pub fn rejected(url: &str, reason: RejectReason) -> Self {
        CrawlError::ContentRejected {
            url: url.to_string(),
            reason,
        }
    }
}

/// Why a fetched page was not mined for links.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// Non-2xx status code
    Status(u16),
    /// Missing or disallowed Content-Type
    ContentType(Option<String>),
    /// Body shorter than the configured minimum
    TooShort(usize),
    /// Too little visible text compared to markup
    LowTextRatio(f64),
    /// Looks like a login wall (password field)
    LoginWall,
    /// Looks like a CAPTCHA / bot check
    Captcha,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Status(code) => write!(f, "HTTP {}", code),
            RejectReason::ContentType(Some(ct)) => write!(f, "content type '{}' not allowed", ct),
            RejectReason::ContentType(None) => write!(f, "missing content type"),
            RejectReason::TooShort(len) => write!(f, "only {} bytes of HTML", len),
            RejectReason::LowTextRatio(ratio) => write!(f, "text ratio {:.3} too low", ratio),
            RejectReason::LoginWall => write!(f, "login form detected"),
            RejectReason::Captcha => write!(f, "captcha or bot check detected"),
        }
    }
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, CrawlError>;
