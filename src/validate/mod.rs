// src/validate/mod.rs
// =============================================================================
// URL validation and normalization.
//
// Submodules:
// - normalize: parsing + canonical form (dedup key for the whole crawler)
// - rules: exclusion lists, regex patterns, domain-level checks
// =============================================================================

mod normalize;
mod rules;

pub use normalize::{domain_of, is_valid_url_format, normalize_url, parse_http_url};
pub use rules::UrlValidator;
