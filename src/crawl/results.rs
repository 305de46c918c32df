// src/crawl/results.rs
// =============================================================================
// The set of accepted URLs: the crawler's only output.
//
// All three invariants are enforced in one place, try_accept(), which is
// called while holding the set's lock:
// - no URL twice
// - never more than `target` URLs
// - never more than `per_domain_cap` URLs from one domain
// =============================================================================

use std::collections::{HashMap, HashSet};

/// Outcome of offering a URL to the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    Duplicate,
    DomainFull,
    TargetReached,
}

#[derive(Debug)]
pub struct ValidSet {
    urls: Vec<String>,
    members: HashSet<String>,
    per_domain: HashMap<String, usize>,
    target: usize,
    per_domain_cap: usize,
}

impl ValidSet {
    pub fn new(target: usize, per_domain_cap: usize) -> Self {
        Self {
            urls: Vec::new(),
            members: HashSet::new(),
            per_domain: HashMap::new(),
            target,
            per_domain_cap,
        }
    }

    // Check-then-insert as a single step
    pub fn try_accept(&mut self, url: &str, domain: &str) -> Admission {
        if self.is_full() {
            return Admission::TargetReached;
        }
        if self.members.contains(url) {
            return Admission::Duplicate;
        }
        if self.domain_count(domain) >= self.per_domain_cap {
            return Admission::DomainFull;
        }

        self.members.insert(url.to_string());
        self.urls.push(url.to_string());
        *self.per_domain.entry(domain.to_string()).or_insert(0) += 1;
        Admission::Accepted
    }

    pub fn is_full(&self) -> bool {
        self.urls.len() >= self.target
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn domain_count(&self, domain: &str) -> usize {
        self.per_domain.get(domain).copied().unwrap_or(0)
    }

    pub fn domain_is_capped(&self, domain: &str) -> bool {
        self.domain_count(domain) >= self.per_domain_cap
    }

    pub fn has_domain(&self, domain: &str) -> bool {
        self.domain_count(domain) > 0
    }

    pub fn domains(&self) -> impl Iterator<Item = &String> {
        self.per_domain.keys()
    }

    // Accepted URLs, in acceptance order
    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enforces_all_invariants() {
        let mut set = ValidSet::new(3, 2);

        assert_eq!(set.try_accept("https://a.com", "a.com"), Admission::Accepted);
        assert_eq!(set.try_accept("https://a.com", "a.com"), Admission::Duplicate);
        assert_eq!(set.try_accept("https://a.com/1", "a.com"), Admission::Accepted);
        assert_eq!(set.try_accept("https://a.com/2", "a.com"), Admission::DomainFull);
        assert!(set.domain_is_capped("a.com"));
        assert_eq!(set.try_accept("https://b.com", "b.com"), Admission::Accepted);
        assert!(set.is_full());
        assert_eq!(set.try_accept("https://c.com", "c.com"), Admission::TargetReached);

        assert_eq!(set.len(), 3);
        assert_eq!(
            set.urls(),
            &["https://a.com", "https://a.com/1", "https://b.com"]
        );
        assert!(set.has_domain("b.com"));
        assert!(!set.has_domain("c.com"));
        assert_eq!(set.domains().count(), 2);
    }
}
