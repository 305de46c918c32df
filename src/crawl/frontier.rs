// src/crawl/frontier.rs
// =============================================================================
// The URL frontier: candidate URLs waiting to be crawled, best first.
//
// How it works:
// 1. enqueue() groups a page's candidates by domain and keeps at most 3 per
//    domain (chosen at random), so one link-heavy page can't flood the queue
// 2. Domains already harvested in a previous run are dropped outright
// 3. Each survivor gets priority = base + random jitter in [0, 5), so
//    batches from the same page interleave instead of sorting identically
// 4. dequeue() serves domains that have no accepted URL yet before anything
//    else (diversity first), then falls back to plain priority order
//
// Two binary heaps implement rule 4:
// - fresh: everything starts here
// - revisit: entries whose domain turned out to already have an accepted URL
// A popped fresh entry is checked against the accepted set; if its domain
// has been served meanwhile, it moves to revisit and we try again. A domain
// never loses accepted URLs, so nothing ever moves back.
//
// Rust concepts:
// - BinaryHeap: max-heap, so Ord decides what "best" means
// - StdRng: seedable randomness, so tests get the same jitter every time
// =============================================================================

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashSet};

/// How many candidates per domain survive one enqueue() call
pub const MAX_PER_DOMAIN_PER_BATCH: usize = 3;
/// Upper bound (exclusive) of the random priority jitter
pub const PRIORITY_JITTER: f64 = 5.0;

/// A discovered URL on its way into the frontier.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateUrl {
    /// The string as it was found
    pub raw_url: String,
    /// Dedup key and output form
    pub normalized_url: String,
    pub domain: String,
    /// Link hops from a seed (seeds are 0)
    pub depth: usize,
    pub priority: f64,
}

impl CandidateUrl {
    pub fn new(
        raw_url: impl Into<String>,
        normalized_url: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            raw_url: raw_url.into(),
            normalized_url: normalized_url.into(),
            domain: domain.into(),
            depth: 0,
            priority: 0.0,
        }
    }
}

/// A queued candidate. Ordered by priority; among equal priorities the
/// earlier insertion wins.
#[derive(Debug, Clone)]
pub struct FrontierEntry {
    pub candidate: CandidateUrl,
    seq: u64,
}

impl FrontierEntry {
    pub fn url(&self) -> &str {
        &self.candidate.normalized_url
    }

    pub fn domain(&self) -> &str {
        &self.candidate.domain
    }

    pub fn depth(&self) -> usize {
        self.candidate.depth
    }

    pub fn priority(&self) -> f64 {
        self.candidate.priority
    }
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.candidate
            .priority
            .total_cmp(&other.candidate.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of candidates, owned by one crawl run.
pub struct Frontier {
    fresh: BinaryHeap<FrontierEntry>,
    revisit: BinaryHeap<FrontierEntry>,
    queued: HashSet<String>,
    registered_domains: HashSet<String>,
    rng: StdRng,
    next_seq: u64,
}

impl Frontier {
    // Parameters:
    //   registered_domains: domains from earlier runs; never enqueued
    //   seed: RNG seed for sampling and jitter
    pub fn new(registered_domains: HashSet<String>, seed: u64) -> Self {
        Self {
            fresh: BinaryHeap::new(),
            revisit: BinaryHeap::new(),
            queued: HashSet::new(),
            registered_domains,
            rng: StdRng::seed_from_u64(seed),
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.fresh.len() + self.revisit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fresh.is_empty() && self.revisit.is_empty()
    }

    // Adds a batch of candidates discovered together (one page, or the seeds).
    //
    // Returns: how many candidates were actually queued
    pub fn enqueue(
        &mut self,
        candidates: Vec<CandidateUrl>,
        base_priority: f64,
        depth: usize,
    ) -> usize {
        // BTreeMap keeps the domain order stable, so a seeded RNG gives a
        // reproducible queue.
        let mut by_domain: BTreeMap<String, Vec<CandidateUrl>> = BTreeMap::new();
        for candidate in candidates {
            if self.registered_domains.contains(&candidate.domain)
                || self.queued.contains(&candidate.normalized_url)
            {
                continue;
            }
            by_domain
                .entry(candidate.domain.clone())
                .or_default()
                .push(candidate);
        }

        let mut added = 0;
        for (_, mut group) in by_domain {
            group.shuffle(&mut self.rng);

            // duplicates inside the batch itself
            let mut batch_seen = HashSet::new();
            group.retain(|c| batch_seen.insert(c.normalized_url.clone()));
            group.truncate(MAX_PER_DOMAIN_PER_BATCH);

            for mut candidate in group {
                candidate.depth = depth;
                candidate.priority = base_priority + self.rng.random_range(0.0..PRIORITY_JITTER);

                self.queued.insert(candidate.normalized_url.clone());
                self.fresh.push(FrontierEntry {
                    candidate,
                    seq: self.next_seq,
                });
                self.next_seq += 1;
                added += 1;
            }
        }
        added
    }

    // Pops the next entry to crawl.
    //
    // Parameters:
    //   domain_served: true when a domain already has an accepted URL
    //
    // Returns: None when the frontier is exhausted
    pub fn dequeue<F>(&mut self, domain_served: F) -> Option<FrontierEntry>
    where
        F: Fn(&str) -> bool,
    {
        while let Some(entry) = self.fresh.pop() {
            if domain_served(entry.domain()) {
                self.revisit.push(entry);
            } else {
                return Some(entry);
            }
        }
        self.revisit.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(url: &str, domain: &str) -> CandidateUrl {
        CandidateUrl::new(url, url, domain)
    }

    fn drain(frontier: &mut Frontier) -> Vec<FrontierEntry> {
        std::iter::from_fn(|| frontier.dequeue(|_| false)).collect()
    }

    #[test]
    fn test_caps_each_domain_per_batch() {
        let mut frontier = Frontier::new(HashSet::new(), 7);
        let batch: Vec<_> = (0..10)
            .map(|i| candidate(&format!("https://big.com/{}", i), "big.com"))
            .chain(std::iter::once(candidate("https://small.com", "small.com")))
            .collect();

        assert_eq!(frontier.enqueue(batch, 10.0, 1), 4);

        let entries = drain(&mut frontier);
        assert_eq!(entries.iter().filter(|e| e.domain() == "big.com").count(), 3);
        assert_eq!(entries.iter().filter(|e| e.domain() == "small.com").count(), 1);
        assert!(entries.iter().all(|e| e.depth() == 1));
        assert!(entries
            .iter()
            .all(|e| e.priority() >= 10.0 && e.priority() < 10.0 + PRIORITY_JITTER));
    }

    #[test]
    fn test_drops_registered_domains_and_requeues() {
        let registered: HashSet<String> = ["old.com".to_string()].into_iter().collect();
        let mut frontier = Frontier::new(registered, 1);

        let added = frontier.enqueue(
            vec![
                candidate("https://old.com/a", "old.com"),
                candidate("https://new.com/a", "new.com"),
                candidate("https://new.com/a", "new.com"),
            ],
            10.0,
            0,
        );
        assert_eq!(added, 1);

        // already queued once this run
        assert_eq!(
            frontier.enqueue(vec![candidate("https://new.com/a", "new.com")], 10.0, 0),
            0
        );
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn test_dequeues_highest_priority_first() {
        let mut frontier = Frontier::new(HashSet::new(), 3);
        frontier.enqueue(vec![candidate("https://low.com", "low.com")], 0.0, 2);
        frontier.enqueue(vec![candidate("https://high.com", "high.com")], 100.0, 0);
        frontier.enqueue(vec![candidate("https://mid.com", "mid.com")], 50.0, 1);

        let order: Vec<_> = drain(&mut frontier).iter().map(|e| e.url().to_string()).collect();
        assert_eq!(order, vec!["https://high.com", "https://mid.com", "https://low.com"]);
        assert!(frontier.dequeue(|_| false).is_none());
    }

    #[test]
    fn test_unserved_domains_come_first() {
        let mut frontier = Frontier::new(HashSet::new(), 3);
        frontier.enqueue(vec![candidate("https://seen.com/a", "seen.com")], 100.0, 1);
        frontier.enqueue(vec![candidate("https://new.com/a", "new.com")], 0.0, 1);

        let served = |domain: &str| domain == "seen.com";
        assert_eq!(frontier.dequeue(served).unwrap().url(), "https://new.com/a");
        assert_eq!(frontier.dequeue(served).unwrap().url(), "https://seen.com/a");
        assert!(frontier.dequeue(served).is_none());
    }

    #[test]
    fn test_same_seed_same_order() {
        let batch = || {
            (0..6)
                .map(|i| candidate(&format!("https://d{}.com", i), &format!("d{}.com", i)))
                .collect::<Vec<_>>()
        };
        let mut a = Frontier::new(HashSet::new(), 42);
        let mut b = Frontier::new(HashSet::new(), 42);
        a.enqueue(batch(), 10.0, 0);
        b.enqueue(batch(), 10.0, 0);

        let order_a: Vec<_> = drain(&mut a).iter().map(|e| e.url().to_string()).collect();
        let order_b: Vec<_> = drain(&mut b).iter().map(|e| e.url().to_string()).collect();
        assert_eq!(order_a, order_b);
    }
}
