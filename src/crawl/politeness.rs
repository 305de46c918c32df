// src/crawl/politeness.rs
// =============================================================================
// Per-domain politeness and bookkeeping.
//
// - await_turn(): a worker waits until the domain's last request is at least
//   crawl_delay (+ up to 300ms of jitter) in the past. Only that worker
//   waits; others keep going.
// - should_switch_domain(): once we've mined a few pages of a domain, stop
//   following its links so the crawl spreads out. Its URLs can still be
//   accepted (up to the hard per-domain cap), we just don't dig deeper.
// - update_reputation(): x1.2 on success, x0.8 on failure. Nothing reads it
//   for scheduling decisions yet; it's exposed for callers and logging.
//
// The wait is computed and the slot reserved while holding the lock, then
// the sleep happens after the lock is released. Two workers hitting the same
// domain at once therefore line up one delay apart instead of both firing.
// =============================================================================

use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Default upper bound of the random extra delay per request
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(300);

const REPUTATION_REWARD: f64 = 1.2;
const REPUTATION_PENALTY: f64 = 0.8;

/// What we know about one domain during this run.
#[derive(Debug, Clone)]
pub struct DomainState {
    /// When the latest request was (or is scheduled to be) sent
    pub last_accessed_at: Option<Instant>,
    /// Pages of this domain whose links have been mined
    pub url_count: usize,
    pub reputation: f64,
}

impl Default for DomainState {
    fn default() -> Self {
        Self {
            last_accessed_at: None,
            url_count: 0,
            reputation: 1.0,
        }
    }
}

pub struct DomainScheduler {
    crawl_delay: Duration,
    max_jitter: Duration,
    switch_threshold: f64,
    states: Mutex<HashMap<String, DomainState>>,
}

impl DomainScheduler {
    // Parameters:
    //   crawl_delay: minimum gap between requests to one domain
    //   max_jitter: random extra gap, drawn per request from [0, max_jitter]
    //   max_urls_per_domain: the hard cap; the switch threshold derives from it
    pub fn new(crawl_delay: Duration, max_jitter: Duration, max_urls_per_domain: usize) -> Self {
        Self {
            crawl_delay,
            max_jitter,
            switch_threshold: (max_urls_per_domain as f64 / 2.0).min(5.0),
            states: Mutex::new(HashMap::new()),
        }
    }

    // Suspends the caller until it may send a request to `domain`.
    pub async fn await_turn(&self, domain: &str) {
        let jitter = rand::rng().random_range(Duration::ZERO..=self.max_jitter);
        let gap = self.crawl_delay + jitter;

        let wait = {
            let mut states = self.states.lock().await;
            let state = states.entry(domain.to_string()).or_default();
            let now = Instant::now();
            let ready_at = match state.last_accessed_at {
                Some(last) => (last + gap).max(now),
                None => now,
            };
            state.last_accessed_at = Some(ready_at);
            ready_at - now
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    pub async fn should_switch_domain(&self, domain: &str) -> bool {
        let states = self.states.lock().await;
        let count = states.get(domain).map_or(0, |s| s.url_count);
        count as f64 >= self.switch_threshold
    }

    // Records that one more page of `domain` is being mined for links
    pub async fn record_crawl(&self, domain: &str) -> usize {
        let mut states = self.states.lock().await;
        let state = states.entry(domain.to_string()).or_default();
        state.url_count += 1;
        state.url_count
    }

    pub async fn update_reputation(&self, domain: &str, success: bool) -> f64 {
        let mut states = self.states.lock().await;
        let state = states.entry(domain.to_string()).or_default();
        state.reputation *= if success {
            REPUTATION_REWARD
        } else {
            REPUTATION_PENALTY
        };
        state.reputation
    }

    pub async fn reputation(&self, domain: &str) -> f64 {
        let states = self.states.lock().await;
        states.get(domain).map_or(1.0, |s| s.reputation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_visit_is_immediate_then_delayed() {
        let scheduler = DomainScheduler::new(Duration::from_millis(1000), Duration::ZERO, 3);

        let start = Instant::now();
        scheduler.await_turn("example.com").await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        scheduler.await_turn("example.com").await;
        assert!(start.elapsed() >= Duration::from_millis(1000));

        // another domain is not held back
        let before = Instant::now();
        scheduler.await_turn("other.com").await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_stays_within_bound() {
        let scheduler = DomainScheduler::new(
            Duration::from_millis(1000),
            Duration::from_millis(300),
            3,
        );
        scheduler.await_turn("example.com").await;

        let start = Instant::now();
        scheduler.await_turn("example.com").await;
        let gap = start.elapsed();
        assert!(gap >= Duration::from_millis(1000));
        assert!(gap <= Duration::from_millis(1300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_spaced_out() {
        let scheduler = std::sync::Arc::new(DomainScheduler::new(
            Duration::from_millis(500),
            Duration::ZERO,
            3,
        ));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let scheduler = scheduler.clone();
            handles.push(tokio::spawn(async move {
                scheduler.await_turn("example.com").await;
                Instant::now()
            }));
        }
        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap() - start);
        }
        times.sort();

        assert_eq!(times[0], Duration::ZERO);
        assert!(times[1] >= Duration::from_millis(500));
        assert!(times[2] >= Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_switch_threshold() {
        // cap 3 -> threshold 1.5 -> switch after the 2nd mined page
        let scheduler = DomainScheduler::new(Duration::ZERO, Duration::ZERO, 3);
        assert!(!scheduler.should_switch_domain("a.com").await);
        scheduler.record_crawl("a.com").await;
        assert!(!scheduler.should_switch_domain("a.com").await);
        scheduler.record_crawl("a.com").await;
        assert!(scheduler.should_switch_domain("a.com").await);

        // large caps are clamped to 5
        let scheduler = DomainScheduler::new(Duration::ZERO, Duration::ZERO, 100);
        for _ in 0..4 {
            scheduler.record_crawl("b.com").await;
        }
        assert!(!scheduler.should_switch_domain("b.com").await);
        scheduler.record_crawl("b.com").await;
        assert!(scheduler.should_switch_domain("b.com").await);
    }

    #[tokio::test]
    async fn test_reputation_moves_multiplicatively() {
        let scheduler = DomainScheduler::new(Duration::ZERO, Duration::ZERO, 3);
        assert_eq!(scheduler.reputation("a.com").await, 1.0);

        let up = scheduler.update_reputation("a.com", true).await;
        assert!((up - 1.2).abs() < 1e-9);
        let down = scheduler.update_reputation("a.com", false).await;
        assert!((down - 0.96).abs() < 1e-9);
    }
}
