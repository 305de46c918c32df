// src/crawl/controller.rs
// =============================================================================
// This module runs a crawl: a bounded pool of workers pulling from the
// frontier until we have enough URLs.
//
// How it works:
// 1. Seeds are normalized, validated and put in the frontier
// 2. The loop pops the best entry and spawns a worker for it, keeping at
//    most `concurrentRequests` workers in flight
// 3. Each worker handles exactly one URL end-to-end:
//    wait for its domain's turn -> fetch -> accept or reject -> mine links
//    -> push the new candidates back into the frontier
// 4. The loop stops when the result set is full, when the frontier is empty
//    with nobody left to refill it, or when the time budget runs out
// 5. Remaining workers are awaited (or cancelled, when the time budget ran
//    out), then the harvested domains are merged into the persistent registry
//
// Nothing a single URL does can end the run. Fetch errors, rejected pages
// and malformed links are logged at debug level and dropped.
//
// Rust concepts:
// - JoinSet: a set of spawned tasks we can wait on one at a time
// - Arc<Shared>: every worker sees the same state; each piece of mutable
//   state has its own tokio Mutex, and none is held across network I/O
// =============================================================================

use super::frontier::{CandidateUrl, Frontier, FrontierEntry};
use super::politeness::{DomainScheduler, DEFAULT_MAX_JITTER};
use super::results::{Admission, ValidSet};
use crate::config::Settings;
use crate::error::{CrawlError, Result};
use crate::extract::LinkExtractor;
use crate::fetch::{content_type_allowed, FetchMethod, PageFetcher};
use crate::registry::{DomainRegistry, DomainStore};
use crate::validate::UrlValidator;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// Seeds start at this priority; links found at depth d get SEED_PRIORITY - d.
const SEED_PRIORITY: f64 = 10.0;

/// One crawl configuration. Each call to [`Crawler::run`] is an independent
/// run with its own frontier, visited set and results.
pub struct Crawler {
    settings: Arc<Settings>,
    validator: Arc<UrlValidator>,
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn DomainStore>,
    seed: Option<u64>,
}

// Everything the workers of one run share
struct Shared {
    settings: Arc<Settings>,
    validator: Arc<UrlValidator>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: LinkExtractor,
    scheduler: Arc<DomainScheduler>,
    frontier: Mutex<Frontier>,
    visited: Mutex<HashSet<String>>,
    valid: Mutex<ValidSet>,
}

impl Crawler {
    // Validates the settings up front; this is where configuration errors
    // surface.
    pub fn new(
        settings: Settings,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn DomainStore>,
    ) -> Result<Self> {
        settings.validate()?;
        let validator = UrlValidator::from_settings(&settings)?;
        Ok(Self {
            settings: Arc::new(settings),
            validator: Arc::new(validator),
            fetcher,
            store,
            seed: None,
        })
    }

    // Fixes the RNG seed used for seed shuffling, frontier sampling and
    // priority jitter. Politeness and retry jitter stay random.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // Crawls until `target` URLs are found (default: numberOfUrls), the
    // frontier runs dry, or the time budget is spent.
    //
    // Returns: the accepted URLs, in the order they were accepted
    pub async fn run(&self, target: Option<usize>) -> Result<Vec<String>> {
        let target = target.unwrap_or(self.settings.number_of_urls);
        if target == 0 {
            return Err(CrawlError::Config("target count must be at least 1".into()));
        }

        let mut registry = DomainRegistry::open(self.store.clone());
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        // Workers and the extractor's sitemap/robots lookups share one
        // scheduler, so every request to a domain is spaced out.
        let scheduler = Arc::new(DomainScheduler::new(
            self.settings.crawl_delay(),
            DEFAULT_MAX_JITTER,
            self.settings.max_urls_per_domain,
        ));
        let shared = Arc::new(Shared {
            settings: self.settings.clone(),
            validator: self.validator.clone(),
            fetcher: self.fetcher.clone(),
            extractor: LinkExtractor::new(
                &self.settings,
                self.fetcher.clone(),
                scheduler.clone(),
            ),
            scheduler,
            frontier: Mutex::new(Frontier::new(registry.snapshot(), rng.random())),
            visited: Mutex::new(HashSet::new()),
            valid: Mutex::new(ValidSet::new(target, self.settings.max_urls_per_domain)),
        });

        let seeded = self.enqueue_seeds(&shared, &mut rng).await;
        info!(
            wanted = target,
            seeds = seeded,
            known_domains = registry.len(),
            concurrency = self.settings.concurrent_requests,
            "starting crawl"
        );
        if seeded == 0 {
            warn!("no usable seed URLs (invalid, excluded or already registered)");
        }

        let deadline = Instant::now() + self.settings.run_budget();
        let mut tasks = JoinSet::new();

        loop {
            if shared.valid.lock().await.is_full() {
                debug!("target reached");
                break;
            }
            if Instant::now() >= deadline {
                warn!(
                    budget = ?self.settings.run_budget(),
                    in_flight = tasks.len(),
                    "time budget exhausted, cancelling running workers"
                );
                tasks.abort_all();
                break;
            }

            if tasks.len() >= self.settings.concurrent_requests {
                wait_for_one(&mut tasks, deadline).await;
                continue;
            }

            let next = {
                let valid = shared.valid.lock().await;
                let mut frontier = shared.frontier.lock().await;
                frontier.dequeue(|domain| valid.has_domain(domain))
            };

            match next {
                Some(entry) => {
                    tasks.spawn(crawl_entry(shared.clone(), entry));
                }
                None if tasks.is_empty() => {
                    debug!("frontier exhausted");
                    break;
                }
                // Running workers may still refill the frontier
                None => wait_for_one(&mut tasks, deadline).await,
            }
        }

        while let Some(joined) = tasks.join_next().await {
            log_join_error(joined);
        }

        let (urls, domains) = {
            let valid = shared.valid.lock().await;
            let domains: Vec<String> = valid.domains().cloned().collect();
            (valid.urls().to_vec(), domains)
        };

        let new_domains = registry.merge(domains);
        let visited = shared.visited.lock().await.len();
        info!(
            found = urls.len(),
            wanted = target,
            new_domains,
            visited,
            "crawl finished"
        );

        Ok(urls)
    }

    async fn enqueue_seeds(&self, shared: &Shared, rng: &mut StdRng) -> usize {
        let mut seeds = self.settings.seed_urls.clone();
        if self.settings.randomize_request_order {
            seeds.shuffle(rng);
        }

        let candidates: Vec<CandidateUrl> = seeds
            .iter()
            .filter_map(|raw| match self.validator.prepare(raw) {
                Ok((normalized, domain)) if self.validator.is_valid(&normalized) => {
                    Some(CandidateUrl::new(raw.as_str(), normalized, domain))
                }
                Ok((normalized, _)) => {
                    warn!(
                        url = %raw,
                        reason = self.validator.violation(&normalized).unwrap_or("invalid"),
                        "skipping seed URL"
                    );
                    None
                }
                Err(e) => {
                    warn!(error = %e, "skipping seed URL");
                    None
                }
            })
            .collect();

        shared
            .frontier
            .lock()
            .await
            .enqueue(candidates, SEED_PRIORITY, 0)
    }
}

// Waits for any one worker to finish, but never past the deadline
async fn wait_for_one(tasks: &mut JoinSet<()>, deadline: Instant) {
    if let Ok(Some(joined)) = timeout_at(deadline, tasks.join_next()).await {
        log_join_error(joined);
    }
}

fn log_join_error(joined: std::result::Result<(), tokio::task::JoinError>) {
    match joined {
        Err(e) if e.is_cancelled() => {}
        Err(e) => warn!(error = %e, "crawl worker failed"),
        Ok(()) => {}
    }
}

// One worker: processes a single frontier entry from start to finish.
async fn crawl_entry(shared: Arc<Shared>, entry: FrontierEntry) {
    let url = entry.url().to_string();
    let domain = entry.domain().to_string();
    let depth = entry.depth();
    let settings = &shared.settings;

    // Atomic check-and-mark: exactly one worker gets each URL
    if !shared.visited.lock().await.insert(url.clone()) {
        return;
    }

    {
        let valid = shared.valid.lock().await;
        if valid.is_full() {
            return;
        }
        if valid.domain_is_capped(&domain) {
            debug!(url = %url, domain = %domain, "domain cap reached, skipping");
            return;
        }
    }

    if let Some(reason) = shared.validator.violation(&url) {
        debug!(url = %url, reason, "invalid URL");
        shared.scheduler.update_reputation(&domain, false).await;
        return;
    }

    // A domain we've already dug into only gets a cheap liveness check
    let mine_links =
        depth < settings.max_depth && !shared.scheduler.should_switch_domain(&domain).await;
    let method = if mine_links {
        FetchMethod::Get
    } else {
        FetchMethod::Head
    };

    shared.scheduler.await_turn(&domain).await;

    let referer = shared.pick_referer().await;
    let page = match shared.fetcher.fetch(&url, method, referer.as_deref()).await {
        Ok(page) => page,
        Err(e) => {
            debug!(url = %url, error = %e, "fetch failed");
            shared.scheduler.update_reputation(&domain, false).await;
            return;
        }
    };

    // A missing Content-Type is given the benefit of the doubt here; the
    // extractor is stricter before it mines a page.
    let type_ok = page
        .content_type
        .as_deref()
        .map_or(true, |ct| content_type_allowed(ct, &settings.allowed_content_types));
    if !page.is_success() || !type_ok {
        debug!(
            url = %url,
            status = page.status,
            content_type = ?page.content_type,
            "response not acceptable"
        );
        shared.scheduler.update_reputation(&domain, false).await;
        return;
    }

    let admission = shared.valid.lock().await.try_accept(&url, &domain);
    if admission != Admission::Accepted {
        debug!(url = %url, ?admission, "not added");
        return;
    }
    let reputation = shared.scheduler.update_reputation(&domain, true).await;
    info!(url = %url, domain = %domain, depth, reputation, "accepted");

    if !mine_links || shared.valid.lock().await.is_full() {
        return;
    }

    shared.scheduler.record_crawl(&domain).await;
    let links = match shared.extractor.extract(&page).await {
        Ok(links) => links,
        Err(e) => {
            debug!(url = %url, error = %e, "not mining page");
            return;
        }
    };

    let candidates = shared.prepare_candidates(links).await;
    let found = candidates.len();
    let queued = shared
        .frontier
        .lock()
        .await
        .enqueue(candidates, SEED_PRIORITY - depth as f64, depth + 1);
    debug!(url = %url, found, queued, "mined links");
}

impl Shared {
    // Normalizes discovered links and keeps the ones worth queueing
    async fn prepare_candidates(&self, links: Vec<String>) -> Vec<CandidateUrl> {
        let visited = self.visited.lock().await;
        links
            .into_iter()
            .filter_map(|raw| {
                let (normalized, domain) = self.validator.prepare(&raw).ok()?;
                if visited.contains(&normalized) || !self.validator.is_worth_crawling(&normalized) {
                    return None;
                }
                Some(CandidateUrl::new(raw, normalized, domain))
            })
            .collect()
    }

    // A random earlier result (or seed) as Referer, so requests look like
    // ordinary click-through traffic. Only once we have results.
    async fn pick_referer(&self) -> Option<String> {
        if !self.settings.use_random_referer {
            return None;
        }
        let valid = self.valid.lock().await;
        if valid.is_empty() {
            return None;
        }
        let pool: Vec<&String> = valid.urls().iter().chain(&self.settings.seed_urls).collect();
        pool.choose(&mut rand::rng()).map(|s| s.to_string())
    }
}
