// src/crawl/mod.rs
// =============================================================================
// This module handles the crawl itself.
//
// Features:
// - Priority frontier that favors domains we haven't collected yet
// - Per-domain politeness delays with jitter
// - Bounded pool of concurrent workers
// - Result set that enforces the target size and the per-domain cap
//
// Submodules:
// - frontier: the candidate queue
// - politeness: per-domain delays, switch decisions and reputation
// - results: the set of accepted URLs
// - controller: the run loop tying them together
// =============================================================================

mod controller;
mod frontier;
mod politeness;
mod results;

pub use controller::Crawler;
pub use frontier::{CandidateUrl, Frontier, FrontierEntry};
pub use politeness::{DomainScheduler, DomainState};
pub use results::{Admission, ValidSet};
