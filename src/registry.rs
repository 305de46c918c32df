// src/registry.rs
// =============================================================================
// Cross-run memory of domains we've already harvested.
//
// Every run pushes toward unexplored territory: URLs from a domain that an
// earlier run already returned are dropped before they're ever fetched.
//
// Storage sits behind the DomainStore trait:
// - JsonFileStore: a pretty-printed JSON array on disk (the default,
//   ~/.url-scout/extracted_domains.json)
// - MemoryStore: for tests and embedding
//
// The registry must never take a crawl down with it. Read failures mean
// "start empty", write failures mean "skip persisting"; both are logged.
// =============================================================================

use crate::error::{CrawlError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

const REGISTRY_DIR: &str = ".url-scout";
const REGISTRY_FILE: &str = "extracted_domains.json";

/// Durable storage for a set of domain names.
pub trait DomainStore: Send + Sync {
    fn load(&self) -> Result<HashSet<String>>;
    fn save(&self, domains: &HashSet<String>) -> Result<()>;
    /// Human-readable location, for log messages
    fn location(&self) -> String;
}

/// Stores the registry as a JSON array of strings.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    // ~/.url-scout/extracted_domains.json
    // Falls back to the working directory when no home directory is known.
    pub fn default_path() -> PathBuf {
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        home.join(REGISTRY_DIR).join(REGISTRY_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persistence_error(&self, message: impl std::fmt::Display) -> CrawlError {
        CrawlError::Persistence {
            path: self.path.display().to_string(),
            message: message.to_string(),
        }
    }
}

impl DomainStore for JsonFileStore {
    fn load(&self) -> Result<HashSet<String>> {
        if !self.path.exists() {
            return Ok(HashSet::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| self.persistence_error(e))?;
        let domains: Vec<String> =
            serde_json::from_str(&content).map_err(|e| self.persistence_error(e))?;
        Ok(domains.into_iter().collect())
    }

    fn save(&self, domains: &HashSet<String>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| self.persistence_error(e))?;
        }

        // Sorted so the file diffs cleanly between runs
        let mut sorted: Vec<&String> = domains.iter().collect();
        sorted.sort();

        let json = serde_json::to_string_pretty(&sorted).map_err(|e| self.persistence_error(e))?;
        std::fs::write(&self.path, json).map_err(|e| self.persistence_error(e))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory store; contents live as long as the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    domains: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domains: Mutex::new(domains.into_iter().map(Into::into).collect()),
        }
    }

    fn poisoned() -> CrawlError {
        CrawlError::Persistence {
            path: "memory".to_string(),
            message: "store lock poisoned".to_string(),
        }
    }
}

impl DomainStore for MemoryStore {
    fn load(&self) -> Result<HashSet<String>> {
        self.domains.lock().map(|d| d.clone()).map_err(|_| Self::poisoned())
    }

    fn save(&self, domains: &HashSet<String>) -> Result<()> {
        let mut guard = self.domains.lock().map_err(|_| Self::poisoned())?;
        *guard = domains.clone();
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// The set of known domains, loaded once and merged back at the end of a run.
pub struct DomainRegistry {
    store: Arc<dyn DomainStore>,
    known: HashSet<String>,
}

impl DomainRegistry {
    // Loads the registry; an unreadable store is treated as empty.
    pub fn open(store: Arc<dyn DomainStore>) -> Self {
        let known = match store.load() {
            Ok(known) => {
                debug!(
                    location = %store.location(),
                    domains = known.len(),
                    "loaded domain registry"
                );
                known
            }
            Err(e) => {
                warn!(error = %e, "could not read domain registry, starting empty");
                HashSet::new()
            }
        };
        Self { store, known }
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.known.contains(domain)
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    pub fn snapshot(&self) -> HashSet<String> {
        self.known.clone()
    }

    // Sorted copy of all known domains
    pub fn domains(&self) -> Vec<String> {
        let mut domains: Vec<String> = self.known.iter().cloned().collect();
        domains.sort();
        domains
    }

    // Adds new domains and persists the union.
    //
    // The store is re-read first so that domains written by another run in
    // the meantime are not lost.
    //
    // Returns: how many domains were not known before
    pub fn merge<I>(&mut self, new_domains: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        if let Ok(on_disk) = self.store.load() {
            self.known.extend(on_disk);
        }

        let before = self.known.len();
        self.known.extend(new_domains);
        let added = self.known.len() - before;

        match self.store.save(&self.known) {
            Ok(()) => {
                debug!(
                    location = %self.store.location(),
                    added,
                    total = self.known.len(),
                    "saved domain registry"
                )
            }
            Err(e) => warn!(error = %e, "could not save domain registry, skipping persistence"),
        }
        added
    }

    // Keeps only the domains we haven't seen before (deduplicated, input
    // order preserved) and records them.
    pub fn register_new<I>(&mut self, domains: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut fresh = Vec::new();
        let mut batch = HashSet::new();
        for domain in domains {
            let domain = domain.trim().to_ascii_lowercase();
            if domain.is_empty() || self.known.contains(&domain) || !batch.insert(domain.clone()) {
                continue;
            }
            fresh.push(domain);
        }
        self.merge(fresh.clone());
        fresh
    }

    // Forgets everything, on disk too
    pub fn clear(&mut self) -> Result<()> {
        self.known.clear();
        self.store.save(&self.known)
    }
}
