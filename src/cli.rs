// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands:
// - fetch: run a crawl and print the URLs it found
// - domains: inspect or edit the registry of already-harvested domains
//
// Settings come from the built-in defaults, then an optional JSON file
// (--config), then the individual flags below, in that order.
// =============================================================================

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "url-scout",
    version,
    about = "Discover valid, domain-diverse URLs by crawling outward from seed pages",
    long_about = "url-scout crawls outward from a list of seed pages and returns a sample of live, \
                  well-formed URLs spread over many domains. Domains returned by earlier runs are \
                  remembered and skipped, so each run explores new ground."
)]
pub struct Cli {
    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl from the seed URLs and print the URLs found
    ///
    /// Example: url-scout fetch 50 --seed https://example.com --json
    Fetch {
        /// How many URLs to collect (default: numberOfUrls from the settings)
        count: Option<usize>,

        /// JSON settings file; missing keys keep their defaults
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Seed URL; repeat to give several. Replaces the configured seeds.
        #[arg(long = "seed", value_name = "URL")]
        seeds: Vec<String>,

        /// Output results in JSON format instead of a list
        #[arg(long)]
        json: bool,

        /// Number of pages fetched at the same time
        #[arg(long)]
        concurrency: Option<usize>,

        /// Maximum link hops from a seed
        #[arg(long)]
        max_depth: Option<usize>,

        /// Registry file (default: ~/.url-scout/extracted_domains.json)
        #[arg(long)]
        registry: Option<PathBuf>,
    },

    /// Manage the registry of already-harvested domains
    Domains {
        /// Registry file (default: ~/.url-scout/extracted_domains.json)
        #[arg(long, global = true)]
        registry: Option<PathBuf>,

        #[command(subcommand)]
        action: DomainAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum DomainAction {
    /// Print every known domain
    List {
        #[arg(long)]
        json: bool,
    },

    /// Mark domains as harvested so future crawls skip them
    Add {
        #[arg(required = true)]
        domains: Vec<String>,
    },

    /// Forget every known domain
    Clear,
}


// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why is `count` an Option?
//    - None means "use numberOfUrls from the settings"
//    - A plain usize with a default would hide whether the user typed it
//
// 2. What does `global = true` do?
//    - The flag is accepted before or after the subcommand name
//    - `url-scout --log-level debug fetch` and
//      `url-scout fetch --log-level debug` mean the same thing
//
// 3. Why Vec<String> for --seed?
//    - clap collects every occurrence of a repeated flag into the Vec
// -----------------------------------------------------------------------------
