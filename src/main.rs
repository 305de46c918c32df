// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (to stderr, so stdout stays clean for the results)
// 3. Dispatch to the appropriate subcommand handler
// 4. Exit with proper code (0 = success, 1 = no URLs found, 2 = error)
//
// Rust concepts used:
// - async/await: the crawler runs many requests concurrently
// - anyhow::Result + context(): turn library errors into readable messages
// - match: Pattern matching to handle different subcommands
// =============================================================================

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, DomainAction};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use url_scout::registry::{DomainRegistry, JsonFileStore};
use url_scout::validate::domain_of;
use url_scout::Settings;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// RUST_LOG wins over --log-level when both are given
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// Returns:
//   Ok(0) = URLs found (or registry command done)
//   Ok(1) = the crawl finished without finding anything
//   Err = configuration or I/O error
async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Fetch {
            count,
            config,
            seeds,
            json,
            concurrency,
            max_depth,
            registry,
        } => {
            let mut settings = match &config {
                Some(path) => Settings::from_file(path)
                    .with_context(|| format!("loading settings from {}", path.display()))?,
                None => Settings::default(),
            };
            if !seeds.is_empty() {
                settings.seed_urls = seeds;
            }
            if let Some(concurrency) = concurrency {
                settings.concurrent_requests = concurrency;
            }
            if let Some(max_depth) = max_depth {
                settings.max_depth = max_depth;
            }
            if registry.is_some() {
                settings.registry_path = registry;
            }

            handle_fetch(settings, count, json).await
        }
        Commands::Domains { registry, action } => handle_domains(registry, action),
    }
}

// Handles the 'fetch' subcommand
async fn handle_fetch(settings: Settings, count: Option<usize>, json: bool) -> Result<i32> {
    let wanted = count.unwrap_or(settings.number_of_urls);
    eprintln!(
        "🔍 Looking for {} URL(s) from {} seed(s)...",
        wanted,
        settings.seed_urls.len()
    );

    let urls = url_scout::fetch_urls(settings, count)
        .await
        .context("crawl failed")?;

    print_results(&urls, json)?;

    if urls.is_empty() {
        Ok(1)
    } else {
        Ok(0)
    }
}

// Handles the 'domains' subcommand
fn handle_domains(registry: Option<PathBuf>, action: DomainAction) -> Result<i32> {
    let store = JsonFileStore::new(registry.unwrap_or_else(JsonFileStore::default_path));
    let location = store.path().display().to_string();
    let mut registry = DomainRegistry::open(Arc::new(store));

    match action {
        DomainAction::List { json } => {
            let domains = registry.domains();
            if json {
                println!("{}", serde_json::to_string_pretty(&domains)?);
            } else {
                for domain in &domains {
                    println!("{}", domain);
                }
                eprintln!("📋 {} domain(s) in {}", domains.len(), location);
            }
        }
        DomainAction::Add { domains } => {
            let added = registry.register_new(domains);
            for domain in &added {
                println!("{}", domain);
            }
            eprintln!("✅ Added {} new domain(s) to {}", added.len(), location);
        }
        DomainAction::Clear => {
            registry
                .clear()
                .with_context(|| format!("clearing {}", location))?;
            eprintln!("🧹 Cleared {}", location);
        }
    }
    Ok(0)
}

// Prints the URLs either as a table or JSON
fn print_results(urls: &[String], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(urls)?);
    } else {
        print_table(urls);
    }
    Ok(())
}

// Prints results as a human-readable table in the terminal
fn print_table(urls: &[String]) {
    println!("{:<5} {:<70} {:<30}", "#", "URL", "DOMAIN");
    println!("{}", "=".repeat(105));

    let mut per_domain: BTreeMap<String, usize> = BTreeMap::new();
    for (i, url) in urls.iter().enumerate() {
        let domain = domain_of(url).unwrap_or_default();

        // Truncate URL if too long for display
        let url_display = if url.chars().count() > 67 {
            format!("{}...", url.chars().take(67).collect::<String>())
        } else {
            url.clone()
        };

        println!("{:<5} {:<70} {:<30}", i + 1, url_display, domain);
        *per_domain.entry(domain).or_default() += 1;
    }

    println!();
    println!("📊 Summary:");
    println!("   🌐 URLs: {}", urls.len());
    println!("   🏷️  Domains: {}", per_domain.len());
    if let Some((domain, n)) = per_domain.iter().max_by_key(|(_, n)| **n) {
        println!("   📈 Most from one domain: {} ({})", domain, n);
    }
}
