//! Prefix-Harvest main entry point
//!
//! This is the command-line interface for the Prefix-Harvest directory harvester.

use anyhow::Context;
use clap::Parser;
use prefix_harvest::cache::{CacheSummary, SqliteCache};
use prefix_harvest::config::{load_config_with_hash, Config};
use prefix_harvest::crawler::{run_harvest, HarvestOptions};
use prefix_harvest::output::{print_cache_summary, print_statistics};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Prefix-Harvest: exhaustive harvesting of a truncating directory search
///
/// Prefix-Harvest enumerates every name behind an autocomplete endpoint that
/// truncates its answers, searches each name, and extracts one record per
/// distinct directory entry. Every remote call is cached, so interrupted
/// runs resume cheaply.
#[derive(Parser, Debug)]
#[command(name = "prefix-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Exhaustive harvesting of a truncating directory search", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Ignore saved names and links lists (cached responses are still used)
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be harvested without harvesting
    #[arg(long, conflicts_with_all = ["stats", "names_only"])]
    dry_run: bool,

    /// Show statistics from the response cache and exit
    #[arg(long, conflicts_with_all = ["dry_run", "names_only"])]
    stats: bool,

    /// Stop after enumerating names
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    names_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        let options = HarvestOptions {
            fresh: cli.fresh,
            names_only: cli.names_only,
        };
        handle_harvest(config, options, cli.quiet).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("prefix_harvest=info,warn"),
            1 => EnvFilter::new("prefix_harvest=debug,info"),
            2 => EnvFilter::new("prefix_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config) {
    println!("=== Prefix-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Form page: {}", config.site.form_page);
    println!("  Search endpoint: {}", config.site.search_endpoint);
    println!("  Autocomplete endpoint: {}", config.site.autocomplete_endpoint);
    println!("  Name field: {}", config.site.name_field);
    if !config.site.excluded_form_fields.is_empty() {
        println!(
            "  Excluded form fields: {}",
            config.site.excluded_form_fields.join(", ")
        );
    }
    if let Some(param) = &config.site.entry_id_param {
        println!("  Entry id parameter: {}", param);
    }

    println!("\nEnumeration:");
    println!("  Alphabet: {}", config.enumeration.alphabet);
    println!(
        "  Truncation threshold: {}",
        config.enumeration.truncation_threshold
    );
    println!("  Max depth: {}", config.enumeration.max_depth);
    println!("  Max queries: {}", config.enumeration.max_queries);

    println!("\nRate Limits:");
    println!(
        "  Search/detail delay: {}-{}ms",
        config.rate_limit.search_min_delay, config.rate_limit.search_max_delay
    );
    println!(
        "  Autocomplete delays: {:?}ms",
        config.rate_limit.autocomplete_delays
    );

    println!("\nFetch:");
    println!("  Timeout: {}s", config.fetch.timeout);
    println!("  Max retries: {}", config.fetch.max_retries);
    println!("  Detail workers: {}", config.fetch.detail_workers);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nCache:");
    if config.cache.enabled {
        println!("  Database: {}", config.cache.database_path);
    } else {
        println!("  Disabled");
    }

    println!("\nOutput:");
    println!("  Names: {}", config.output.names_path);
    println!("  Links: {}", config.output.links_path);
    println!("  Records: {}", config.output.records_path);

    println!("\nRecord Fields ({}):", config.record.fields.len());
    for field in &config.record.fields {
        println!("  - {} -> {}", field.label, field.column);
    }

    println!("\n✓ Configuration is valid");
    for label in saved_lists(config) {
        println!("✓ Saved {} list found, that stage would be skipped", label);
    }
}

/// Saved lists that would let a harvest skip their stage
fn saved_lists(config: &Config) -> Vec<&'static str> {
    [
        ("names", &config.output.names_path),
        ("links", &config.output.links_path),
    ]
    .into_iter()
    .filter(|(_, path)| {
        std::fs::metadata(path)
            .map(|meta| meta.len() > 0)
            .unwrap_or(false)
    })
    .map(|(label, _)| label)
    .collect()
}

/// Handles the --stats mode: shows statistics from the response cache
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Cache: {}\n", config.cache.database_path);

    let summary = load_cache_summary(config)?;
    print_cache_summary(&summary);

    Ok(())
}

/// Summarizes an existing cache database without creating one
fn load_cache_summary(config: &Config) -> anyhow::Result<CacheSummary> {
    let path = Path::new(&config.cache.database_path);
    if !path.exists() {
        anyhow::bail!("No cache database at {}", path.display());
    }

    let cache = SqliteCache::new(path)
        .with_context(|| format!("Failed to open cache {}", path.display()))?;
    Ok(cache.summary()?)
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, options: HarvestOptions, quiet: bool) -> anyhow::Result<()> {
    tracing::info!(
        "Harvesting {} (alphabet '{}', threshold {})",
        config.site.base_url,
        config.enumeration.alphabet,
        config.enumeration.truncation_threshold
    );

    match run_harvest(config, options).await {
        Ok(stats) => {
            if !quiet {
                println!();
                print_statistics(&stats);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prefix_harvest::cache::{CacheEntry, CacheStore};
    use prefix_harvest::config::load_config;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_config(dir: &Path) -> Config {
        let config_path = dir.join("harvest.toml");
        let content = format!(
            r#"
[site]
base-url = "http://directory.example.com/bottin/"
form-page = "list.aspx?lang=en"
search-endpoint = "list.aspx?lang=en"
autocomplete-endpoint = "default.aspx/GetListeNom"
name-field = "txbNom"
form-selector = "form#form1"
results-selector = "table#GViewList"

[enumeration]
alphabet = "ab"
truncation-threshold = 2

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[cache]
database-path = "{dir}/cache.db"

[output]
names-path = "{dir}/names.txt"
links-path = "{dir}/links.txt"
records-path = "{dir}/records.csv"
"#,
            dir = dir.display()
        );
        fs::write(&config_path, content).unwrap();
        load_config(&config_path).unwrap()
    }

    #[test]
    fn test_stats_summarizes_cache() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(dir.path());
        {
            let mut cache = SqliteCache::new(&dir.path().join("cache.db")).unwrap();
            cache
                .put(
                    "POST http://directory.example.com/bottin/default.aspx/GetListeNom nom=a",
                    &CacheEntry::success(r#"{"d":[]}"#),
                )
                .unwrap();
            cache
                .put(
                    "GET http://directory.example.com/bottin/Fiche.aspx?id=1",
                    &CacheEntry::success("<html></html>"),
                )
                .unwrap();
        }

        let summary = load_cache_summary(&config).unwrap();
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.by_endpoint.len(), 2);
        assert!(handle_stats(&config).is_ok());
    }

    #[test]
    fn test_stats_without_cache_fails_and_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(dir.path());

        assert!(handle_stats(&config).is_err());
        assert!(!dir.path().join("cache.db").exists());
    }

    #[test]
    fn test_dry_run_reports_saved_lists() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(dir.path());
        assert!(saved_lists(&config).is_empty());

        fs::write(dir.path().join("names.txt"), "aa\nab\n").unwrap();
        fs::write(dir.path().join("links.txt"), "").unwrap();
        assert_eq!(saved_lists(&config), vec!["names"]);

        handle_dry_run(&config);
    }
}
