//! Harvest coordinator - main run orchestration logic
//!
//! This module contains the run loop that chains the stages of a harvest:
//! - Enumerating names, or loading them from the saved names list
//! - Searching names for entry links, or loading the saved links list
//! - Fetching each distinct entry and extracting its record
//! - Writing the records and reporting run statistics

use crate::cache::{open_cache, CacheStore};
use crate::config::Config;
use crate::crawler::directory::RemoteDirectory;
use crate::crawler::expander::PrefixExpander;
use crate::crawler::fetcher::{HttpTransport, Transport};
use crate::crawler::parser::{EntryLink, ListingParser};
use crate::crawler::search::SearchCrawler;
use crate::output::{read_lines, read_links, write_lines, write_links, write_records, RunStatistics};
use crate::record::{RecordExtractor, TableRecordExtractor};
use crate::HarvestError;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Run-level switches, usually from the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestOptions {
    /// Ignore saved names and links lists
    pub fresh: bool,

    /// Stop once the names are known
    pub names_only: bool,
}

/// Main harvest coordinator structure
pub struct Harvester {
    config: Config,
    directory: Arc<RemoteDirectory>,
    extractor: Arc<dyn RecordExtractor>,
    options: HarvestOptions,
}

impl Harvester {
    /// Creates a harvester talking to the configured site over HTTP
    ///
    /// An unavailable cache is not an error here: the harvest runs without
    /// caching (see [`open_cache`]).
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Successfully created harvester
    /// * `Err(HarvestError)` - Invalid configuration or HTTP client failure
    pub fn new(config: Config, options: HarvestOptions) -> Result<Self, HarvestError> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config)?);
        let store = open_cache(&config.cache);
        let extractor: Arc<dyn RecordExtractor> =
            Arc::new(TableRecordExtractor::new(&config.record)?);

        Self::with_parts(config, transport, store, extractor, options)
    }

    /// Creates a harvester from explicit collaborators
    pub fn with_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        store: Option<Box<dyn CacheStore>>,
        extractor: Arc<dyn RecordExtractor>,
        options: HarvestOptions,
    ) -> Result<Self, HarvestError> {
        let directory = RemoteDirectory::from_config(&config, transport, store)?;

        Ok(Self {
            config,
            directory: Arc::new(directory),
            extractor,
            options,
        })
    }

    pub fn directory(&self) -> &RemoteDirectory {
        &self.directory
    }

    /// Runs the harvest
    ///
    /// Failed units of work (a prefix, a search, a detail page) are counted
    /// in the statistics and never stop the run. The run stops on
    /// resource-level failures only: the search form cannot be loaded or an
    /// output file cannot be read or written.
    pub async fn run(&self) -> Result<RunStatistics, HarvestError> {
        let start_time = Instant::now();
        let mut stats = RunStatistics::default();

        if self.options.fresh {
            tracing::info!("Starting fresh harvest (ignoring saved lists)");
        }

        let names = self.names(&mut stats).await?;

        if self.options.names_only {
            tracing::info!("Names only: stopping after enumeration");
        } else {
            let mut crawler = SearchCrawler::new(
                self.directory.clone(),
                ListingParser::new(&self.config.site)?,
                self.extractor.clone(),
            )
            .with_workers(self.config.fetch.detail_workers);

            let links = self.links(&mut crawler, &names, &mut stats).await?;

            let report = crawler.crawl_links(&links).await;
            stats.records = report.records.len();
            stats.not_found = report.not_found.len();
            stats.failed_details = report.failed_details.len();

            write_records(
                Path::new(&self.config.output.records_path),
                &self.extractor.columns(),
                &report.records,
            )?;
        }

        self.finish(&mut stats, start_time);
        Ok(stats)
    }

    /// Enumerates names, unless a saved list can be reused
    async fn names(&self, stats: &mut RunStatistics) -> Result<Vec<String>, HarvestError> {
        let path = Path::new(&self.config.output.names_path);

        if !self.options.fresh {
            let saved = read_lines(path)?;
            if !saved.is_empty() {
                tracing::info!(
                    "Resuming with {} names from {} (enumeration skipped)",
                    saved.len(),
                    path.display()
                );
                stats.names = saved.len();
                stats.names_resumed = true;
                return Ok(saved);
            }
        }

        let report = PrefixExpander::from_config(&self.config.enumeration)
            .expand(&self.directory)
            .await;

        stats.names = report.names.len();
        stats.queries_issued = report.queries_issued;
        stats.failed_prefixes = report.failed_prefixes.len();
        stats.anomalies = report.anomalies.len();

        // A list with holes would make the next run skip the failed branches
        if report.failed_prefixes.is_empty() {
            write_lines(path, &report.names)?;
            tracing::info!("Saved {} names to {}", report.names.len(), path.display());
        } else {
            tracing::warn!(
                "{} prefixes failed; names list not saved, the next run enumerates again",
                report.failed_prefixes.len()
            );
        }

        Ok(report.names)
    }

    /// Searches names for entry links, unless a saved list can be reused
    async fn links(
        &self,
        crawler: &mut SearchCrawler,
        names: &[String],
        stats: &mut RunStatistics,
    ) -> Result<Vec<EntryLink>, HarvestError> {
        let path = Path::new(&self.config.output.links_path);
        let id_param = self.config.site.entry_id_param.as_deref();

        if !self.options.fresh {
            let saved = read_links(path, id_param)?;
            if !saved.is_empty() {
                tracing::info!(
                    "Resuming with {} links from {} (search skipped)",
                    saved.len(),
                    path.display()
                );
                stats.links = saved.len();
                stats.links_resumed = true;
                return Ok(saved);
            }
        }

        if names.is_empty() {
            tracing::warn!("No names to search");
            return Ok(Vec::new());
        }

        let report = crawler.collect_links(names).await?;

        stats.links = report.links.len();
        stats.failed_searches = report.failed_searches.len();

        if report.failed_searches.is_empty() {
            write_links(path, &report.links)?;
            tracing::info!("Saved {} links to {}", report.links.len(), path.display());
        } else {
            tracing::warn!(
                "{} searches failed; links list not saved, the next run searches again",
                report.failed_searches.len()
            );
        }

        Ok(report.links)
    }

    fn finish(&self, stats: &mut RunStatistics, start_time: Instant) {
        let autocomplete = self.directory.autocomplete_limiter();
        let search = self.directory.search_limiter();

        stats.fetch = self.directory.fetch_stats();
        stats.waits = autocomplete.waits() + search.waits();
        stats.waited = autocomplete.total_waited() + search.total_waited();
        stats.elapsed = start_time.elapsed();

        tracing::info!(
            "Harvest completed: {} names, {} entries, {} records in {:?} ({} cache hits, {} remote calls)",
            stats.names,
            stats.links,
            stats.records,
            stats.elapsed,
            stats.fetch.hits,
            stats.fetch.misses
        );
    }
}

/// Runs a complete harvest
///
/// This function orchestrates the entire harvest:
///
/// 1. Open the response cache (or continue without one)
/// 2. Build the HTTP transport
/// 3. Enumerate names through the autocomplete endpoint
/// 4. Search each name and collect distinct entry links
/// 5. Fetch each entry and extract its record
/// 6. Write the records
///
/// # Example
///
/// ```no_run
/// use prefix_harvest::config::load_config;
/// use prefix_harvest::crawler::{run_harvest, HarvestOptions};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let stats = run_harvest(config, HarvestOptions::default()).await?;
/// println!("{} records", stats.records);
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(
    config: Config,
    options: HarvestOptions,
) -> Result<RunStatistics, HarvestError> {
    let harvester = Harvester::new(config, options)?;
    harvester.run().await
}
