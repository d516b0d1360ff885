//! Search, link deduplication and detail extraction
//!
//! The crawl runs in two stages so that the discovered links can be saved
//! between them:
//!
//! 1. [`SearchCrawler::collect_links`] searches every name and gathers the
//!    distinct entry links from the listings
//! 2. [`SearchCrawler::crawl_links`] fetches each distinct entry once and
//!    extracts its record
//!
//! Deduplication is by entry key, in both stages. The sets are owned by the
//! crawler and only touched by the task driving it, also when detail pages
//! are fetched by several workers.

use crate::crawler::directory::RemoteDirectory;
use crate::crawler::parser::{EntryLink, ListingParser};
use crate::record::{Record, RecordExtractor};
use crate::HarvestError;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;

/// Result of the search stage
#[derive(Debug, Clone, Default)]
pub struct LinkReport {
    /// Distinct entry links, in discovery order
    pub links: Vec<EntryLink>,

    pub names_searched: usize,

    /// Searches whose listing had no results
    pub empty_searches: usize,

    /// Names whose search failed after retries
    pub failed_searches: Vec<String>,

    /// Links skipped because their entry was already found
    pub duplicate_links: usize,
}

/// Result of the detail stage
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub records: Vec<Record>,

    /// Detail fetches attempted
    pub details_fetched: usize,

    /// Entry keys whose page had no extractable record
    pub not_found: Vec<String>,

    /// Entry URLs whose fetch failed after retries
    pub failed_details: Vec<String>,

    /// Links skipped because their entry was already crawled
    pub duplicate_links: usize,

    /// The search stage, when run through [`SearchCrawler::run`]
    pub search: Option<LinkReport>,
}

/// Turns names into records, one per distinct entry
pub struct SearchCrawler {
    directory: Arc<RemoteDirectory>,
    parser: ListingParser,
    extractor: Arc<dyn RecordExtractor>,
    workers: usize,
    discovered: HashSet<String>,
    crawled: HashSet<String>,
}

impl SearchCrawler {
    pub fn new(
        directory: Arc<RemoteDirectory>,
        parser: ListingParser,
        extractor: Arc<dyn RecordExtractor>,
    ) -> Self {
        Self {
            directory,
            parser,
            extractor,
            workers: 1,
            discovered: HashSet::new(),
            crawled: HashSet::new(),
        }
    }

    /// Sets the number of concurrent detail fetches
    ///
    /// With more than one worker, records come out in completion order.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Searches every name, then crawls the distinct links found
    pub async fn run(&mut self, names: &[String]) -> Result<CrawlReport, HarvestError> {
        let search = self.collect_links(names).await?;
        let mut report = self.crawl_links(&search.links).await;
        report.search = Some(search);
        Ok(report)
    }

    /// Searches every name and collects the distinct entry links
    ///
    /// A failed search is recorded and the next name is searched. A listing
    /// without results is normal: many names share a listing with others.
    ///
    /// The session is prepared before the first search; failing to prepare
    /// it is the only error returned.
    pub async fn collect_links(&mut self, names: &[String]) -> Result<LinkReport, HarvestError> {
        let mut report = LinkReport::default();
        if names.is_empty() {
            return Ok(report);
        }

        self.directory.prepare().await?;
        let base_url = self.directory.endpoints().search.clone();

        for (i, name) in names.iter().enumerate() {
            report.names_searched += 1;

            let listing = match self.directory.search(name).await {
                Ok(fetched) => fetched.payload,
                Err(e) => {
                    tracing::warn!("Search for '{}' failed: {}", name, e);
                    report.failed_searches.push(name.clone());
                    continue;
                }
            };

            let links = self.parser.parse(&listing, &base_url);
            if links.is_empty() {
                tracing::info!("No results for '{}'", name);
                report.empty_searches += 1;
                continue;
            }

            for link in links {
                if self.discovered.insert(link.key.clone()) {
                    report.links.push(link);
                } else {
                    report.duplicate_links += 1;
                }
            }

            if (i + 1) % 100 == 0 {
                tracing::info!(
                    "Progress: {}/{} names searched, {} distinct entries",
                    i + 1,
                    names.len(),
                    report.links.len()
                );
            }
        }

        tracing::info!(
            "Search finished: {} names, {} distinct entries, {} failed searches",
            report.names_searched,
            report.links.len(),
            report.failed_searches.len()
        );

        Ok(report)
    }

    /// Fetches and extracts each distinct entry of `links` once
    ///
    /// Entries already crawled by this crawler are skipped. A page without a
    /// record and a failed fetch are both recorded; neither stops the crawl.
    pub async fn crawl_links(&mut self, links: &[EntryLink]) -> CrawlReport {
        let mut report = CrawlReport::default();

        let mut pending = Vec::new();
        for link in links {
            if self.crawled.insert(link.key.clone()) {
                pending.push(link.clone());
            } else {
                report.duplicate_links += 1;
            }
        }

        let total = pending.len();
        let directory = self.directory.as_ref();
        let extractor = self.extractor.as_ref();

        let mut outcomes = stream::iter(pending)
            .map(move |link| async move {
                let result = directory.detail(&link.url).await;
                (link, result)
            })
            .buffer_unordered(self.workers);

        while let Some((link, result)) = outcomes.next().await {
            report.details_fetched += 1;

            match result {
                Ok(fetched) => match extractor.extract(&fetched.payload, &link) {
                    Some(record) => report.records.push(record),
                    None => {
                        tracing::info!("No record on detail page {}", link.url);
                        report.not_found.push(link.key.clone());
                    }
                },
                Err(e) => {
                    tracing::warn!("Detail fetch for {} failed: {}", link.url, e);
                    report.failed_details.push(link.url.to_string());
                }
            }

            if report.details_fetched % 100 == 0 {
                tracing::info!(
                    "Progress: {}/{} entries crawled, {} records",
                    report.details_fetched,
                    total,
                    report.records.len()
                );
            }
        }

        tracing::info!(
            "Crawl finished: {} records from {} entries ({} without record, {} failed)",
            report.records.len(),
            report.details_fetched,
            report.not_found.len(),
            report.failed_details.len()
        );

        report
    }
}
