//! Run statistics
//!
//! This module provides functionality for aggregating and displaying
//! the statistics of a harvest run and of the response cache.

use crate::cache::{CacheSummary, FetchStats};
use std::time::Duration;

/// Harvest run statistics summary
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    /// Distinct names enumerated (or loaded from the names list)
    pub names: usize,

    /// Whether the names came from a saved list
    pub names_resumed: bool,

    /// Autocomplete queries issued by the enumeration
    pub queries_issued: usize,

    /// Prefixes whose autocomplete query failed
    pub failed_prefixes: usize,

    /// Enumeration anomalies (depth or query caps hit)
    pub anomalies: usize,

    /// Distinct entry links found (or loaded from the links list)
    pub links: usize,

    /// Whether the links came from a saved list
    pub links_resumed: bool,

    /// Searches that failed
    pub failed_searches: usize,

    /// Records extracted and written
    pub records: usize,

    /// Detail pages without a record
    pub not_found: usize,

    /// Detail fetches that failed
    pub failed_details: usize,

    /// Cache-aside counters
    pub fetch: FetchStats,

    /// Rate limit waits performed
    pub waits: u64,

    /// Total time spent in rate limit waits
    pub waited: Duration,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl RunStatistics {
    /// Share of calls answered from the cache, in percent
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.fetch.hits + self.fetch.misses;
        if total > 0 {
            (self.fetch.hits as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Failed units of work of any kind
    pub fn failures(&self) -> usize {
        self.failed_prefixes + self.failed_searches + self.failed_details
    }
}

/// Prints run statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Enumeration:");
    if stats.names_resumed {
        println!("  Names: {} (loaded from saved list)", stats.names);
    } else {
        println!("  Names: {}", stats.names);
        println!("  Autocomplete queries: {}", stats.queries_issued);
        println!("  Failed prefixes: {}", stats.failed_prefixes);
        println!("  Anomalies: {}", stats.anomalies);
    }
    println!();

    println!("Search:");
    if stats.links_resumed {
        println!("  Entries: {} (loaded from saved list)", stats.links);
    } else {
        println!("  Entries: {}", stats.links);
        println!("  Failed searches: {}", stats.failed_searches);
    }
    println!();

    println!("Records:");
    println!("  Extracted: {}", stats.records);
    println!("  Without record: {}", stats.not_found);
    println!("  Failed fetches: {}", stats.failed_details);
    println!();

    println!("Remote calls:");
    println!(
        "  Cache hits: {} / misses: {} ({:.1}% hit rate)",
        stats.fetch.hits,
        stats.fetch.misses,
        stats.cache_hit_rate()
    );
    if stats.fetch.store_errors > 0 {
        println!("  Cache errors: {}", stats.fetch.store_errors);
    }
    println!(
        "  Rate limit waits: {} ({:.1}s total)",
        stats.waits,
        stats.waited.as_secs_f64()
    );
    println!();

    println!(
        "Completed in {:.1}s with {} failures",
        stats.elapsed.as_secs_f64(),
        stats.failures()
    );
}

/// Prints a cache summary to stdout
pub fn print_cache_summary(summary: &CacheSummary) {
    println!("=== Cache Statistics ===\n");

    println!("Overview:");
    println!("  Cached responses: {}", summary.entries);
    if let (Some(oldest), Some(newest)) = (&summary.oldest, &summary.newest) {
        println!("  Oldest: {}", oldest);
        println!("  Newest: {}", newest);
    }
    println!();

    if !summary.by_endpoint.is_empty() {
        println!("By Endpoint:");
        let mut endpoint_counts: Vec<_> = summary.by_endpoint.iter().collect();
        endpoint_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (endpoint, count) in endpoint_counts {
            let percentage = if summary.entries > 0 {
                (*count as f64 / summary.entries as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", endpoint, count, percentage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hit_rate() {
        let stats = RunStatistics {
            fetch: FetchStats {
                hits: 75,
                misses: 25,
                stores: 25,
                store_errors: 0,
            },
            ..Default::default()
        };
        assert!((stats.cache_hit_rate() - 75.0).abs() < f64::EPSILON);

        assert_eq!(RunStatistics::default().cache_hit_rate(), 0.0);
    }

    #[test]
    fn test_failures_sum_all_stages() {
        let stats = RunStatistics {
            failed_prefixes: 1,
            failed_searches: 2,
            failed_details: 3,
            ..Default::default()
        };
        assert_eq!(stats.failures(), 6);
    }
}
