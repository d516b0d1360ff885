//! Adaptive prefix expansion over a truncating autocomplete endpoint
//!
//! The autocomplete endpoint returns at most `threshold` names for a prefix
//! and silently drops the rest. A prefix whose answer reaches the threshold
//! is therefore presumed truncated and is split into its one-character
//! extensions; a prefix below the threshold is complete and never split.
//!
//! The walk is breadth-first over an explicit work queue, starting from the
//! empty prefix. It terminates because answers shrink as prefixes grow; the
//! depth and query caps only guard against an endpoint that misbehaves.

use crate::config::EnumerationConfig;
use crate::crawler::directory::RemoteDirectory;
use std::collections::{HashSet, VecDeque};

/// Something the enumeration could not complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumerationAnomaly {
    /// A truncated prefix sat at the depth cap and was not expanded
    DepthLimit { prefix: String, count: usize },

    /// The query cap stopped the walk with prefixes still pending
    QueryLimit { issued: usize, pending: usize },
}

impl std::fmt::Display for EnumerationAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DepthLimit { prefix, count } => write!(
                f,
                "prefix '{}' returned {} names at the depth limit and was not expanded",
                prefix, count
            ),
            Self::QueryLimit { issued, pending } => write!(
                f,
                "query limit reached after {} queries with {} prefixes pending",
                issued, pending
            ),
        }
    }
}

/// Result of an enumeration
#[derive(Debug, Clone, Default)]
pub struct ExpansionReport {
    /// Every distinct name returned, in discovery order
    pub names: Vec<String>,

    /// Autocomplete queries issued (cached or not)
    pub queries_issued: usize,

    /// Prefixes whose query failed after retries
    pub failed_prefixes: Vec<String>,

    pub anomalies: Vec<EnumerationAnomaly>,

    /// Length of the longest prefix queried
    pub max_depth_reached: usize,
}

impl ExpansionReport {
    /// True when every prefix was resolved
    pub fn is_complete(&self) -> bool {
        self.failed_prefixes.is_empty() && self.anomalies.is_empty()
    }
}

/// Enumerates every name reachable through a truncating autocomplete
///
/// Completeness assumes the endpoint truncates only at the threshold. An
/// endpoint that also cuts answers short for other reasons (payload size,
/// timeouts returning partial lists) can hide names below the threshold.
/// Names containing no character of the alphabet cannot be reached.
#[derive(Debug, Clone)]
pub struct PrefixExpander {
    alphabet: Vec<char>,
    threshold: usize,
    max_depth: usize,
    max_queries: usize,
}

impl PrefixExpander {
    /// Creates an expander with no practical depth or query cap
    pub fn new(alphabet: &str, threshold: usize) -> Self {
        Self {
            alphabet: alphabet.chars().collect(),
            threshold,
            max_depth: usize::MAX,
            max_queries: usize::MAX,
        }
    }

    pub fn from_config(config: &EnumerationConfig) -> Self {
        Self::new(&config.alphabet, config.truncation_threshold)
            .with_limits(config.max_depth, config.max_queries)
    }

    /// Sets the longest prefix queried and the total query budget
    pub fn with_limits(mut self, max_depth: usize, max_queries: usize) -> Self {
        self.max_depth = max_depth;
        self.max_queries = max_queries;
        self
    }

    /// Runs the enumeration against `directory`
    ///
    /// A failed prefix query is recorded in the report and the walk goes on;
    /// the branch below it is lost for this run and is retried on the next
    /// one, with every completed query answered from the cache.
    pub async fn expand(&self, directory: &RemoteDirectory) -> ExpansionReport {
        let mut report = ExpansionReport::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::from([String::new()]);

        tracing::info!(
            "Enumerating names over {} characters (truncation threshold {})",
            self.alphabet.len(),
            self.threshold
        );

        'walk: while let Some(prefix) = queue.pop_front() {
            for c in &self.alphabet {
                if report.queries_issued >= self.max_queries {
                    let anomaly = EnumerationAnomaly::QueryLimit {
                        issued: report.queries_issued,
                        pending: queue.len() + 1,
                    };
                    tracing::warn!("Enumeration stopped: {}", anomaly);
                    report.anomalies.push(anomaly);
                    break 'walk;
                }

                let candidate = format!("{}{}", prefix, c);
                let depth = candidate.chars().count();
                report.queries_issued += 1;
                report.max_depth_reached = report.max_depth_reached.max(depth);

                let names = match directory.suggest(&candidate).await {
                    Ok(names) => names,
                    Err(e) => {
                        tracing::warn!("Autocomplete for '{}' failed: {}", candidate, e);
                        report.failed_prefixes.push(candidate);
                        continue;
                    }
                };

                let count = names.len();
                for name in names {
                    let name = name.trim();
                    if name.is_empty() {
                        continue;
                    }
                    if name.contains(['\n', '\r']) {
                        tracing::warn!("Skipping name with a line break: {:?}", name);
                        continue;
                    }
                    if seen.insert(name.to_string()) {
                        report.names.push(name.to_string());
                    }
                }

                if count < self.threshold {
                    continue;
                }

                if depth >= self.max_depth {
                    let anomaly = EnumerationAnomaly::DepthLimit {
                        prefix: candidate,
                        count,
                    };
                    tracing::warn!("Enumeration anomaly: {}", anomaly);
                    report.anomalies.push(anomaly);
                } else {
                    tracing::trace!("'{}' truncated at {} names, expanding", candidate, count);
                    queue.push_back(candidate);
                }
            }

            tracing::debug!(
                "Expanded '{}': {} names, {} queries, {} prefixes pending",
                prefix,
                report.names.len(),
                report.queries_issued,
                queue.len()
            );
        }

        tracing::info!(
            "Enumeration finished: {} names from {} queries (max depth {})",
            report.names.len(),
            report.queries_issued,
            report.max_depth_reached
        );

        report
    }
}
