use serde::Deserialize;

/// Main configuration structure for Prefix-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub enumeration: EnumerationConfig,
    #[serde(rename = "rate-limit", default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub record: RecordConfig,
}

/// Remote directory layout
///
/// Endpoint paths are resolved against `base_url`.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Root of the directory site
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Page hosting the search form (hidden fields are read from it)
    #[serde(rename = "form-page")]
    pub form_page: String,

    /// Endpoint the search form posts to
    #[serde(rename = "search-endpoint")]
    pub search_endpoint: String,

    /// JSON autocomplete endpoint
    #[serde(rename = "autocomplete-endpoint")]
    pub autocomplete_endpoint: String,

    /// Key of the prefix in the autocomplete JSON body
    #[serde(rename = "autocomplete-key", default = "default_autocomplete_key")]
    pub autocomplete_key: String,

    /// Form field receiving the searched name
    #[serde(rename = "name-field")]
    pub name_field: String,

    /// CSS selector of the search form on the form page
    #[serde(rename = "form-selector", default = "default_form_selector")]
    pub form_selector: String,

    /// Form fields dropped before submitting a search
    #[serde(rename = "excluded-form-fields", default)]
    pub excluded_form_fields: Vec<String>,

    /// CSS selector of the results table in a search listing
    #[serde(rename = "results-selector")]
    pub results_selector: String,

    /// CSS selector of entry links inside the results table
    #[serde(rename = "result-link-selector", default = "default_result_link_selector")]
    pub result_link_selector: String,

    /// Query parameter that identifies an entry in its detail URL
    #[serde(rename = "entry-id-param", default)]
    pub entry_id_param: Option<String>,
}

/// Prefix enumeration behavior
#[derive(Debug, Clone, Deserialize)]
pub struct EnumerationConfig {
    /// Characters a prefix is extended with
    #[serde(default = "default_alphabet")]
    pub alphabet: String,

    /// Result count at which the autocomplete endpoint truncates
    #[serde(rename = "truncation-threshold", default = "default_truncation_threshold")]
    pub truncation_threshold: usize,

    /// Longest prefix the enumerator will expand
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: usize,

    /// Upper bound on autocomplete queries in one enumeration
    #[serde(rename = "max-queries", default = "default_max_queries")]
    pub max_queries: usize,
}

/// Delays applied before uncached remote calls (milliseconds)
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Lower bound of the search/detail delay
    #[serde(rename = "search-min-delay", default = "default_search_min_delay")]
    pub search_min_delay: u64,

    /// Upper bound of the search/detail delay
    #[serde(rename = "search-max-delay", default = "default_search_max_delay")]
    pub search_max_delay: u64,

    /// Jitter values picked from before each autocomplete call
    #[serde(rename = "autocomplete-delays", default = "default_autocomplete_delays")]
    pub autocomplete_delays: Vec<u64>,
}

/// HTTP behavior
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Connect timeout (seconds)
    #[serde(rename = "connect-timeout", default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Retries after the first attempt of a transient failure
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff before the first retry, doubled per attempt (milliseconds)
    #[serde(rename = "retry-base-delay", default = "default_retry_base_delay")]
    pub retry_base_delay: u64,

    /// Concurrent detail page fetches
    #[serde(rename = "detail-workers", default = "default_detail_workers")]
    pub detail_workers: usize,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Response cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Path to the SQLite cache file
    #[serde(rename = "database-path", default = "default_cache_path")]
    pub database_path: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Newline-delimited list of enumerated names
    #[serde(rename = "names-path")]
    pub names_path: String,

    /// Newline-delimited list of discovered entry links
    #[serde(rename = "links-path")]
    pub links_path: String,

    /// CSV file receiving the extracted records
    #[serde(rename = "records-path")]
    pub records_path: String,
}

/// Detail page extraction rules
#[derive(Debug, Clone, Deserialize)]
pub struct RecordConfig {
    /// CSS selector of the table holding entry fields
    #[serde(rename = "table-selector", default = "default_table_selector")]
    pub table_selector: String,

    /// Row labels to keep, in output column order
    #[serde(default)]
    pub fields: Vec<FieldMapping>,
}

/// Maps a detail table row label to an output column
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMapping {
    pub label: String,
    pub column: String,
}

impl Default for EnumerationConfig {
    fn default() -> Self {
        Self {
            alphabet: default_alphabet(),
            truncation_threshold: default_truncation_threshold(),
            max_depth: default_max_depth(),
            max_queries: default_max_queries(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            search_min_delay: default_search_min_delay(),
            search_max_delay: default_search_max_delay(),
            autocomplete_delays: default_autocomplete_delays(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            max_retries: default_max_retries(),
            retry_base_delay: default_retry_base_delay(),
            detail_workers: default_detail_workers(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_path: default_cache_path(),
        }
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            table_selector: default_table_selector(),
            fields: Vec::new(),
        }
    }
}

fn default_autocomplete_key() -> String {
    "nom".to_string()
}

fn default_form_selector() -> String {
    "form".to_string()
}

fn default_result_link_selector() -> String {
    "tr > td > a".to_string()
}

fn default_alphabet() -> String {
    "abcdefghijklmnopqrstuvwxyz-".to_string()
}

fn default_truncation_threshold() -> usize {
    10
}

fn default_max_depth() -> usize {
    32
}

fn default_max_queries() -> usize {
    100_000
}

fn default_search_min_delay() -> u64 {
    1000
}

fn default_search_max_delay() -> u64 {
    3000
}

fn default_autocomplete_delays() -> Vec<u64> {
    vec![300, 500, 700]
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay() -> u64 {
    2000
}

fn default_detail_workers() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_cache_path() -> String {
    "./harvest-cache.db".to_string()
}

fn default_table_selector() -> String {
    "table".to_string()
}
