//! The remote directory as seen by the harvest
//!
//! [`RemoteDirectory`] composes the transport with the cache-aside fetcher,
//! the rate limiters and the retry policy. Every call goes through the same
//! layers in the same order:
//!
//! 1. Cache lookup by request identity; a hit returns without waiting
//! 2. Rate limit wait
//! 3. Remote call through the transport
//! 4. Retry from step 2 on a transient failure
//! 5. Store the payload once it is known to be good

use crate::cache::{CacheAsideFetcher, CacheStore, FetchStats, Fetched};
use crate::config::Config;
use crate::crawler::fetcher::{SiteEndpoints, Transport};
use crate::crawler::rate_limiter::{DelayProfile, RateLimiter};
use crate::crawler::retry::RetryPolicy;
use crate::url::RequestIdentity;
use crate::HarvestError;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use url::Url;

/// Autocomplete response body: `{"d": ["name", ...]}`
#[derive(Debug, Deserialize)]
struct Suggestions {
    d: Vec<String>,
}

/// Parses an autocomplete payload
///
/// A payload that is not the expected JSON shape is a `MalformedPayload`
/// error, which is retryable: the endpoint occasionally answers with an
/// error page instead of JSON.
pub fn parse_suggestions(payload: &str, endpoint: &str) -> Result<Vec<String>, HarvestError> {
    serde_json::from_str::<Suggestions>(payload)
        .map(|s| s.d)
        .map_err(|e| HarvestError::MalformedPayload {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
}

/// Cached, rate-limited, retrying access to the directory
pub struct RemoteDirectory {
    transport: Arc<dyn Transport>,
    endpoints: SiteEndpoints,
    fetcher: CacheAsideFetcher,
    autocomplete_limiter: Arc<RateLimiter>,
    search_limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    autocomplete_key: String,
    name_field: String,
    excluded_form_fields: Vec<String>,
}

impl RemoteDirectory {
    /// Creates a directory with no rate limiting and no retries
    ///
    /// Use the `with_*` methods, or [`RemoteDirectory::from_config`], for
    /// anything talking to a real site.
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoints: SiteEndpoints,
        fetcher: CacheAsideFetcher,
    ) -> Self {
        Self {
            transport,
            endpoints,
            fetcher,
            autocomplete_limiter: Arc::new(RateLimiter::unlimited()),
            search_limiter: Arc::new(RateLimiter::unlimited()),
            retry: RetryPolicy::none(),
            autocomplete_key: "nom".to_string(),
            name_field: "name".to_string(),
            excluded_form_fields: Vec::new(),
        }
    }

    /// Creates a directory wired as the configuration describes
    pub fn from_config(
        config: &Config,
        transport: Arc<dyn Transport>,
        store: Option<Box<dyn CacheStore>>,
    ) -> Result<Self, HarvestError> {
        let endpoints = SiteEndpoints::from_config(&config.site)?;

        Ok(Self::new(transport, endpoints, CacheAsideFetcher::new(store))
            .with_limiters(
                Arc::new(RateLimiter::new(DelayProfile::autocomplete(&config.rate_limit))),
                Arc::new(RateLimiter::new(DelayProfile::search(&config.rate_limit))),
            )
            .with_retry(RetryPolicy::from_config(&config.fetch))
            .with_keys(&config.site.autocomplete_key, &config.site.name_field)
            .with_excluded_form_fields(&config.site.excluded_form_fields))
    }

    /// Sets the limiters for autocomplete calls and for search/detail calls
    pub fn with_limiters(
        mut self,
        autocomplete: Arc<RateLimiter>,
        search: Arc<RateLimiter>,
    ) -> Self {
        self.autocomplete_limiter = autocomplete;
        self.search_limiter = search;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the parameter names used in request identities
    pub fn with_keys(mut self, autocomplete_key: &str, name_field: &str) -> Self {
        self.autocomplete_key = autocomplete_key.to_string();
        self.name_field = name_field.to_string();
        self
    }

    /// Sets the form fields left out of searches
    ///
    /// They are part of the search identity: listings cached under one
    /// exclusion list are not replayed under another.
    pub fn with_excluded_form_fields(mut self, fields: &[String]) -> Self {
        let mut fields = fields.to_vec();
        fields.sort();
        fields.dedup();
        self.excluded_form_fields = fields;
        self
    }

    pub fn endpoints(&self) -> &SiteEndpoints {
        &self.endpoints
    }

    pub fn fetch_stats(&self) -> FetchStats {
        self.fetcher.stats()
    }

    pub fn autocomplete_limiter(&self) -> &RateLimiter {
        &self.autocomplete_limiter
    }

    pub fn search_limiter(&self) -> &RateLimiter {
        &self.search_limiter
    }

    /// Prepares the transport session
    ///
    /// Counts as a search-class remote call: it waits and is retried. Once
    /// the transport is prepared this returns at once, without waiting.
    pub async fn prepare(&self) -> Result<(), HarvestError> {
        if self.transport.is_prepared() {
            return Ok(());
        }

        let transport = &self.transport;
        self.remote(&self.search_limiter, "search form", move || async move {
            transport.prepare().await
        })
        .await
    }

    /// Names the autocomplete endpoint returns for `prefix`
    ///
    /// The payload is validated before it is cached, so a malformed answer is
    /// retried and never poisons the cache.
    pub async fn suggest(&self, prefix: &str) -> Result<Vec<String>, HarvestError> {
        let endpoint = self.endpoints.autocomplete.as_str();
        let identity = RequestIdentity::builder("POST", endpoint)
            .param(&self.autocomplete_key, prefix)
            .build();

        let transport = &self.transport;
        let what = format!("autocomplete '{}'", prefix);
        let fetched = self
            .fetcher
            .fetch(&identity, || {
                self.remote(&self.autocomplete_limiter, &what, move || async move {
                    let payload = transport.autocomplete(prefix).await?;
                    parse_suggestions(&payload, endpoint)?;
                    Ok(payload)
                })
            })
            .await?;

        parse_suggestions(&fetched.payload, endpoint)
    }

    /// Search listing for an exact name
    ///
    /// A search that misses the cache prepares the session first, so the
    /// form page load gets its own wait instead of riding on the search's.
    pub async fn search(&self, name: &str) -> Result<Fetched, HarvestError> {
        let identity = self.search_identity(name);

        let transport = &self.transport;
        let what = format!("search '{}'", name);
        self.fetcher
            .fetch(&identity, || async {
                self.prepare().await?;
                self.remote(&self.search_limiter, &what, move || async move {
                    transport.search(name).await
                })
                .await
            })
            .await
    }

    fn search_identity(&self, name: &str) -> RequestIdentity {
        self.excluded_form_fields
            .iter()
            .fold(
                RequestIdentity::builder("POST", self.endpoints.search.as_str())
                    .param(&self.name_field, name),
                |builder, field| builder.param("excluded", field),
            )
            .build()
    }

    /// Detail page of an entry
    pub async fn detail(&self, url: &Url) -> Result<Fetched, HarvestError> {
        let identity = RequestIdentity::get(url.as_str());

        let transport = &self.transport;
        let what = format!("detail {}", url);
        self.fetcher
            .fetch(&identity, || {
                self.remote(&self.search_limiter, &what, move || async move {
                    transport.detail(url).await
                })
            })
            .await
    }

    /// One remote call: wait, call, retry transient failures
    async fn remote<T, F, Fut>(
        &self,
        limiter: &RateLimiter,
        what: &str,
        call: F,
    ) -> Result<T, HarvestError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, HarvestError>>,
    {
        let call = &call;
        self.retry
            .run(what, move || async move {
                limiter.wait().await;
                call().await
            })
            .await
    }
}
