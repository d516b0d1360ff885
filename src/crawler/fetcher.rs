//! HTTP transport for the remote directory
//!
//! This module handles all HTTP requests of the harvest, including:
//! - Building HTTP clients with proper user agent strings and timeouts
//! - Loading the search form once per session (hidden fields, cookies)
//! - Autocomplete, search and detail requests
//! - Error classification into retryable and permanent failures

use crate::config::{Config, FetchConfig, SiteConfig, UserAgentConfig};
use crate::crawler::parser::{extract_form_fields, parse_selector};
use crate::{ConfigError, HarvestError};
use async_trait::async_trait;
use reqwest::{Client, Response};
use scraper::Selector;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

/// Remote calls the harvest depends on
///
/// Every method performs exactly one remote call and returns the raw payload.
/// Caching, rate limiting and retries are layered on top by the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Prepares the session before the first search (e.g. loads the form)
    async fn prepare(&self) -> Result<(), HarvestError> {
        Ok(())
    }

    /// Whether [`Transport::prepare`] has nothing left to do
    ///
    /// A transport without session state is always prepared.
    fn is_prepared(&self) -> bool {
        true
    }

    /// Queries the autocomplete endpoint with a name prefix
    async fn autocomplete(&self, prefix: &str) -> Result<String, HarvestError>;

    /// Submits the search form for an exact name
    async fn search(&self, name: &str) -> Result<String, HarvestError>;

    /// Fetches an entry's detail page
    async fn detail(&self, url: &Url) -> Result<String, HarvestError>;
}

/// Absolute URLs of the directory endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteEndpoints {
    pub base: Url,
    pub form_page: Url,
    pub search: Url,
    pub autocomplete: Url,
}

impl SiteEndpoints {
    /// Resolves the configured endpoint paths against the base URL
    pub fn from_config(config: &SiteConfig) -> Result<Self, ConfigError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let join = |path: &str| {
            base.join(path)
                .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", path, e)))
        };

        Ok(Self {
            form_page: join(&config.form_page)?,
            search: join(&config.search_endpoint)?,
            autocomplete: join(&config.autocomplete_endpoint)?,
            base,
        })
    }
}

/// Builds an HTTP client with proper configuration
///
/// Cookies are kept for the whole session: the search form only accepts
/// submissions that carry the cookies set when the form was loaded.
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `fetch` - Timeouts
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    fetch: &FetchConfig,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        user_agent.crawler_name,
        user_agent.crawler_version,
        user_agent.contact_url,
        user_agent.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(fetch.timeout))
        .connect_timeout(Duration::from_secs(fetch.connect_timeout))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Transport over reqwest for an ASP.NET-style directory site
pub struct HttpTransport {
    client: Client,
    endpoints: SiteEndpoints,
    form_selector: Selector,
    excluded_form_fields: Vec<String>,
    name_field: String,
    autocomplete_key: String,

    /// Search form fields, harvested once from the form page
    form_fields: OnceCell<Vec<(String, String)>>,
}

impl HttpTransport {
    /// Creates a transport from the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(HttpTransport)` - Client built and endpoints resolved
    /// * `Err(HarvestError)` - Invalid site configuration or client failure
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.user_agent, &config.fetch)?;
        Self::with_client(client, &config.site)
    }

    /// Creates a transport around an existing client
    pub fn with_client(client: Client, site: &SiteConfig) -> Result<Self, HarvestError> {
        Ok(Self {
            client,
            endpoints: SiteEndpoints::from_config(site)?,
            form_selector: parse_selector(&site.form_selector)?,
            excluded_form_fields: site.excluded_form_fields.clone(),
            name_field: site.name_field.clone(),
            autocomplete_key: site.autocomplete_key.clone(),
            form_fields: OnceCell::new(),
        })
    }

    pub fn endpoints(&self) -> &SiteEndpoints {
        &self.endpoints
    }

    /// Returns the search form fields, loading the form page on first use
    async fn form_fields(&self) -> Result<&[(String, String)], HarvestError> {
        let fields = self
            .form_fields
            .get_or_try_init(|| self.load_form_fields())
            .await?;
        Ok(fields.as_slice())
    }

    async fn load_form_fields(&self) -> Result<Vec<(String, String)>, HarvestError> {
        let url = &self.endpoints.form_page;
        tracing::debug!("Loading search form from {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_send_error(url, e))?;
        let body = read_body(response, url).await?;

        let fields = extract_form_fields(&body, &self.form_selector, &self.excluded_form_fields)
            .ok_or_else(|| HarvestError::HtmlParse {
                url: url.to_string(),
                message: "search form not found".to_string(),
            })?;

        tracing::info!("Search form loaded ({} fields)", fields.len());
        Ok(fields)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn prepare(&self) -> Result<(), HarvestError> {
        self.form_fields().await.map(|_| ())
    }

    fn is_prepared(&self) -> bool {
        self.form_fields.initialized()
    }

    async fn autocomplete(&self, prefix: &str) -> Result<String, HarvestError> {
        let url = &self.endpoints.autocomplete;

        let mut body = serde_json::Map::new();
        body.insert(
            self.autocomplete_key.clone(),
            serde_json::Value::String(prefix.to_string()),
        );

        let response = self
            .client
            .post(url.clone())
            .header("X-Requested-With", "XMLHttpRequest")
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_send_error(url, e))?;

        read_body(response, url).await
    }

    async fn search(&self, name: &str) -> Result<String, HarvestError> {
        let url = &self.endpoints.search;

        let mut form: Vec<(String, String)> = self
            .form_fields()
            .await?
            .iter()
            .filter(|(key, _)| key != &self.name_field)
            .cloned()
            .collect();
        form.push((self.name_field.clone(), name.to_string()));

        let response = self
            .client
            .post(url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| classify_send_error(url, e))?;

        read_body(response, url).await
    }

    async fn detail(&self, url: &Url) -> Result<String, HarvestError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_send_error(url, e))?;

        read_body(response, url).await
    }
}

/// Maps a send failure to a harvest error
fn classify_send_error(url: &Url, error: reqwest::Error) -> HarvestError {
    if error.is_timeout() {
        HarvestError::Timeout {
            url: url.to_string(),
        }
    } else {
        HarvestError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

/// Reads the body of a successful response
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | body text |
/// | 429, 5xx | `HttpStatus`, retryable |
/// | other | `HttpStatus`, permanent |
async fn read_body(response: Response, url: &Url) -> Result<String, HarvestError> {
    let status = response.status();
    if !status.is_success() {
        return Err(HarvestError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response
        .text()
        .await
        .map_err(|e| classify_send_error(url, e))
}
