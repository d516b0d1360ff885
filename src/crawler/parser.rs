//! HTML parsing for search listings and the search form
//!
//! This module handles parsing HTML content to extract:
//! - Entry links from a search listing (results table, link cells)
//! - The fields of the search form (hidden inputs, selects)

use crate::config::SiteConfig;
use crate::url::{entry_key, normalize_url};
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A link to one entry's detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLink {
    /// Display name from the listing, if known
    pub name: Option<String>,

    /// Absolute URL of the detail page
    pub url: Url,

    /// Dedup key: the entry id parameter when present, else the normalized URL
    pub key: String,
}

impl EntryLink {
    /// Creates a link and computes its dedup key
    pub fn new(name: Option<String>, url: Url, id_param: Option<&str>) -> Self {
        let key = match normalize_url(url.as_str()) {
            Ok(normalized) => entry_key(&normalized, id_param),
            Err(_) => url.to_string(),
        };

        Self { name, url, key }
    }
}

/// Parses a CSS selector, reporting failures as configuration errors
pub fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

/// Extracts entry links from search listings
pub struct ListingParser {
    results: Selector,
    link: Selector,
    id_param: Option<String>,
}

impl ListingParser {
    pub fn new(site: &SiteConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            results: parse_selector(&site.results_selector)?,
            link: parse_selector(&site.result_link_selector)?,
            id_param: site.entry_id_param.clone(),
        })
    }

    /// Parses a search listing and extracts its entry links
    ///
    /// A listing without a results table has no entries: an empty list is
    /// returned, never an error. Links are resolved against `base_url`, the
    /// URL the listing was served from.
    ///
    /// # Arguments
    ///
    /// * `html` - The listing HTML
    /// * `base_url` - The base URL for resolving relative links
    ///
    /// # Example
    ///
    /// ```
    /// use prefix_harvest::config::SiteConfig;
    /// use prefix_harvest::crawler::ListingParser;
    /// use url::Url;
    ///
    /// # fn site() -> SiteConfig {
    /// #     SiteConfig {
    /// #         base_url: "http://example.com/".to_string(),
    /// #         form_page: "list.aspx".to_string(),
    /// #         search_endpoint: "list.aspx".to_string(),
    /// #         autocomplete_endpoint: "ac".to_string(),
    /// #         autocomplete_key: "nom".to_string(),
    /// #         name_field: "txbNom".to_string(),
    /// #         form_selector: "form".to_string(),
    /// #         excluded_form_fields: vec![],
    /// #         results_selector: "table#GViewList".to_string(),
    /// #         result_link_selector: "tr > td > a".to_string(),
    /// #         entry_id_param: Some("id".to_string()),
    /// #     }
    /// # }
    /// let parser = ListingParser::new(&site()).unwrap();
    /// let html = r#"<table id="GViewList"><tr><td><a href="Fiche.aspx?id=7">Tremblay</a></td></tr></table>"#;
    /// let base = Url::parse("http://example.com/list.aspx").unwrap();
    ///
    /// let links = parser.parse(html, &base);
    /// assert_eq!(links[0].key, "id=7");
    /// ```
    pub fn parse(&self, html: &str, base_url: &Url) -> Vec<EntryLink> {
        let document = Html::parse_document(html);

        let Some(table) = document.select(&self.results).next() else {
            return Vec::new();
        };

        table
            .select(&self.link)
            .filter_map(|element| {
                let href = element.value().attr("href")?;
                let url = resolve_link(href, base_url)?;
                Some(EntryLink::new(
                    element_text(element),
                    url,
                    self.id_param.as_deref(),
                ))
            })
            .collect()
    }
}

/// Extracts the submittable fields of a form
///
/// Inputs contribute their `value` (empty when absent); selects contribute
/// their selected option, or their first option. Fields named in `excluded`
/// are dropped.
///
/// # Returns
///
/// * `Some(fields)` - The form was found
/// * `None` - No element matches `form_selector`
pub fn extract_form_fields(
    html: &str,
    form_selector: &Selector,
    excluded: &[String],
) -> Option<Vec<(String, String)>> {
    let document = Html::parse_document(html);
    let form = document.select(form_selector).next()?;

    let input = Selector::parse("input[name]").ok()?;
    let select = Selector::parse("select[name]").ok()?;
    let option = Selector::parse("option").ok()?;

    let mut fields = Vec::new();

    for element in form.select(&input) {
        let Some(name) = element.value().attr("name") else {
            continue;
        };
        let value = element.value().attr("value").unwrap_or_default();
        fields.push((name.to_string(), value.to_string()));
    }

    for element in form.select(&select) {
        let Some(name) = element.value().attr("name") else {
            continue;
        };
        let options: Vec<ElementRef<'_>> = element.select(&option).collect();
        let chosen = options
            .iter()
            .find(|o| o.value().attr("selected").is_some())
            .or_else(|| options.first());
        if let Some(chosen) = chosen {
            let value = chosen
                .value()
                .attr("value")
                .map(str::to_string)
                .unwrap_or_else(|| chosen.text().collect::<String>().trim().to_string());
            fields.push((name.to_string(), value));
        }
    }

    fields.retain(|(name, _)| !excluded.iter().any(|e| e == name));
    Some(fields)
}

/// Collapsed, trimmed text of an element; `None` when blank
fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url)
    } else {
        None
    }
}
