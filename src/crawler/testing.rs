//! In-process directory used by the crawler unit tests

use crate::config::SiteConfig;
use crate::crawler::fetcher::{SiteEndpoints, Transport};
use crate::HarvestError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

pub(crate) fn site_config() -> SiteConfig {
    SiteConfig {
        base_url: "http://directory.test/bottin/".to_string(),
        form_page: "list.aspx?lang=en".to_string(),
        search_endpoint: "list.aspx?lang=en".to_string(),
        autocomplete_endpoint: "default.aspx/GetListeNom".to_string(),
        autocomplete_key: "nom".to_string(),
        name_field: "txbNom".to_string(),
        form_selector: "form#form1".to_string(),
        excluded_form_fields: vec![],
        results_selector: "table#GViewList".to_string(),
        result_link_selector: "tr > td > a".to_string(),
        entry_id_param: Some("id".to_string()),
    }
}

pub(crate) fn endpoints() -> SiteEndpoints {
    SiteEndpoints::from_config(&site_config()).unwrap()
}

/// Listing page linking to `Fiche.aspx?id=<id>` for each (name, id)
pub(crate) fn listing(entries: &[(&str, u32)]) -> String {
    let rows: String = entries
        .iter()
        .map(|(name, id)| {
            format!(
                r#"<tr><td><a href="Fiche.aspx?id={}&amp;lang=en">{}</a></td></tr>"#,
                id, name
            )
        })
        .collect();
    format!(
        r#"<html><body><table id="GViewList">{}</table></body></html>"#,
        rows
    )
}

/// Detail page URL for an entry id, as resolved from [`listing`]
pub(crate) fn detail_url(id: u32) -> Url {
    Url::parse(&format!(
        "http://directory.test/bottin/Fiche.aspx?id={}&lang=en",
        id
    ))
    .unwrap()
}

pub(crate) fn detail_page(name: &str, permit: &str) -> String {
    format!(
        r#"<html><body><table id="fiche">
            <tr><th>Name</th><td>{}</td></tr>
            <tr><th>Permit number:</th><td>{}</td></tr>
        </table></body></html>"#,
        name, permit
    )
}

/// A directory whose autocomplete truncates at `threshold` results
pub(crate) struct FakeDirectory {
    threshold: usize,
    names: Vec<String>,
    listings: Mutex<HashMap<String, String>>,
    details: Mutex<HashMap<String, String>>,
    autocomplete_failure: Mutex<Option<(String, usize)>>,
    autocomplete_log: Mutex<Vec<String>>,
    search_log: Mutex<Vec<String>>,
    detail_log: Mutex<Vec<String>>,
}

impl FakeDirectory {
    pub(crate) fn new(threshold: usize) -> Self {
        Self::with_names(threshold, &[])
    }

    pub(crate) fn with_names(threshold: usize, names: &[&str]) -> Self {
        let mut names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        names.sort();
        Self {
            threshold,
            names,
            listings: Mutex::new(HashMap::new()),
            details: Mutex::new(HashMap::new()),
            autocomplete_failure: Mutex::new(None),
            autocomplete_log: Mutex::new(Vec::new()),
            search_log: Mutex::new(Vec::new()),
            detail_log: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn add_listing(&self, name: &str, html: &str) {
        self.listings
            .lock()
            .unwrap()
            .insert(name.to_string(), html.to_string());
    }

    pub(crate) fn add_detail(&self, url: &Url, html: &str) {
        self.details
            .lock()
            .unwrap()
            .insert(url.to_string(), html.to_string());
    }

    /// Answers the next `times` autocomplete calls with `payload`
    pub(crate) fn fail_autocomplete_with(&self, payload: &str, times: usize) {
        *self.autocomplete_failure.lock().unwrap() = Some((payload.to_string(), times));
    }

    pub(crate) fn autocomplete_calls(&self) -> Vec<String> {
        self.autocomplete_log.lock().unwrap().clone()
    }

    pub(crate) fn search_calls(&self) -> Vec<String> {
        self.search_log.lock().unwrap().clone()
    }

    pub(crate) fn detail_calls(&self) -> Vec<String> {
        self.detail_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeDirectory {
    async fn autocomplete(&self, prefix: &str) -> Result<String, HarvestError> {
        self.autocomplete_log.lock().unwrap().push(prefix.to_string());

        if let Some((payload, remaining)) = self.autocomplete_failure.lock().unwrap().as_mut() {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(payload.clone());
            }
        }

        let matching: Vec<&String> = self
            .names
            .iter()
            .filter(|n| n.starts_with(prefix))
            .take(self.threshold)
            .collect();
        Ok(serde_json::json!({ "d": matching }).to_string())
    }

    async fn search(&self, name: &str) -> Result<String, HarvestError> {
        self.search_log.lock().unwrap().push(name.to_string());
        Ok(self
            .listings
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| "<html><body><p>No results</p></body></html>".to_string()))
    }

    async fn detail(&self, url: &Url) -> Result<String, HarvestError> {
        self.detail_log.lock().unwrap().push(url.to_string());
        self.details
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| HarvestError::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
    }
}
