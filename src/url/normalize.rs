use crate::UrlError;
use url::Url;

/// Query parameters that never distinguish one entry from another
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "ref",
];

/// Normalizes an entry URL so that equivalent links compare equal
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not HTTP(S)
/// 2. Lowercase the host
/// 3. Remove dot segments and repeated slashes from the path
/// 4. Remove the fragment
/// 5. Remove tracking query parameters
/// 6. Sort remaining query parameters by key
/// 7. Remove an empty query string
///
/// The scheme and a trailing slash are preserved: directory sites often
/// serve plain HTTP and treat `/a` and `/a/` as different resources.
///
/// # Examples
///
/// ```
/// use prefix_harvest::url::normalize_url;
///
/// let url = normalize_url("http://Directory.EXAMPLE.com/bottin/./Fiche.aspx?lang=en&id=7#top").unwrap();
/// assert_eq!(url.as_str(), "http://directory.example.com/bottin/Fiche.aspx?id=7&lang=en");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url.host_str().ok_or(UrlError::MissingHost)?.to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Returns the dedup key of an entry URL
///
/// When `id_param` is set and present in the URL, its value is the key: the
/// same entry is often linked with different auxiliary parameters. Otherwise
/// the normalized URL is the key.
pub fn entry_key(url: &Url, id_param: Option<&str>) -> String {
    if let Some(param) = id_param {
        if let Some((_, value)) = url.query_pairs().find(|(k, _)| k == param) {
            if !value.is_empty() {
                return format!("{}={}", param, value);
            }
        }
    }

    match normalize_url(url.as_str()) {
        Ok(normalized) => normalized.to_string(),
        Err(_) => url.to_string(),
    }
}

/// Normalizes a URL path by removing dot segments and repeated slashes
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let trailing_slash = path.len() > 1 && path.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", segments.join("/"));
    if trailing_slash {
        result.push('/');
    }
    result
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
