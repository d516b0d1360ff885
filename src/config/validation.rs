use crate::config::types::{
    CacheConfig, Config, EnumerationConfig, FetchConfig, OutputConfig, RateLimitConfig,
    RecordConfig, SiteConfig, UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Columns every record carries ahead of the extracted fields
const RESERVED_COLUMNS: &[&str] = &["id", "name", "url"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_enumeration_config(&config.enumeration)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_fetch_config(&config.fetch)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_cache_config(&config.cache)?;
    validate_output_config(&config.output)?;
    validate_record_config(&config.record)?;
    Ok(())
}

/// Validates the remote site layout
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            config.base_url
        )));
    }

    for (key, endpoint) in [
        ("form_page", &config.form_page),
        ("search_endpoint", &config.search_endpoint),
        ("autocomplete_endpoint", &config.autocomplete_endpoint),
    ] {
        base.join(endpoint)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", key, e)))?;
    }

    if config.name_field.is_empty() {
        return Err(ConfigError::Validation(
            "name_field cannot be empty".to_string(),
        ));
    }

    if config.autocomplete_key.is_empty() {
        return Err(ConfigError::Validation(
            "autocomplete_key cannot be empty".to_string(),
        ));
    }

    validate_selector("form_selector", &config.form_selector)?;
    validate_selector("results_selector", &config.results_selector)?;
    validate_selector("result_link_selector", &config.result_link_selector)?;

    if let Some(param) = &config.entry_id_param {
        if param.is_empty() {
            return Err(ConfigError::Validation(
                "entry_id_param cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates enumeration limits and the prefix alphabet
fn validate_enumeration_config(config: &EnumerationConfig) -> Result<(), ConfigError> {
    if config.alphabet.is_empty() {
        return Err(ConfigError::Validation(
            "alphabet cannot be empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for c in config.alphabet.chars() {
        if c.is_whitespace() {
            return Err(ConfigError::Validation(
                "alphabet cannot contain whitespace".to_string(),
            ));
        }
        if !seen.insert(c) {
            return Err(ConfigError::Validation(format!(
                "alphabet contains '{}' more than once",
                c
            )));
        }
    }

    if config.truncation_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "truncation_threshold must be >= 1, got {}",
            config.truncation_threshold
        )));
    }

    if config.max_depth < 1 {
        return Err(ConfigError::Validation(format!(
            "max_depth must be >= 1, got {}",
            config.max_depth
        )));
    }

    if config.max_queries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_queries must be >= 1, got {}",
            config.max_queries
        )));
    }

    Ok(())
}

/// Validates delay bounds
fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.search_min_delay > config.search_max_delay {
        return Err(ConfigError::Validation(format!(
            "search_min_delay ({}ms) cannot exceed search_max_delay ({}ms)",
            config.search_min_delay, config.search_max_delay
        )));
    }

    if config.autocomplete_delays.is_empty() {
        return Err(ConfigError::Validation(
            "autocomplete_delays must list at least one delay".to_string(),
        ));
    }

    Ok(())
}

/// Validates HTTP timeouts, retries and worker count
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout < 1 || config.connect_timeout < 1 {
        return Err(ConfigError::Validation(
            "timeout and connect_timeout must be >= 1 second".to_string(),
        ));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.detail_workers < 1 || config.detail_workers > 16 {
        return Err(ConfigError::Validation(format!(
            "detail_workers must be between 1 and 16, got {}",
            config.detail_workers
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates cache configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.enabled && config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "cache database_path cannot be empty when the cache is enabled".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (key, path) in [
        ("names_path", &config.names_path),
        ("links_path", &config.links_path),
        ("records_path", &config.records_path),
    ] {
        if path.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", key)));
        }
    }

    Ok(())
}

/// Validates record extraction rules
fn validate_record_config(config: &RecordConfig) -> Result<(), ConfigError> {
    validate_selector("table_selector", &config.table_selector)?;

    let mut columns = HashSet::new();
    for field in &config.fields {
        if field.label.trim().is_empty() || field.column.trim().is_empty() {
            return Err(ConfigError::Validation(
                "record fields need a non-empty label and column".to_string(),
            ));
        }

        if RESERVED_COLUMNS.contains(&field.column.as_str()) {
            return Err(ConfigError::Validation(format!(
                "record column '{}' is reserved",
                field.column
            )));
        }

        if !columns.insert(field.column.as_str()) {
            return Err(ConfigError::Validation(format!(
                "record column '{}' is declared more than once",
                field.column
            )));
        }
    }

    Ok(())
}

/// Checks that a CSS selector parses
fn validate_selector(key: &str, selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", key, selector, e)))
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldMapping;

    #[test]
    fn test_validate_alphabet() {
        let mut config = EnumerationConfig::default();
        assert!(validate_enumeration_config(&config).is_ok());

        config.alphabet = String::new();
        assert!(validate_enumeration_config(&config).is_err());

        config.alphabet = "abca".to_string();
        assert!(validate_enumeration_config(&config).is_err());

        config.alphabet = "ab c".to_string();
        assert!(validate_enumeration_config(&config).is_err());
    }

    #[test]
    fn test_validate_delay_bounds() {
        let mut config = RateLimitConfig::default();
        assert!(validate_rate_limit_config(&config).is_ok());

        config.search_min_delay = 5000;
        assert!(validate_rate_limit_config(&config).is_err());

        config.search_min_delay = 0;
        config.autocomplete_delays.clear();
        assert!(validate_rate_limit_config(&config).is_err());
    }

    #[test]
    fn test_validate_detail_workers() {
        let mut config = FetchConfig::default();
        config.detail_workers = 0;
        assert!(validate_fetch_config(&config).is_err());

        config.detail_workers = 4;
        assert!(validate_fetch_config(&config).is_ok());
    }

    #[test]
    fn test_validate_record_columns() {
        let mut config = RecordConfig::default();
        config.fields.push(FieldMapping {
            label: "Permit".to_string(),
            column: "permit".to_string(),
        });
        assert!(validate_record_config(&config).is_ok());

        config.fields.push(FieldMapping {
            label: "Permit again".to_string(),
            column: "permit".to_string(),
        });
        assert!(validate_record_config(&config).is_err());

        config.fields.pop();
        config.fields.push(FieldMapping {
            label: "Identifier".to_string(),
            column: "id".to_string(),
        });
        assert!(validate_record_config(&config).is_err());
    }

    #[test]
    fn test_validate_selector() {
        assert!(validate_selector("results_selector", "table#GViewList").is_ok());
        assert!(validate_selector("results_selector", "table[[").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
    }
}
