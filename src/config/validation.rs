use crate::config::types::{Config, CrawlerConfig, OutputConfig, ScopeConfig, UserAgentConfig};
use crate::url::normalize_url;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_start_urls(&config.start_urls)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_scope_config(&config.scope)?;
    validate_output_config(&config.output)?;
    config.selector_spec()?;
    Ok(())
}

/// Validates the start URL list
fn validate_start_urls(urls: &[String]) -> Result<(), ConfigError> {
    if urls.is_empty() {
        return Err(ConfigError::Validation(
            "start-urls must contain at least one URL".to_string(),
        ));
    }

    for url in urls {
        normalize_url(url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", url, e)))?;
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 || config.max_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and 100, got {}",
            config.max_concurrency
        )));
    }

    if config.max_concurrent_per_host < 1 || config.max_concurrent_per_host > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-per-host must be between 1 and 100, got {}",
            config.max_concurrent_per_host
        )));
    }

    if config.fetch_timeout < 1 {
        return Err(ConfigError::Validation(
            "fetch-timeout must be at least 1ms".to_string(),
        ));
    }

    if config.retry_base_delay > config.retry_max_delay {
        return Err(ConfigError::Validation(format!(
            "retry-base-delay ({}ms) must not exceed retry-max-delay ({}ms)",
            config.retry_base_delay, config.retry_max_delay
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1 when set".to_string(),
        ));
    }

    if config.max_duration == Some(0) {
        return Err(ConfigError::Validation(
            "max-duration must be >= 1 second when set".to_string(),
        ));
    }

    if config.min_interval_per_host == 0 {
        tracing::warn!("min-interval-per-host is 0: hosts will not be rate limited");
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;
    }

    Ok(())
}

/// Validates scope domain patterns
fn validate_scope_config(config: &ScopeConfig) -> Result<(), ConfigError> {
    for pattern in config
        .allowed_domains
        .iter()
        .chain(config.blocked_domains.iter())
    {
        validate_domain_pattern(pattern)?;
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.json_path.is_empty() {
        return Err(ConfigError::Validation(
            "json-path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.as_deref() == Some("") {
        return Err(ConfigError::Validation(
            "summary-path cannot be empty when set".to_string(),
        ));
    }

    if config.database_path.as_deref() == Some("") {
        return Err(ConfigError::Validation(
            "database-path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates a domain pattern (supports a leading `*.` wildcard)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(format!(
            "Pattern '{}' has no domain after the wildcard",
            pattern
        )));
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::FieldSpec;

    fn base_config() -> Config {
        Config {
            start_urls: vec!["http://a.test/".to_string()],
            crawler: CrawlerConfig::default(),
            user_agent: UserAgentConfig::default(),
            scope: ScopeConfig::default(),
            output: OutputConfig::default(),
            fields: vec![FieldSpec::text("title", "h1")],
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&base_config()).is_ok());
    }

    #[test]
    fn test_no_start_urls() {
        let mut config = base_config();
        config.start_urls.clear();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_invalid_start_url() {
        let mut config = base_config();
        config.start_urls.push("ftp://files.test/".to_string());
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        let mut config = base_config();
        config.start_urls = vec!["not a url".to_string()];
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = base_config();
        config.crawler.max_concurrency = 0;
        assert!(validate(&config).is_err());

        let mut config = base_config();
        config.crawler.max_concurrent_per_host = 101;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_retry_delays() {
        let mut config = base_config();
        config.crawler.retry_base_delay = 10_000;
        config.crawler.retry_max_delay = 1_000;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_page_budget() {
        let mut config = base_config();
        config.crawler.max_pages = Some(0);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_duplicate_field_keys() {
        let mut config = base_config();
        config.fields.push(FieldSpec::text("title", "h2"));
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_invalid_selector() {
        let mut config = base_config();
        config.fields.push(FieldSpec::text("broken", "div[[["));
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_crawler_name() {
        let mut config = base_config();
        config.user_agent.crawler_name = "bad name!".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_domain_pattern() {
        assert!(validate_domain_pattern("example.com").is_ok());
        assert!(validate_domain_pattern("*.example.com").is_ok());
        assert!(validate_domain_pattern("localhost").is_ok());
        assert!(validate_domain_pattern("127.0.0.1").is_ok());

        assert!(validate_domain_pattern("").is_err());
        assert!(validate_domain_pattern("*.").is_err());
        assert!(validate_domain_pattern(".example.com").is_err());
        assert!(validate_domain_pattern("example.com.").is_err());
        assert!(validate_domain_pattern("exa mple.com").is_err());
        assert!(validate_domain_pattern("a..b").is_err());
    }
}
