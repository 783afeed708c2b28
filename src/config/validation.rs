use crate::config::types::{Config, CrawlerConfig, OutputConfig, ProxyConfig, SessionConfig};
use crate::url::compile_ignore_patterns;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_session_config(&config.session)?;
    validate_crawler_config(&config.crawler)?;
    validate_proxy_config(&config.proxy)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates session identity and admission rules
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.crawl_id.trim().is_empty() {
        return Err(ConfigError::MissingCrawlId);
    }

    validate_site(&config.site)?;

    if config.start_paths.is_empty() {
        return Err(ConfigError::Validation(
            "start-paths must contain at least one path".to_string(),
        ));
    }

    // Invalid patterns are fatal at startup
    compile_ignore_patterns(&config.ignore_paths)?;

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-fetches must be between 1 and 100, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.loop_interval_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "loop-interval-ms must be >= 10ms, got {}ms",
            config.loop_interval_ms
        )));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch-timeout-secs must be >= 1, got {}",
            config.fetch_timeout_secs
        )));
    }

    Ok(())
}

/// Validates the proxy endpoint
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.endpoint).map_err(|e| {
        ConfigError::Validation(format!("Invalid proxy endpoint '{}': {}", config.endpoint, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Proxy endpoint '{}' must use http or https",
            config.endpoint
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the site host (bare host name, no scheme, path or port)
fn validate_site(site: &str) -> Result<(), ConfigError> {
    if site.is_empty() {
        return Err(ConfigError::Validation("site cannot be empty".to_string()));
    }

    if site.contains("://") || site.contains('/') {
        return Err(ConfigError::Validation(format!(
            "site must be a bare host name without scheme or path, got '{}'",
            site
        )));
    }

    if !site
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "site '{}' contains invalid characters",
            site
        )));
    }

    if site.starts_with('.') || site.ends_with('.') || site.starts_with('-') || site.ends_with('-')
    {
        return Err(ConfigError::Validation(format!(
            "site '{}' cannot start or end with '.' or '-'",
            site
        )));
    }

    if site.contains("..") {
        return Err(ConfigError::Validation(format!(
            "site '{}' cannot contain consecutive dots",
            site
        )));
    }

    Ok(())
}
