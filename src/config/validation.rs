use crate::config::types::{ApiConfig, Config, CrawlerConfig, NetworkConfig, SeedEntry, WorkerConfig};
use crate::url::is_onion_host;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_network_config(&config.network)?;
    if let Some(api) = &config.api {
        validate_api_config(api)?;
    }
    validate_storage_path(&config.storage.database_path)?;
    validate_worker_config(&config.worker)?;
    validate_seeds(&config.seed)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_requests < 1 || config.max_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max-requests must be between 1 and 100, got {}",
            config.max_requests
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be greater than zero".to_string(),
        ));
    }

    if config.timeout_ceiling_secs < config.timeout_secs {
        return Err(ConfigError::Validation(format!(
            "timeout-ceiling-secs ({}) must be >= timeout-secs ({})",
            config.timeout_ceiling_secs, config.timeout_secs
        )));
    }

    if config.max_run_secs == Some(0) {
        return Err(ConfigError::Validation(
            "max-run-secs must be greater than zero when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates the user-agent and proxy pools
fn validate_network_config(config: &NetworkConfig) -> Result<(), ConfigError> {
    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user-agents must contain at least one entry".to_string(),
        ));
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agents cannot contain blank entries".to_string(),
        ));
    }

    for proxy in &config.proxies {
        let url = Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;

        if !matches!(url.scheme(), "socks5" | "socks5h" | "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "Proxy '{}' must use a socks5, socks5h, http or https scheme",
                proxy
            )));
        }
    }

    Ok(())
}

/// Validates API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(
            "api max-retries must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_storage_path(path: &str) -> Result<(), ConfigError> {
    if path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates worker loop timing
///
/// A live job must heartbeat more often than the reconciliation sweep
/// declares jobs dead, or its task is handed to a second worker.
fn validate_worker_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    if config.heartbeat_secs == 0 {
        return Err(ConfigError::Validation(
            "heartbeat-secs must be greater than zero".to_string(),
        ));
    }

    if config.heartbeat_secs >= config.job_stale_secs {
        return Err(ConfigError::Validation(format!(
            "heartbeat-secs ({}) must be less than job-stale-secs ({})",
            config.heartbeat_secs, config.job_stale_secs
        )));
    }

    if config.sweep_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "sweep-interval-secs must be greater than zero".to_string(),
        ));
    }

    if config.idle_backoff_secs == 0 {
        return Err(ConfigError::Validation(
            "idle-backoff-secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

/// Validates seed entries
fn validate_seeds(seeds: &[SeedEntry]) -> Result<(), ConfigError> {
    for entry in seeds {
        validate_onion_domain(&entry.domain)?;

        if !(1..=7).contains(&entry.frequency) {
            return Err(ConfigError::Validation(format!(
                "Seed '{}' frequency must be between 1 and 7 days, got {}",
                entry.domain, entry.frequency
            )));
        }
    }
    Ok(())
}

/// Validates a bare onion domain (no scheme, no path)
fn validate_onion_domain(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidDomain(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.') || domain.starts_with('-') || domain.contains("..") {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' is malformed",
            domain
        )));
    }

    if !is_onion_host(domain) {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' is not an onion address",
            domain
        )));
    }

    Ok(())
}
