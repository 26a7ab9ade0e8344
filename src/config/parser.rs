use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable that overrides `api.api-key`
pub const API_KEY_ENV: &str = "ONION_SCOUT_API_KEY";

/// Loads and parses a configuration file from the given path
///
/// The API key may be supplied through `ONION_SCOUT_API_KEY` instead of the
/// file; the environment value wins when both are present.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use onion_scout::config::load_config;
///
/// let config = load_config(Path::new("scout.toml")).unwrap();
/// println!("Max requests: {}", config.crawler.max_requests);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;

    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if let Some(api) = config.api.as_mut() {
            api.api_key = key;
        }
    }

    validate(&config)?;

    Ok(config)
}

/// Parses configuration from TOML text without validating it
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Workers log this at startup so mismatched fleet members are easy to spot.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
