//! Configuration validation
//!
//! Checks that a parsed configuration is internally consistent before the
//! frontier is constructed from it.

use crate::config::types::Config;
use crate::ConfigError;
use url::Url;

/// Validates a parsed configuration
///
/// # Returns
///
/// * `Ok(())` - Configuration is valid
/// * `Err(ConfigError)` - A field is out of range or a seed is malformed
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.frontier.max_concurrent_fetches == 0 {
        return Err(ConfigError::Validation(
            "frontier.max-concurrent-fetches must be at least 1".to_string(),
        ));
    }

    if config.frontier.queue_concurrency == 0 {
        return Err(ConfigError::Validation(
            "frontier.queue-concurrency must be at least 1".to_string(),
        ));
    }

    if config.frontier.max_attempts == 0 {
        return Err(ConfigError::Validation(
            "frontier.max-attempts must be at least 1".to_string(),
        ));
    }

    if config.politeness.max_delay_ms < config.politeness.min_delay_ms {
        return Err(ConfigError::Validation(format!(
            "politeness.max-delay-ms ({}) must not be less than min-delay-ms ({})",
            config.politeness.max_delay_ms, config.politeness.min_delay_ms
        )));
    }

    if config.politeness.delay_factor < 0.0 || !config.politeness.delay_factor.is_finite() {
        return Err(ConfigError::Validation(format!(
            "politeness.delay-factor must be a finite non-negative number, got {}",
            config.politeness.delay_factor
        )));
    }

    if let Some(max_uris) = config.budget.max_uris {
        if max_uris == 0 {
            return Err(ConfigError::Validation(
                "budget.max-uris must be at least 1 when set".to_string(),
            ));
        }
    }

    if config.storage.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "storage.database-path must not be empty".to_string(),
        ));
    }

    for seed in &config.frontier.seeds {
        let url =
            Url::parse(seed).map_err(|_| ConfigError::InvalidSeed(seed.clone()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidSeed(seed.clone()));
        }
    }

    Ok(())
}
