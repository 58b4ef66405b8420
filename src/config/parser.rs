use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    // Read the configuration file
    let content = std::fs::read_to_string(path)?;

    // Parse TOML
    let config: Config = toml::from_str(&content)?;

    // Validate the configuration
    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Snapshots carry this hash so that recovery can detect a crawl being
/// resumed under a changed configuration.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID_CONFIG: &str = r#"
[frontier]
max-concurrent-fetches = 8
queue-concurrency = 1
max-attempts = 3
checkpoint-every = 100
seeds = ["https://example.com/"]

[politeness]
min-delay-ms = 1000
max-delay-ms = 60000
delay-factor = 2.0

[budget]
max-uris = 100000
max-queue-uris = 500

[storage]
database-path = "./frontier.db"
snapshots-to-keep = 3
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.frontier.max_concurrent_fetches, 8);
        assert_eq!(config.frontier.max_attempts, 3);
        assert_eq!(config.frontier.seeds.len(), 1);
        assert_eq!(config.politeness.min_delay_ms, 1000);
        assert_eq!(config.budget.max_uris, Some(100_000));
        assert_eq!(config.budget.max_bytes, None);
        assert_eq!(config.storage.snapshots_to_keep, 3);
    }

    #[test]
    fn test_defaults_applied() {
        let content = r#"
[frontier]
max-concurrent-fetches = 4

[politeness]
min-delay-ms = 500

[storage]
database-path = "./frontier.db"
"#;
        let file = create_temp_config(content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.frontier.queue_concurrency, 1);
        assert_eq!(config.frontier.max_attempts, 3);
        assert_eq!(config.frontier.checkpoint_every, 0);
        assert_eq!(config.politeness.max_delay_ms, 300_000);
        assert_eq!(config.politeness.delay_factor, 2.0);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = r#"
[frontier]
max-concurrent-fetches = 0

[politeness]
min-delay-ms = 1000

[storage]
database-path = "./frontier.db"
"#;
        let file = create_temp_config(content);
        let result = load_config(file.path());
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        // Same content should produce same hash
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA-256 produces 64 hex characters
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
