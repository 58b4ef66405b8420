//! Kumo-Frontier: a polite, crash-safe crawl frontier
//!
//! This crate implements the scheduling core of a large-scale web crawler:
//! it decides which URI is fetched next, enforces per-host politeness and
//! concurrency limits, deduplicates scheduling work, and checkpoints enough
//! state to resume an interrupted crawl exactly where it left off.
//!
//! Link extraction, fetch transports, and decision rules are external
//! collaborators: they call [`Frontier::submit`] with candidate URIs, pull
//! work with [`Frontier::next`], and report results with
//! [`Frontier::finished`].

pub mod checkpoint;
pub mod config;
pub mod frontier;
pub mod seen;
pub mod storage;
pub mod uri;

use thiserror::Error;

/// Main error type for Kumo-Frontier operations
#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URI error: {0}")]
    Uri(#[from] UriError),

    #[error("Crawl exhausted: no pending or in-flight work remains")]
    Exhausted,

    #[error("Checkpoint I/O failure: {0}")]
    CheckpointIo(#[from] storage::StorageError),

    #[error("Snapshot {0} not found")]
    SnapshotNotFound(i64),

    #[error("Snapshot schema version {found} unsupported (expected {expected})")]
    SnapshotVersion { found: u32, expected: u32 },

    #[error("Snapshot config hash {snapshot} does not match running config {current}")]
    ConfigMismatch { snapshot: String, current: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid seed URI in config: {0}")]
    InvalidSeed(String),
}

/// URI-specific errors
#[derive(Debug, Error)]
pub enum UriError {
    #[error("Failed to parse URI: {0}")]
    Parse(String),

    #[error("Invalid URI scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URI")]
    MissingHost,

    #[error("Malformed URI: {0}")]
    Malformed(String),
}

/// Result type alias for Kumo-Frontier operations
pub type Result<T> = std::result::Result<T, FrontierError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URI operations
pub type UriResult<T> = std::result::Result<T, UriError>;

// Re-export commonly used types
pub use config::Config;
pub use frontier::{
    CompletedRecord, DiscoverySource, Dispatch, FetchOutcome, Frontier, FrontierStatus,
    QueueState, RetireReason, SubmitOutcome, UriRecord,
};
pub use uri::{canonicalize, queue_key};
