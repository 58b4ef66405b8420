use serde::Deserialize;

/// Main configuration structure for Kumo-Frontier
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub frontier: FrontierSettings,
    pub politeness: PolitenessSettings,
    #[serde(default)]
    pub budget: BudgetSettings,
    pub storage: StorageSettings,
}

/// Frontier scheduling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FrontierSettings {
    /// Maximum number of URI records dispatched concurrently across all queues
    #[serde(rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: u32,

    /// Maximum in-flight records per work queue (1 = single connection per host)
    #[serde(rename = "queue-concurrency", default = "default_queue_concurrency")]
    pub queue_concurrency: u32,

    /// Attempt ceiling before a retryable record is retired
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Checkpoint after this many completed records (0 disables periodic checkpoints)
    #[serde(rename = "checkpoint-every", default)]
    pub checkpoint_every: u64,

    /// Seed URIs submitted at crawl start with precedence 0
    #[serde(default)]
    pub seeds: Vec<String>,
}

/// Politeness delay configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PolitenessSettings {
    /// Minimum delay between consecutive fetches to the same queue key (milliseconds)
    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,

    /// Upper bound on any computed delay (milliseconds)
    #[serde(rename = "max-delay-ms", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Multiplier applied to the observed fetch duration
    #[serde(rename = "delay-factor", default = "default_delay_factor")]
    pub delay_factor: f64,
}

/// Budget caps; absent fields mean unlimited
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BudgetSettings {
    /// Crawl-wide cap on admitted URIs
    #[serde(rename = "max-uris")]
    pub max_uris: Option<u64>,

    /// Crawl-wide cap on fetched bytes
    #[serde(rename = "max-bytes")]
    pub max_bytes: Option<u64>,

    /// Per-queue cap on completed URIs
    #[serde(rename = "max-queue-uris")]
    pub max_queue_uris: Option<u64>,

    /// Crawl-wide wall-clock cap in seconds
    #[serde(rename = "max-crawl-seconds")]
    pub max_crawl_seconds: Option<u64>,
}

/// Snapshot storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Path to the SQLite snapshot database
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Number of snapshots retained before older ones are pruned
    #[serde(rename = "snapshots-to-keep", default = "default_snapshots_to_keep")]
    pub snapshots_to_keep: u32,
}

fn default_queue_concurrency() -> u32 {
    1
}

fn default_max_attempts() -> u32 {
    3
}

fn default_max_delay_ms() -> u64 {
    300_000
}

fn default_delay_factor() -> f64 {
    2.0
}

fn default_snapshots_to_keep() -> u32 {
    3
}

#[cfg(test)]
impl Config {
    /// A small configuration suitable for unit tests
    pub fn for_tests() -> Self {
        Self {
            frontier: FrontierSettings {
                max_concurrent_fetches: 4,
                queue_concurrency: 1,
                max_attempts: 3,
                checkpoint_every: 0,
                seeds: vec![],
            },
            politeness: PolitenessSettings {
                min_delay_ms: 1000,
                max_delay_ms: 300_000,
                delay_factor: 2.0,
            },
            budget: BudgetSettings::default(),
            storage: StorageSettings {
                database_path: ":memory:".to_string(),
                snapshots_to_keep: 3,
            },
        }
    }
}
