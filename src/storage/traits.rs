//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::checkpoint::{FrontierSnapshot, SnapshotId};
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt snapshot data: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for frontier storage backends
///
/// Snapshot writes are atomic: a crash mid-save never leaves a partial
/// snapshot visible to `load_snapshot` or `latest_snapshot_id`.
pub trait Storage: Send {
    // ===== Run Management =====

    /// Creates a new crawl run, returning the run ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets the most recent run, if any
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Snapshot Management =====

    /// Persists a snapshot atomically, returning its ID
    fn save_snapshot(&mut self, snapshot: &FrontierSnapshot) -> StorageResult<SnapshotId>;

    /// Loads a snapshot by ID
    fn load_snapshot(&self, id: SnapshotId) -> StorageResult<Option<FrontierSnapshot>>;

    /// Gets the ID of the most recent snapshot
    fn latest_snapshot_id(&self) -> StorageResult<Option<SnapshotId>>;

    /// Lists all snapshots as (id, created_at) pairs, newest first
    fn list_snapshots(&self) -> StorageResult<Vec<(SnapshotId, String)>>;

    /// Deletes all but the `keep` most recent snapshots
    fn prune_snapshots(&mut self, keep: u32) -> StorageResult<()>;
}
