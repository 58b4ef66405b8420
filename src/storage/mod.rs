//! Storage module for persisting frontier state
//!
//! This module handles all database operations for the frontier, including:
//! - SQLite database initialization and schema management
//! - Snapshot persistence and retention pruning
//! - Crawl run tracking and resumption support

mod schema;
pub mod sqlite;
mod traits;

pub use schema::initialize_schema;
pub use sqlite::{open_storage, SqliteStorage};
pub use traits::{Storage, StorageError, StorageResult};

/// Represents a crawl run in the database
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Lifecycle of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Interrupted => "interrupted",
            RunStatus::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "interrupted" => Some(RunStatus::Interrupted),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}
