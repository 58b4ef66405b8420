//! Database schema definitions and migrations
//!
//! This module contains all SQL schema definitions for the frontier database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One row per checkpoint snapshot
CREATE TABLE IF NOT EXISTS snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    schema_version INTEGER NOT NULL,
    uris_admitted INTEGER NOT NULL,
    bytes_fetched INTEGER NOT NULL,
    elapsed_ms INTEGER NOT NULL,
    -- Rotation ring order at snapshot time, newline-joined queue keys
    ready_ring TEXT NOT NULL
);

-- Work queues belonging to a snapshot
CREATE TABLE IF NOT EXISTS snapshot_queues (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    snapshot_id INTEGER NOT NULL REFERENCES snapshots(id) ON DELETE CASCADE,
    queue_key TEXT NOT NULL,
    concurrency INTEGER NOT NULL,
    retired INTEGER NOT NULL,
    completed INTEGER NOT NULL,
    bytes_fetched INTEGER NOT NULL,
    wake_remaining_ms INTEGER,
    UNIQUE(snapshot_id, queue_key)
);

CREATE INDEX IF NOT EXISTS idx_snapshot_queues_snapshot ON snapshot_queues(snapshot_id);

-- Pending records belonging to a snapshot, ordered within their queue
CREATE TABLE IF NOT EXISTS snapshot_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    snapshot_id INTEGER NOT NULL REFERENCES snapshots(id) ON DELETE CASCADE,
    queue_key TEXT NOT NULL,
    position INTEGER NOT NULL,
    canonical TEXT NOT NULL,
    original TEXT NOT NULL,
    source_kind TEXT NOT NULL,
    source_parent TEXT,
    source_hop INTEGER NOT NULL,
    precedence INTEGER NOT NULL,
    attempts INTEGER NOT NULL,
    last_status INTEGER,
    last_error TEXT,
    prior_digest TEXT,
    was_in_flight INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_snapshot_records_snapshot ON snapshot_records(snapshot_id);

-- Uniqueness-filter fingerprints belonging to a snapshot
-- (u64 fingerprints stored as their i64 bit pattern)
CREATE TABLE IF NOT EXISTS snapshot_seen (
    snapshot_id INTEGER NOT NULL REFERENCES snapshots(id) ON DELETE CASCADE,
    fingerprint INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_snapshot_seen_snapshot ON snapshot_seen(snapshot_id);
"#;

/// Initializes the database schema
///
/// This is idempotent and safe to call on an existing database.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
