//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::checkpoint::{
    BudgetCounters, FrontierSnapshot, QueueSnapshot, RecordSnapshot, SnapshotId,
};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing and dry runs)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
        )?;

        let run = stmt
            .query_row([], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    config_hash: row.get(3)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(RunStatus::Running),
                })
            })
            .optional()?;

        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Snapshot Management =====

    fn save_snapshot(&mut self, snapshot: &FrontierSnapshot) -> StorageResult<SnapshotId> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO snapshots
                (created_at, config_hash, schema_version, uris_admitted,
                 bytes_fetched, elapsed_ms, ready_ring)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                snapshot.created_at.to_rfc3339(),
                snapshot.config_hash,
                snapshot.version,
                snapshot.budget.uris_admitted as i64,
                snapshot.budget.bytes_fetched as i64,
                snapshot.budget.elapsed_ms as i64,
                snapshot.ready_ring.join("\n"),
            ],
        )?;
        let snapshot_id = tx.last_insert_rowid();

        {
            let mut queue_stmt = tx.prepare(
                "INSERT INTO snapshot_queues
                    (snapshot_id, queue_key, concurrency, retired, completed,
                     bytes_fetched, wake_remaining_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            let mut record_stmt = tx.prepare(
                "INSERT INTO snapshot_records
                    (snapshot_id, queue_key, position, canonical, original,
                     source_kind, source_parent, source_hop, precedence,
                     attempts, last_status, last_error, prior_digest, was_in_flight)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )?;

            for queue in &snapshot.queues {
                queue_stmt.execute(params![
                    snapshot_id,
                    queue.key,
                    queue.concurrency,
                    queue.retired,
                    queue.completed as i64,
                    queue.bytes_fetched as i64,
                    queue.wake_remaining_ms.map(|ms| ms as i64),
                ])?;

                for (position, record) in queue.records.iter().enumerate() {
                    record_stmt.execute(params![
                        snapshot_id,
                        queue.key,
                        position as i64,
                        record.canonical,
                        record.original,
                        record.source_kind,
                        record.source_parent,
                        record.source_hop,
                        record.precedence,
                        record.attempts,
                        record.last_status,
                        record.last_error,
                        record.prior_digest,
                        record.was_in_flight,
                    ])?;
                }
            }

            let mut seen_stmt = tx.prepare(
                "INSERT INTO snapshot_seen (snapshot_id, fingerprint) VALUES (?1, ?2)",
            )?;
            for fp in &snapshot.seen {
                seen_stmt.execute(params![snapshot_id, *fp as i64])?;
            }
        }

        tx.commit()?;
        Ok(SnapshotId(snapshot_id))
    }

    fn load_snapshot(&self, id: SnapshotId) -> StorageResult<Option<FrontierSnapshot>> {
        let header = self
            .conn
            .prepare(
                "SELECT created_at, config_hash, schema_version, uris_admitted,
                        bytes_fetched, elapsed_ms, ready_ring
                 FROM snapshots WHERE id = ?1",
            )?
            .query_row(params![id.0], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .optional()?;

        let (created_at, config_hash, version, uris, bytes, elapsed, ring) = match header {
            Some(header) => header,
            None => return Ok(None),
        };

        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| StorageError::Corrupt(format!("created_at: {}", e)))?
            .with_timezone(&Utc);
        let ready_ring: Vec<String> = ring
            .split('\n')
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();

        let mut queues = Vec::new();
        let mut queue_index: HashMap<String, usize> = HashMap::new();
        {
            let mut stmt = self.conn.prepare(
                "SELECT queue_key, concurrency, retired, completed, bytes_fetched,
                        wake_remaining_ms
                 FROM snapshot_queues WHERE snapshot_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![id.0], |row| {
                Ok(QueueSnapshot {
                    key: row.get(0)?,
                    concurrency: row.get(1)?,
                    retired: row.get(2)?,
                    completed: row.get::<_, i64>(3)? as u64,
                    bytes_fetched: row.get::<_, i64>(4)? as u64,
                    wake_remaining_ms: row.get::<_, Option<i64>>(5)?.map(|ms| ms as u64),
                    records: Vec::new(),
                })
            })?;
            for queue in rows {
                let queue = queue?;
                queue_index.insert(queue.key.clone(), queues.len());
                queues.push(queue);
            }
        }

        {
            let mut stmt = self.conn.prepare(
                "SELECT queue_key, canonical, original, source_kind, source_parent,
                        source_hop, precedence, attempts, last_status, last_error,
                        prior_digest, was_in_flight
                 FROM snapshot_records WHERE snapshot_id = ?1
                 ORDER BY queue_key, position",
            )?;
            let rows = stmt.query_map(params![id.0], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    RecordSnapshot {
                        canonical: row.get(1)?,
                        original: row.get(2)?,
                        source_kind: row.get(3)?,
                        source_parent: row.get(4)?,
                        source_hop: row.get(5)?,
                        queue_key: row.get(0)?,
                        precedence: row.get(6)?,
                        attempts: row.get(7)?,
                        last_status: row.get(8)?,
                        last_error: row.get(9)?,
                        prior_digest: row.get(10)?,
                        was_in_flight: row.get(11)?,
                    },
                ))
            })?;
            for row in rows {
                let (queue_key, record) = row?;
                let index = queue_index.get(&queue_key).copied().ok_or_else(|| {
                    StorageError::Corrupt(format!("record for unknown queue {}", queue_key))
                })?;
                queues[index].records.push(record);
            }
        }

        let mut seen = Vec::new();
        {
            let mut stmt = self
                .conn
                .prepare("SELECT fingerprint FROM snapshot_seen WHERE snapshot_id = ?1")?;
            let rows = stmt.query_map(params![id.0], |row| row.get::<_, i64>(0))?;
            for fp in rows {
                seen.push(fp? as u64);
            }
        }

        Ok(Some(FrontierSnapshot {
            version,
            created_at,
            config_hash,
            ready_ring,
            queues,
            seen,
            budget: BudgetCounters {
                uris_admitted: uris as u64,
                bytes_fetched: bytes as u64,
                elapsed_ms: elapsed as u64,
            },
        }))
    }

    fn latest_snapshot_id(&self) -> StorageResult<Option<SnapshotId>> {
        let id = self
            .conn
            .prepare("SELECT id FROM snapshots ORDER BY id DESC LIMIT 1")?
            .query_row([], |row| row.get::<_, i64>(0))
            .optional()?;
        Ok(id.map(SnapshotId))
    }

    fn list_snapshots(&self) -> StorageResult<Vec<(SnapshotId, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, created_at FROM snapshots ORDER BY id DESC")?;
        let rows = stmt.query_map([], |row| {
            Ok((SnapshotId(row.get(0)?), row.get::<_, String>(1)?))
        })?;

        let mut snapshots = Vec::new();
        for row in rows {
            snapshots.push(row?);
        }
        Ok(snapshots)
    }

    fn prune_snapshots(&mut self, keep: u32) -> StorageResult<()> {
        let deleted = self.conn.execute(
            "DELETE FROM snapshots WHERE id NOT IN
                (SELECT id FROM snapshots ORDER BY id DESC LIMIT ?1)",
            params![keep],
        )?;
        if deleted > 0 {
            tracing::debug!("Pruned {} old snapshots", deleted);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::SNAPSHOT_SCHEMA_VERSION;
    use tempfile::TempDir;

    fn sample_snapshot(config_hash: &str) -> FrontierSnapshot {
        FrontierSnapshot {
            version: SNAPSHOT_SCHEMA_VERSION,
            created_at: Utc::now(),
            config_hash: config_hash.to_string(),
            ready_ring: vec!["a.test".to_string(), "b.test".to_string()],
            queues: vec![QueueSnapshot {
                key: "a.test".to_string(),
                concurrency: 1,
                retired: false,
                completed: 4,
                bytes_fetched: 2048,
                wake_remaining_ms: Some(750),
                records: vec![RecordSnapshot {
                    canonical: "https://a.test/page".to_string(),
                    original: "https://A.TEST/page".to_string(),
                    source_kind: "link".to_string(),
                    source_parent: Some("https://a.test/".to_string()),
                    source_hop: 1,
                    queue_key: "a.test".to_string(),
                    precedence: 2,
                    attempts: 1,
                    last_status: Some(503),
                    last_error: Some("service unavailable".to_string()),
                    prior_digest: None,
                    was_in_flight: true,
                }],
            }],
            seen: vec![1, u64::MAX, 0x8000_0000_0000_0001],
            budget: BudgetCounters {
                uris_admitted: 10,
                bytes_fetched: 2048,
                elapsed_ms: 60_000,
            },
        }
    }

    #[test]
    fn test_save_and_load_snapshot() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage.save_snapshot(&sample_snapshot("hash")).unwrap();

        let loaded = storage.load_snapshot(id).unwrap().unwrap();
        assert_eq!(loaded.config_hash, "hash");
        assert_eq!(loaded.ready_ring, vec!["a.test", "b.test"]);
        assert_eq!(loaded.queues.len(), 1);

        let queue = &loaded.queues[0];
        assert_eq!(queue.key, "a.test");
        assert_eq!(queue.completed, 4);
        assert_eq!(queue.wake_remaining_ms, Some(750));
        assert_eq!(queue.records.len(), 1);

        let record = &queue.records[0];
        assert_eq!(record.canonical, "https://a.test/page");
        assert_eq!(record.last_status, Some(503));
        assert!(record.was_in_flight);
    }

    #[test]
    fn test_fingerprints_survive_sign_bit() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage.save_snapshot(&sample_snapshot("hash")).unwrap();

        let loaded = storage.load_snapshot(id).unwrap().unwrap();
        let mut seen = loaded.seen.clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 0x8000_0000_0000_0001, u64::MAX]);
    }

    #[test]
    fn test_load_missing_snapshot_is_none() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.load_snapshot(SnapshotId(7)).unwrap().is_none());
    }

    #[test]
    fn test_latest_snapshot_id_tracks_newest() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.latest_snapshot_id().unwrap().is_none());

        storage.save_snapshot(&sample_snapshot("first")).unwrap();
        let second = storage.save_snapshot(&sample_snapshot("second")).unwrap();

        assert_eq!(storage.latest_snapshot_id().unwrap(), Some(second));
    }

    #[test]
    fn test_prune_keeps_newest() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        for i in 0..5 {
            storage
                .save_snapshot(&sample_snapshot(&format!("hash-{}", i)))
                .unwrap();
        }

        storage.prune_snapshots(2).unwrap();

        let remaining = storage.list_snapshots().unwrap();
        assert_eq!(remaining.len(), 2);

        // Cascade removed the child rows too
        let orphans: i64 = storage
            .conn
            .query_row(
                "SELECT COUNT(*) FROM snapshot_records WHERE snapshot_id NOT IN
                    (SELECT id FROM snapshots)",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_run_lifecycle() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("hash").unwrap();

        let latest = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(latest.id, run_id);
        assert_eq!(latest.status, RunStatus::Running);
        assert!(latest.finished_at.is_none());

        storage
            .update_run_status(run_id, RunStatus::Interrupted)
            .unwrap();
        storage.complete_run(run_id).unwrap();

        let latest = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(latest.status, RunStatus::Completed);
        assert!(latest.finished_at.is_some());
    }

    #[test]
    fn test_update_missing_run_fails() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.update_run_status(99, RunStatus::Failed),
            Err(StorageError::RunNotFound(99))
        ));
    }

    #[test]
    fn test_file_backed_storage_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frontier.db");

        let id = {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage.save_snapshot(&sample_snapshot("hash")).unwrap()
        };

        let storage = SqliteStorage::new(&path).unwrap();
        let loaded = storage.load_snapshot(id).unwrap().unwrap();
        assert_eq!(loaded.config_hash, "hash");
    }
}
