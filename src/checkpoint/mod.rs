//! Checkpoint snapshots and the recovery journal
//!
//! A snapshot is a consistent capture of every queue, every pending record
//! (including records that were in flight when the snapshot was cut), the
//! uniqueness-filter fingerprints, budget counters, and the rotation order.
//! The journal persists snapshots through the [`Storage`] backend and
//! rebuilds a [`Frontier`] from the most recent one on resume.

use crate::config::Config;
use crate::frontier::record::{DiscoverySource, UriRecord};
use crate::frontier::Frontier;
use crate::storage::Storage;
use crate::{FrontierError, Result, UriError};
use chrono::{DateTime, Utc};
use url::Url;

/// Bumped whenever the snapshot layout changes incompatibly
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Identifier of a persisted snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SnapshotId(pub i64);

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Crawl-wide budget counters carried across a restart
#[derive(Debug, Clone, Default)]
pub struct BudgetCounters {
    pub uris_admitted: u64,
    pub bytes_fetched: u64,
    pub elapsed_ms: u64,
}

/// One pending record inside a queue snapshot
#[derive(Debug, Clone)]
pub struct RecordSnapshot {
    pub canonical: String,
    pub original: String,
    pub source_kind: String,
    pub source_parent: Option<String>,
    pub source_hop: u32,
    pub queue_key: String,
    pub precedence: u8,
    pub attempts: u32,
    pub last_status: Option<u16>,
    pub last_error: Option<String>,
    pub prior_digest: Option<String>,
    /// Whether the record was dispatched when the snapshot was cut; such
    /// records are redispatched after recovery (at-least-once)
    pub was_in_flight: bool,
}

impl RecordSnapshot {
    pub fn from_record(record: &UriRecord, was_in_flight: bool) -> Self {
        Self {
            canonical: record.canonical.to_string(),
            original: record.original.clone(),
            source_kind: record.source.kind().to_string(),
            source_parent: record.source.parent().map(str::to_string),
            source_hop: record.source.hop(),
            queue_key: record.queue_key.clone(),
            precedence: record.precedence,
            attempts: record.attempts,
            last_status: record.last_status,
            last_error: record.last_error.clone(),
            prior_digest: record.prior_digest.clone(),
            was_in_flight,
        }
    }

    pub fn to_record(&self) -> Result<UriRecord> {
        let canonical = Url::parse(&self.canonical)
            .map_err(|e| UriError::Malformed(format!("{}: {}", self.canonical, e)))?;
        let source = DiscoverySource::from_parts(
            &self.source_kind,
            self.source_parent.clone(),
            self.source_hop,
        )
        .ok_or_else(|| UriError::Malformed(format!("unknown source kind {}", self.source_kind)))?;

        let mut record = UriRecord::new(
            canonical,
            self.original.clone(),
            source,
            self.queue_key.clone(),
            self.precedence,
        );
        record.attempts = self.attempts;
        record.last_status = self.last_status;
        record.last_error = self.last_error.clone();
        record.prior_digest = self.prior_digest.clone();
        Ok(record)
    }
}

/// One work queue with its pending records
#[derive(Debug, Clone)]
pub struct QueueSnapshot {
    pub key: String,
    pub concurrency: u32,
    pub retired: bool,
    pub completed: u64,
    pub bytes_fetched: u64,
    /// Remaining politeness delay at snapshot time; reapplied relative to
    /// the recovery instant
    pub wake_remaining_ms: Option<u64>,
    pub records: Vec<RecordSnapshot>,
}

/// A complete frontier snapshot
#[derive(Debug, Clone)]
pub struct FrontierSnapshot {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub config_hash: String,
    /// Ready-ring order at snapshot time, preserved across recovery
    pub ready_ring: Vec<String>,
    pub queues: Vec<QueueSnapshot>,
    pub seen: Vec<u64>,
    pub budget: BudgetCounters,
}

/// Persists and restores frontier snapshots
pub struct CheckpointJournal {
    storage: Box<dyn Storage>,
    snapshots_to_keep: u32,
}

impl CheckpointJournal {
    pub fn new(storage: Box<dyn Storage>, snapshots_to_keep: u32) -> Self {
        Self {
            storage,
            snapshots_to_keep,
        }
    }

    /// Records a new crawl run in the backing store
    pub fn create_run(&mut self, config_hash: &str) -> Result<i64> {
        Ok(self.storage.create_run(config_hash)?)
    }

    /// Marks a run completed with a finish timestamp
    pub fn complete_run(&mut self, run_id: i64) -> Result<()> {
        Ok(self.storage.complete_run(run_id)?)
    }

    /// Updates the status of a run
    pub fn mark_run(&mut self, run_id: i64, status: crate::storage::RunStatus) -> Result<()> {
        Ok(self.storage.update_run_status(run_id, status)?)
    }

    /// Cuts a snapshot of the frontier and persists it atomically
    ///
    /// Old snapshots beyond the retention count are pruned afterwards, so
    /// a crash mid-write always leaves at least one complete snapshot.
    pub fn checkpoint(&mut self, frontier: &Frontier, config_hash: &str) -> Result<SnapshotId> {
        let snapshot = frontier.snapshot(config_hash);
        let id = self.storage.save_snapshot(&snapshot)?;
        self.storage.prune_snapshots(self.snapshots_to_keep)?;

        tracing::info!(
            "Checkpoint {} written: {} queues, {} seen fingerprints",
            id,
            snapshot.queues.len(),
            snapshot.seen.len()
        );
        Ok(id)
    }

    /// Loads a specific snapshot
    pub fn load(&self, id: SnapshotId) -> Result<FrontierSnapshot> {
        self.storage
            .load_snapshot(id)?
            .ok_or(FrontierError::SnapshotNotFound(id.0))
    }

    /// Loads the most recent snapshot, if any exist
    pub fn load_latest(&self) -> Result<Option<FrontierSnapshot>> {
        match self.storage.latest_snapshot_id()? {
            Some(id) => Ok(Some(self.load(id)?)),
            None => Ok(None),
        }
    }

    /// Rebuilds a frontier from the most recent snapshot
    ///
    /// Refuses to resume when the running configuration differs from the
    /// one the snapshot was cut under.
    pub fn recover(&self, config: Config, config_hash: &str) -> Result<Option<Frontier>> {
        let snapshot = match self.load_latest()? {
            Some(snapshot) => snapshot,
            None => return Ok(None),
        };
        Ok(Some(self.rebuild(config, config_hash, snapshot)?))
    }

    /// Rebuilds a frontier from a specific snapshot
    pub fn recover_from(
        &self,
        id: SnapshotId,
        config: Config,
        config_hash: &str,
    ) -> Result<Frontier> {
        let snapshot = self.load(id)?;
        self.rebuild(config, config_hash, snapshot)
    }

    fn rebuild(
        &self,
        config: Config,
        config_hash: &str,
        snapshot: FrontierSnapshot,
    ) -> Result<Frontier> {
        if snapshot.config_hash != config_hash {
            return Err(FrontierError::ConfigMismatch {
                snapshot: snapshot.config_hash,
                current: config_hash.to_string(),
            });
        }
        Frontier::from_snapshot(config, &snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontier::record::FetchOutcome;
    use crate::storage::sqlite::SqliteStorage;
    use std::time::Duration;

    fn journal() -> CheckpointJournal {
        let storage = SqliteStorage::new_in_memory().unwrap();
        CheckpointJournal::new(Box::new(storage), 3)
    }

    #[tokio::test]
    async fn test_checkpoint_and_recover_round_trip() {
        let mut j = journal();
        let f = Frontier::new(Config::for_tests());
        f.add_seed("https://a.test/1").unwrap();
        f.add_seed("https://b.test/1").unwrap();

        let id = j.checkpoint(&f, "cfg-hash").unwrap();
        assert!(id.0 > 0);

        let recovered = j.recover(Config::for_tests(), "cfg-hash").unwrap().unwrap();
        assert_eq!(recovered.status().queued_count, 2);
    }

    #[tokio::test]
    async fn test_recover_refuses_config_mismatch() {
        let mut j = journal();
        let f = Frontier::new(Config::for_tests());
        f.add_seed("https://a.test/1").unwrap();
        j.checkpoint(&f, "old-hash").unwrap();

        let result = j.recover(Config::for_tests(), "new-hash");
        assert!(matches!(result, Err(FrontierError::ConfigMismatch { .. })));
    }

    #[tokio::test]
    async fn test_recover_from_specific_snapshot() {
        let mut j = journal();
        let f = Frontier::new(Config::for_tests());
        f.add_seed("https://a.test/1").unwrap();
        let first = j.checkpoint(&f, "hash").unwrap();

        f.add_seed("https://b.test/1").unwrap();
        j.checkpoint(&f, "hash").unwrap();

        // The earlier snapshot predates the second seed
        let recovered = j.recover_from(first, Config::for_tests(), "hash").unwrap();
        assert_eq!(recovered.status().queued_count, 1);
    }

    #[tokio::test]
    async fn test_recover_with_no_snapshot_is_none() {
        let j = journal();
        assert!(j.recover(Config::for_tests(), "hash").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_missing_snapshot_fails() {
        let j = journal();
        let result = j.load(SnapshotId(42));
        assert!(matches!(result, Err(FrontierError::SnapshotNotFound(42))));
    }

    #[tokio::test]
    async fn test_checkpoint_is_idempotent_for_retired_records() {
        let mut j = journal();
        let mut config = Config::for_tests();
        config.politeness.min_delay_ms = 0;
        let f = Frontier::new(config);
        f.add_seed("https://a.test/done").unwrap();
        f.add_seed("https://a.test/pending").unwrap();

        let d = f.next().await.unwrap();
        f.finished(
            d,
            FetchOutcome::Success {
                status: 200,
                bytes: 10,
                fetch_duration: Duration::from_millis(5),
                server_delay: None,
                content_digest: None,
            },
        );

        j.checkpoint(&f, "hash").unwrap();
        let recovered = j.recover(Config::for_tests(), "hash").unwrap().unwrap();

        // Only the still-pending record comes back; the retired one stays
        // behind the uniqueness filter
        assert_eq!(recovered.status().queued_count, 1);
        assert_eq!(
            recovered.add_seed("https://a.test/done").unwrap(),
            crate::frontier::SubmitOutcome::Duplicate
        );
    }

    #[test]
    fn test_record_snapshot_round_trip() {
        let record = UriRecord::new(
            Url::parse("https://a.test/page").unwrap(),
            "https://A.TEST/page".to_string(),
            DiscoverySource::Link {
                parent: "https://a.test/".to_string(),
                hop: 2,
            },
            "a.test".to_string(),
            3,
        );

        let snap = RecordSnapshot::from_record(&record, false);
        let back = snap.to_record().unwrap();
        assert_eq!(back.canonical, record.canonical);
        assert_eq!(back.source.hop(), 2);
        assert_eq!(back.precedence, 3);
    }
}
