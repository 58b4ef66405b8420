//! The frontier scheduler: dispatch, politeness, fairness, outcomes
//!
//! One `Frontier` instance is shared by many fetch workers. Extraction
//! collaborators call [`Frontier::submit`] concurrently; workers loop on
//! [`Frontier::next`] / [`Frontier::finished`]. `next` is the only
//! suspension point: it parks a worker when no queue is dispatchable and
//! wakes it when a queue leaves `Snoozed`/`Empty`.
//!
//! Fairness comes from a rotation ring of ready queue keys: a queue that
//! has just been served goes to the back of the ring, so it cannot be
//! selected again until every other ready queue has had a turn. Snoozed
//! queues wait in a min-heap ordered by wake time; when nothing is ready
//! the scheduler sleeps until the earliest wake instead of polling.

use crate::checkpoint::{
    BudgetCounters, FrontierSnapshot, QueueSnapshot, RecordSnapshot, SNAPSHOT_SCHEMA_VERSION,
};
use crate::config::Config;
use crate::frontier::budget::BudgetLedger;
use crate::frontier::politeness::{DefaultPolitenessPolicy, PolitenessPolicy};
use crate::frontier::queue::{QueueState, WorkQueue};
use crate::frontier::record::{
    CompletedRecord, DiscoverySource, FetchOutcome, RetireReason, UriRecord,
};
use crate::seen::{fingerprint, SeenFilter};
use crate::uri::{canonicalize, HostAssignment, QueueAssignment};
use crate::{FrontierError, Result, UriError};
use chrono::Utc;
use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{Notify, Semaphore};
use tokio::time::Instant;

/// Result of a `submit` call
///
/// Only a malformed URI is an error; denial by the uniqueness filter or a
/// budget is a normal admission outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Admitted and enqueued
    Admitted,
    /// Already scheduled at some point in this crawl
    Duplicate,
    /// A crawl-wide budget is exhausted; submission retired
    BudgetExhausted,
    /// The target queue is retired; submission dropped
    QueueRetired,
}

/// A URI record handed to a fetch worker, holding its concurrency permit
///
/// Every dispatch must be passed back through [`Frontier::finished`].
/// Dropping one releases the global concurrency permit but leaves its
/// queue's in-flight slot occupied, wedging that queue until the frontier
/// is rebuilt; a worker that cannot fetch reports
/// [`FetchOutcome::Deferred`] instead of dropping.
pub struct Dispatch {
    /// The record to fetch
    pub record: UriRecord,

    dispatch_id: u64,
    _permit: tokio::sync::OwnedSemaphorePermit,
}

/// Read-only status for the operator surface
#[derive(Debug, Clone)]
pub struct FrontierStatus {
    /// Records pending across all queues
    pub queued_count: u64,
    /// Records currently dispatched to workers
    pub in_flight_count: u64,
    /// Work queues ever created
    pub queue_count: usize,
    /// Records admitted by the uniqueness filter
    pub admitted_count: u64,
    /// Records retired (any reason)
    pub completed_count: u64,
    pub paused: bool,
}

/// Snoozed queue entry ordered by wake time
#[derive(Debug, PartialEq, Eq)]
struct SnoozeEntry {
    wake: Instant,
    key: String,
}

impl Ord for SnoozeEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.wake
            .cmp(&other.wake)
            .then_with(|| self.key.cmp(&other.key))
    }
}

impl PartialOrd for SnoozeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

/// The rotation discipline: ready ring plus snooze heap
///
/// Invariant: a queue key appears at most once across the ring and the
/// heap, tracked by `WorkQueue::scheduled`.
#[derive(Default)]
struct Rotation {
    ready: VecDeque<String>,
    snoozed: BinaryHeap<Reverse<SnoozeEntry>>,
}

/// The frontier scheduler shared by submitters and fetch workers
pub struct Frontier {
    config: Config,

    /// Queue-key to work-queue map; per-queue mutations serialize on the
    /// queue's own lock, not on this map lock
    queues: RwLock<HashMap<String, Arc<Mutex<WorkQueue>>>>,

    rotation: Mutex<Rotation>,
    seen: SeenFilter,
    budget: BudgetLedger,
    politeness: Box<dyn PolitenessPolicy>,
    assignment: Box<dyn QueueAssignment>,

    paused: AtomicBool,
    notify: Notify,
    permits: Arc<Semaphore>,

    pending_total: AtomicU64,
    in_flight_total: AtomicU64,
    admitted_total: AtomicU64,
    completed_total: AtomicU64,

    next_dispatch_id: AtomicU64,
    /// Copies of dispatched records so a checkpoint can capture them as
    /// pending (at-least-once redispatch after recovery)
    in_flight_records: Mutex<HashMap<u64, UriRecord>>,

    completed_tx: Mutex<Option<UnboundedSender<CompletedRecord>>>,
}

impl Frontier {
    /// Creates a frontier with the default politeness and host assignment
    pub fn new(config: Config) -> Self {
        let politeness = Box::new(DefaultPolitenessPolicy::from_settings(&config.politeness));
        Self::with_policies(config, politeness, Box::new(HostAssignment))
    }

    /// Creates a frontier with custom politeness and queue assignment
    pub fn with_policies(
        config: Config,
        politeness: Box<dyn PolitenessPolicy>,
        assignment: Box<dyn QueueAssignment>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(
            config.frontier.max_concurrent_fetches as usize,
        ));
        let budget = BudgetLedger::new(config.budget.clone());

        Self {
            config,
            queues: RwLock::new(HashMap::new()),
            rotation: Mutex::new(Rotation::default()),
            seen: SeenFilter::new(),
            budget,
            politeness,
            assignment,
            paused: AtomicBool::new(false),
            notify: Notify::new(),
            permits,
            pending_total: AtomicU64::new(0),
            in_flight_total: AtomicU64::new(0),
            admitted_total: AtomicU64::new(0),
            completed_total: AtomicU64::new(0),
            next_dispatch_id: AtomicU64::new(1),
            in_flight_records: Mutex::new(HashMap::new()),
            completed_tx: Mutex::new(None),
        }
    }

    // ===== Submission =====

    /// Submits a candidate URI
    ///
    /// Runs the canonicalizer and the uniqueness filter; on admission,
    /// resolves the queue key and enqueues a fresh record. Creates the
    /// queue if the key has not been seen before.
    ///
    /// # Returns
    ///
    /// * `Ok(SubmitOutcome)` - The admission decision
    /// * `Err(FrontierError::Uri)` - The URI is malformed
    pub fn submit(
        &self,
        raw: &str,
        precedence: u8,
        source: DiscoverySource,
    ) -> Result<SubmitOutcome> {
        let canonical = canonicalize(raw)?;
        let key = self
            .assignment
            .queue_key(&canonical)
            .ok_or(UriError::MissingHost)?;

        let fp = fingerprint(canonical.as_str());
        if !self.seen.admit(fp) {
            tracing::trace!("Duplicate submission rejected: {}", canonical);
            return Ok(SubmitOutcome::Duplicate);
        }

        if let Some(scope) = self.budget.exhausted() {
            tracing::warn!("Submission retired, {} budget exhausted: {}", scope, canonical);
            return Ok(SubmitOutcome::BudgetExhausted);
        }

        let record = UriRecord::new(canonical, raw.to_string(), source, key, precedence);
        self.admit_record(record)
    }

    /// Adds a seed URI at the most urgent precedence
    pub fn add_seed(&self, raw: &str) -> Result<SubmitOutcome> {
        self.submit(raw, 0, DiscoverySource::Seed)
    }

    /// Re-queues a previously retired record, bypassing the uniqueness
    /// filter (the explicit re-queue path, e.g. scheduled revisits)
    ///
    /// The record keeps its attempt history and prior content digest;
    /// `precedence` may only lower (never raise) its precedence number.
    pub fn resubmit(&self, mut record: UriRecord, precedence: u8) -> Result<SubmitOutcome> {
        if self.budget.exhausted().is_some() {
            return Ok(SubmitOutcome::BudgetExhausted);
        }
        record.lower_precedence(precedence);
        self.admit_record(record)
    }

    fn admit_record(&self, record: UriRecord) -> Result<SubmitOutcome> {
        let handle = self.queue_handle(&record.queue_key);

        {
            let mut queue = handle.lock().expect("queue lock poisoned");
            // A dropped submission must not consume a budget slot, so the
            // retirement check comes before the claim.
            if queue.retired {
                return Ok(SubmitOutcome::QueueRetired);
            }
            if !self.budget.try_admit_uri() {
                tracing::warn!("Submission retired, uris budget exhausted: {}", record.canonical);
                return Ok(SubmitOutcome::BudgetExhausted);
            }
            queue.enqueue(record);
        }

        self.pending_total.fetch_add(1, Ordering::SeqCst);
        self.admitted_total.fetch_add(1, Ordering::Relaxed);
        self.schedule_queue(&handle);
        Ok(SubmitOutcome::Admitted)
    }

    /// Gets or creates the work queue for a key
    fn queue_handle(&self, key: &str) -> Arc<Mutex<WorkQueue>> {
        if let Some(handle) = self.queues.read().expect("queue map poisoned").get(key) {
            return Arc::clone(handle);
        }

        let mut map = self.queues.write().expect("queue map poisoned");
        Arc::clone(map.entry(key.to_string()).or_insert_with(|| {
            tracing::debug!("Creating work queue for key {}", key);
            Arc::new(Mutex::new(WorkQueue::new(
                key.to_string(),
                self.config.frontier.queue_concurrency,
            )))
        }))
    }

    /// Places a queue into the rotation (ring or snooze heap) if it has
    /// dispatchable work and is not already scheduled
    fn schedule_queue(&self, handle: &Arc<Mutex<WorkQueue>>) {
        let now = Instant::now();
        let mut target = None;

        {
            let mut queue = handle.lock().expect("queue lock poisoned");
            if !queue.scheduled
                && !queue.retired
                && queue.has_pending()
                && queue.under_concurrency()
            {
                queue.scheduled = true;
                let key = queue.key.clone();
                target = Some(match queue.wake_at {
                    Some(wake) if wake > now => Err(SnoozeEntry { wake, key }),
                    _ => Ok(key),
                });
            }
        }

        if let Some(target) = target {
            let mut rotation = self.rotation.lock().expect("rotation lock poisoned");
            match target {
                Ok(key) => rotation.ready.push_back(key),
                Err(entry) => rotation.snoozed.push(Reverse(entry)),
            }
        }

        self.notify.notify_waiters();
    }

    // ===== Dispatch =====

    /// Yields the next URI record to fetch
    ///
    /// Blocks until a queue is dispatchable. Fails with
    /// [`FrontierError::Exhausted`] when no pending or in-flight work
    /// remains anywhere.
    pub async fn next(&self) -> Result<Dispatch> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .expect("dispatch semaphore closed");

        loop {
            // Arm the wakeup before inspecting state so a concurrent
            // submit/finished cannot slip between check and sleep.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let mut earliest_wake = None;

            if !self.paused.load(Ordering::Acquire) {
                let now = Instant::now();

                if let Some(record) = self.try_dispatch(now) {
                    let dispatch_id = self.next_dispatch_id.fetch_add(1, Ordering::Relaxed);
                    self.in_flight_records
                        .lock()
                        .expect("in-flight map poisoned")
                        .insert(dispatch_id, record.clone());
                    self.in_flight_total.fetch_add(1, Ordering::SeqCst);

                    tracing::debug!("Dispatching {}", record.canonical);
                    return Ok(Dispatch {
                        record,
                        dispatch_id,
                        _permit: permit,
                    });
                }

                if self.pending_total.load(Ordering::SeqCst) == 0
                    && self.in_flight_total.load(Ordering::SeqCst) == 0
                {
                    tracing::info!("Frontier exhausted: crawl complete");
                    return Err(FrontierError::Exhausted);
                }

                earliest_wake = {
                    let rotation = self.rotation.lock().expect("rotation lock poisoned");
                    rotation.snoozed.peek().map(|Reverse(entry)| entry.wake)
                };
            }

            match earliest_wake {
                Some(wake) => {
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = tokio::time::sleep_until(wake) => {}
                    }
                }
                None => notified.as_mut().await,
            }
        }
    }

    /// Attempts one dispatch from the rotation; never blocks
    fn try_dispatch(&self, now: Instant) -> Option<UriRecord> {
        let mut rotation = self.rotation.lock().expect("rotation lock poisoned");
        self.promote_due(&mut rotation, now);

        let ring_len = rotation.ready.len();
        for _ in 0..ring_len {
            let key = match rotation.ready.pop_front() {
                Some(key) => key,
                None => break,
            };

            let handle = match self.queues.read().expect("queue map poisoned").get(&key) {
                Some(handle) => Arc::clone(handle),
                None => continue,
            };

            let mut queue = handle.lock().expect("queue lock poisoned");
            queue.scheduled = false;

            if queue.retired {
                continue;
            }

            // A finished() may have snoozed the queue while its key was
            // still in the ring (possible when concurrency > 1).
            if !queue.is_awake(now) {
                if queue.has_pending() && queue.under_concurrency() {
                    queue.scheduled = true;
                    let wake = queue.wake_at.expect("snoozed queue has wake time");
                    rotation.snoozed.push(Reverse(SnoozeEntry {
                        wake,
                        key: queue.key.clone(),
                    }));
                }
                continue;
            }

            if !queue.has_pending() || !queue.under_concurrency() {
                continue;
            }

            let mut record = queue.pop_next().expect("pending record present");
            queue.in_flight += 1;
            self.pending_total.fetch_sub(1, Ordering::SeqCst);

            // Fairness: a just-served queue goes to the back of the ring.
            if queue.has_pending() && queue.under_concurrency() {
                queue.scheduled = true;
                rotation.ready.push_back(queue.key.clone());
            }

            record.scheduled_at = Some(Utc::now());
            return Some(record);
        }

        None
    }

    /// Moves queues whose wake time has passed from the heap to the ring
    fn promote_due(&self, rotation: &mut Rotation, now: Instant) {
        while let Some(Reverse(entry)) = rotation.snoozed.peek() {
            if entry.wake > now {
                break;
            }
            let Reverse(entry) = rotation.snoozed.pop().expect("peeked entry present");

            let handle = match self
                .queues
                .read()
                .expect("queue map poisoned")
                .get(&entry.key)
            {
                Some(handle) => Arc::clone(handle),
                None => continue,
            };

            let mut queue = handle.lock().expect("queue lock poisoned");
            queue.scheduled = false;
            if !queue.retired && queue.has_pending() && queue.under_concurrency() {
                queue.scheduled = true;
                rotation.ready.push_back(entry.key);
            }
        }
    }

    // ===== Outcomes =====

    /// Processes the outcome of a dispatched record
    ///
    /// Must be called exactly once per dispatch; see [`Dispatch`] for the
    /// consequences of dropping one instead. Updates queue state (requeue,
    /// retire, snooze), budget counters, and emits a completed-record
    /// event on terminal outcomes.
    pub fn finished(&self, dispatch: Dispatch, outcome: FetchOutcome) {
        let Dispatch {
            mut record,
            dispatch_id,
            _permit,
        } = dispatch;

        self.in_flight_records
            .lock()
            .expect("in-flight map poisoned")
            .remove(&dispatch_id);
        self.in_flight_total.fetch_sub(1, Ordering::SeqCst);

        let handle = match self
            .queues
            .read()
            .expect("queue map poisoned")
            .get(&record.queue_key)
        {
            Some(handle) => Arc::clone(handle),
            None => {
                tracing::error!("Outcome for unknown queue {}", record.queue_key);
                return;
            }
        };

        let now = Instant::now();
        let bytes = outcome.bytes();
        self.budget.record_bytes(bytes);

        let mut dropped_by_budget = Vec::new();

        {
            let mut queue = handle.lock().expect("queue lock poisoned");
            queue.in_flight = queue.in_flight.saturating_sub(1);
            queue.bytes_fetched += bytes;

            let delay = self.politeness.delay(&queue, &outcome);
            queue.snooze_until(now + delay);

            match outcome {
                FetchOutcome::Success {
                    status,
                    content_digest,
                    ..
                } => {
                    record.attempts += 1;
                    record.last_status = Some(status);
                    let identical = match (&record.prior_digest, &content_digest) {
                        (Some(prior), Some(current)) => prior == current,
                        _ => false,
                    };
                    record.prior_digest = content_digest;
                    queue.completed += 1;
                    self.retire_record(&record, RetireReason::Completed, bytes, identical);
                }

                FetchOutcome::Retryable { error, .. } => {
                    record.attempts += 1;
                    record.last_error = Some(error);

                    if record.attempts >= self.config.frontier.max_attempts {
                        tracing::warn!(
                            "Max retries exceeded for {} after {} attempts",
                            record.canonical,
                            record.attempts
                        );
                        queue.completed += 1;
                        self.retire_record(&record, RetireReason::MaxRetriesExceeded, 0, false);
                    } else if queue.retired {
                        // The queue retired while this record was out
                        // (possible with per-queue concurrency above 1)
                        self.retire_record(&record, RetireReason::BudgetExceeded, 0, false);
                    } else {
                        // Exponential backoff on top of the politeness delay
                        let exp = record.attempts.saturating_sub(1).min(6);
                        let backoff = delay
                            .saturating_mul(1u32 << exp)
                            .min(Duration::from_millis(self.config.politeness.max_delay_ms));
                        queue.snooze_until(now + backoff);

                        tracing::debug!(
                            "Re-enqueueing {} (attempt {}) with backoff {:?}",
                            record.canonical,
                            record.attempts,
                            backoff
                        );
                        queue.enqueue(record);
                        self.pending_total.fetch_add(1, Ordering::SeqCst);
                    }
                }

                FetchOutcome::Fatal { error } => {
                    record.attempts += 1;
                    record.last_error = Some(error);
                    queue.completed += 1;
                    self.retire_record(&record, RetireReason::Fatal, 0, false);
                }

                FetchOutcome::Deferred { reason } => {
                    // Precondition pending; attempt count untouched
                    tracing::debug!("Deferred {}: {}", record.canonical, reason);
                    if queue.retired {
                        self.retire_record(&record, RetireReason::BudgetExceeded, 0, false);
                    } else {
                        queue.enqueue(record);
                        self.pending_total.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }

            // Per-queue budget: retire the queue once its completed cap is hit
            if let Some(max) = self.budget.max_queue_uris() {
                if !queue.retired && queue.completed >= max {
                    tracing::warn!(
                        "Queue {} budget exhausted after {} completed records",
                        queue.key,
                        queue.completed
                    );
                    dropped_by_budget = queue.retire();
                }
            }
        }

        if !dropped_by_budget.is_empty() {
            self.pending_total
                .fetch_sub(dropped_by_budget.len() as u64, Ordering::SeqCst);
            for dropped in &dropped_by_budget {
                self.retire_record(dropped, RetireReason::BudgetExceeded, 0, false);
            }
        }

        self.schedule_queue(&handle);
    }

    /// Records a terminal retirement and emits the completed-record event
    fn retire_record(
        &self,
        record: &UriRecord,
        reason: RetireReason,
        bytes: u64,
        identical_revisit: bool,
    ) {
        self.completed_total.fetch_add(1, Ordering::Relaxed);

        let event = CompletedRecord {
            uri: record.canonical.to_string(),
            queue_key: record.queue_key.clone(),
            reason,
            status: record.last_status,
            bytes,
            attempts: record.attempts,
            identical_revisit,
            finished_at: Utc::now(),
        };

        let mut tx = self.completed_tx.lock().expect("event sender poisoned");
        if let Some(sender) = tx.as_ref() {
            if sender.send(event).is_err() {
                // Subscriber went away; stop emitting
                *tx = None;
            }
        }
    }

    // ===== Operator surface =====

    /// Suspends dispatching; in-flight fetches run to completion
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
        tracing::info!("Frontier paused");
        self.notify.notify_waiters();
    }

    /// Reactivates dispatching
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        tracing::info!("Frontier resumed");
        self.notify.notify_waiters();
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Read-only status snapshot
    pub fn status(&self) -> FrontierStatus {
        FrontierStatus {
            queued_count: self.pending_total.load(Ordering::SeqCst),
            in_flight_count: self.in_flight_total.load(Ordering::SeqCst),
            queue_count: self.queues.read().expect("queue map poisoned").len(),
            admitted_count: self.admitted_total.load(Ordering::Relaxed),
            completed_count: self.completed_total.load(Ordering::Relaxed),
            paused: self.is_paused(),
        }
    }

    /// Observable state of one work queue, if it exists
    pub fn queue_state(&self, key: &str) -> Option<QueueState> {
        let handle = self
            .queues
            .read()
            .expect("queue map poisoned")
            .get(key)
            .cloned()?;
        let state = handle
            .lock()
            .expect("queue lock poisoned")
            .state(Instant::now());
        Some(state)
    }

    /// Subscribes to completed-record events
    ///
    /// Events are delivered without blocking the frontier; a dropped
    /// receiver simply ends delivery.
    pub fn subscribe_completed(&self) -> UnboundedReceiver<CompletedRecord> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.completed_tx.lock().expect("event sender poisoned") = Some(tx);
        rx
    }

    // ===== Checkpoint support =====

    /// Captures a consistent snapshot of all scheduler state
    ///
    /// Holds the rotation lock for the duration, which briefly quiesces
    /// dispatch; `submit`/`finished` proceed against per-queue locks.
    /// In-flight records are captured as pending so they are re-offered
    /// after recovery.
    pub fn snapshot(&self, config_hash: &str) -> FrontierSnapshot {
        let rotation = self.rotation.lock().expect("rotation lock poisoned");
        let now = Instant::now();

        let in_flight: Vec<UriRecord> = self
            .in_flight_records
            .lock()
            .expect("in-flight map poisoned")
            .values()
            .cloned()
            .collect();

        let map = self.queues.read().expect("queue map poisoned");
        let mut queues = Vec::with_capacity(map.len());
        for handle in map.values() {
            let queue = handle.lock().expect("queue lock poisoned");

            let mut records: Vec<RecordSnapshot> = queue
                .pending_records()
                .iter()
                .map(|r| RecordSnapshot::from_record(r, false))
                .collect();
            records.extend(
                in_flight
                    .iter()
                    .filter(|r| r.queue_key == queue.key)
                    .map(|r| RecordSnapshot::from_record(r, true)),
            );

            queues.push(QueueSnapshot {
                key: queue.key.clone(),
                concurrency: queue.concurrency,
                retired: queue.retired,
                completed: queue.completed,
                bytes_fetched: queue.bytes_fetched,
                wake_remaining_ms: queue
                    .wake_at
                    .and_then(|wake| wake.checked_duration_since(now))
                    .map(|d| d.as_millis() as u64),
                records,
            });
        }

        FrontierSnapshot {
            version: SNAPSHOT_SCHEMA_VERSION,
            created_at: Utc::now(),
            config_hash: config_hash.to_string(),
            ready_ring: rotation.ready.iter().cloned().collect(),
            queues,
            seen: self.seen.snapshot(),
            budget: BudgetCounters {
                uris_admitted: self.budget.uris_admitted(),
                bytes_fetched: self.budget.bytes_fetched(),
                elapsed_ms: self.budget.elapsed().as_millis() as u64,
            },
        }
    }

    /// Rebuilds a frontier from a snapshot
    ///
    /// Records that were in flight at snapshot time come back as pending
    /// and will be redispatched. Remaining politeness delays are reapplied
    /// relative to the recovery instant.
    pub fn from_snapshot(config: Config, snapshot: &FrontierSnapshot) -> Result<Self> {
        if snapshot.version != SNAPSHOT_SCHEMA_VERSION {
            return Err(FrontierError::SnapshotVersion {
                found: snapshot.version,
                expected: SNAPSHOT_SCHEMA_VERSION,
            });
        }

        let frontier = Self::new(config);

        frontier.seen.restore(snapshot.seen.iter().copied());

        // Swap in the checkpointed budget counters
        let restored = BudgetLedger::restore(
            frontier.config.budget.clone(),
            snapshot.budget.uris_admitted,
            snapshot.budget.bytes_fetched,
            Duration::from_millis(snapshot.budget.elapsed_ms),
        );
        let frontier = Self {
            budget: restored,
            admitted_total: AtomicU64::new(snapshot.budget.uris_admitted),
            ..frontier
        };

        let now = Instant::now();
        let mut pending = 0u64;

        {
            let mut map = frontier.queues.write().expect("queue map poisoned");
            for qsnap in &snapshot.queues {
                let mut queue = WorkQueue::new(qsnap.key.clone(), qsnap.concurrency);
                queue.retired = qsnap.retired;
                queue.completed = qsnap.completed;
                queue.bytes_fetched = qsnap.bytes_fetched;
                if let Some(remaining) = qsnap.wake_remaining_ms {
                    queue.snooze_until(now + Duration::from_millis(remaining));
                }

                for rsnap in &qsnap.records {
                    let record = rsnap.to_record()?;
                    if queue.enqueue(record) {
                        pending += 1;
                    }
                }

                map.insert(qsnap.key.clone(), Arc::new(Mutex::new(queue)));
            }
        }

        frontier.pending_total.store(pending, Ordering::SeqCst);

        // Rebuild the rotation: checkpointed ring order first, then any
        // queue the ring does not cover.
        for key in &snapshot.ready_ring {
            if let Some(handle) = frontier
                .queues
                .read()
                .expect("queue map poisoned")
                .get(key)
                .cloned()
            {
                frontier.schedule_queue(&handle);
            }
        }
        let handles: Vec<_> = frontier
            .queues
            .read()
            .expect("queue map poisoned")
            .values()
            .cloned()
            .collect();
        for handle in handles {
            frontier.schedule_queue(&handle);
        }

        tracing::info!(
            "Recovered frontier: {} queues, {} pending records, {} seen fingerprints",
            snapshot.queues.len(),
            pending,
            snapshot.seen.len()
        );

        Ok(frontier)
    }

    /// Whether a checkpoint is due per the configured completion interval
    pub fn checkpoint_due(&self) -> bool {
        let every = self.config.frontier.checkpoint_every;
        let completed = self.completed_total.load(Ordering::Relaxed);
        every > 0 && completed > 0 && completed % every == 0
    }
}
