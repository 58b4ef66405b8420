//! Per-key work queues: the unit of politeness
//!
//! A work queue holds all pending records sharing one queue key, ordered by
//! precedence tier with FIFO order inside each tier. At most `concurrency`
//! records may be in flight at once (default 1: single connection per
//! host). After each outcome the queue is snoozed until its next-allowed
//! contact time.

use crate::frontier::record::UriRecord;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tokio::time::Instant;

/// Observable state of a work queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueState {
    /// No pending records and nothing in flight
    Empty,
    /// Has pending records and may dispatch now
    Ready,
    /// Has at least one in-flight record
    InProcess,
    /// Politeness delay active; holds a wake timestamp
    Snoozed,
    /// Permanently excluded from scheduling
    Retired,
}

impl std::fmt::Display for QueueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Empty => "empty",
            Self::Ready => "ready",
            Self::InProcess => "in_process",
            Self::Snoozed => "snoozed",
            Self::Retired => "retired",
        };
        write!(f, "{}", s)
    }
}

/// A pending record with its intra-tier arrival sequence
#[derive(Debug, Clone)]
struct PendingEntry {
    seq: u64,
    record: UriRecord,
}

// Reverse comparison so the lowest (precedence, seq) pair is popped first
// from the max-heap: strict precedence-tier order, FIFO within tier.
impl Ord for PendingEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .record
            .precedence
            .cmp(&self.record.precedence)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PendingEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PendingEntry {
    fn eq(&self, other: &Self) -> bool {
        self.record.precedence == other.record.precedence && self.seq == other.seq
    }
}

impl Eq for PendingEntry {}

/// All pending/active records sharing one queue key
#[derive(Debug)]
pub struct WorkQueue {
    /// The grouping key (typically the target host)
    pub key: String,

    /// Pending records, precedence-tiered FIFO
    pending: BinaryHeap<PendingEntry>,

    /// Arrival counter for FIFO order within a tier
    next_seq: u64,

    /// Records currently handed out to workers
    pub in_flight: u32,

    /// In-flight ceiling for this queue
    pub concurrency: u32,

    /// Next-allowed-contact time; None means contact is allowed now
    pub wake_at: Option<Instant>,

    /// Permanently excluded from scheduling
    pub retired: bool,

    /// True while the key sits in the scheduler's ready ring or snooze heap
    pub scheduled: bool,

    /// Terminal records completed from this queue
    pub completed: u64,

    /// Bytes fetched for this queue
    pub bytes_fetched: u64,
}

impl WorkQueue {
    /// Creates an empty queue for a key
    pub fn new(key: String, concurrency: u32) -> Self {
        Self {
            key,
            pending: BinaryHeap::new(),
            next_seq: 0,
            in_flight: 0,
            concurrency: concurrency.max(1),
            wake_at: None,
            retired: false,
            scheduled: false,
            completed: 0,
            bytes_fetched: 0,
        }
    }

    /// Adds a record; returns false if the queue is retired
    pub fn enqueue(&mut self, record: UriRecord) -> bool {
        if self.retired {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(PendingEntry { seq, record });
        true
    }

    /// Pops the head record per precedence/FIFO order
    pub fn pop_next(&mut self) -> Option<UriRecord> {
        self.pending.pop().map(|entry| entry.record)
    }

    /// Number of pending records
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// True when another record may be dispatched without breaching the cap
    pub fn under_concurrency(&self) -> bool {
        self.in_flight < self.concurrency
    }

    /// True when the politeness window has elapsed
    pub fn is_awake(&self, now: Instant) -> bool {
        match self.wake_at {
            Some(wake) => now >= wake,
            None => true,
        }
    }

    /// True when a dispatch from this queue is allowed right now
    pub fn is_dispatchable(&self, now: Instant) -> bool {
        !self.retired && self.has_pending() && self.under_concurrency() && self.is_awake(now)
    }

    /// Sets the next-allowed-contact time, never moving it earlier
    pub fn snooze_until(&mut self, until: Instant) {
        match self.wake_at {
            Some(existing) if existing >= until => {}
            _ => self.wake_at = Some(until),
        }
    }

    /// Derives the observable state at `now`
    pub fn state(&self, now: Instant) -> QueueState {
        if self.retired {
            QueueState::Retired
        } else if self.in_flight > 0 {
            QueueState::InProcess
        } else if !self.has_pending() {
            QueueState::Empty
        } else if !self.is_awake(now) {
            QueueState::Snoozed
        } else {
            QueueState::Ready
        }
    }

    /// Retires the queue, draining and returning its pending records
    pub fn retire(&mut self) -> Vec<UriRecord> {
        self.retired = true;
        let mut dropped = Vec::with_capacity(self.pending.len());
        while let Some(entry) = self.pending.pop() {
            dropped.push(entry.record);
        }
        dropped
    }

    /// Clones out the pending records in dispatch order, for checkpointing
    pub fn pending_records(&self) -> Vec<UriRecord> {
        let mut heap = self.pending.clone();
        let mut records = Vec::with_capacity(heap.len());
        while let Some(entry) = heap.pop() {
            records.push(entry.record);
        }
        records
    }
}
