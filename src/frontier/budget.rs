//! Crawl-wide budget accounting
//!
//! Counters are atomic so every admission and every outcome can update them
//! without taking a lock. Per-queue caps live on the queues themselves; this
//! ledger enforces the crawl-wide caps.

use crate::config::BudgetSettings;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Crawl-wide budget scope that ran out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetScope {
    Uris,
    Bytes,
    Time,
}

impl std::fmt::Display for BudgetScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Uris => "uris",
            Self::Bytes => "bytes",
            Self::Time => "time",
        };
        write!(f, "{}", s)
    }
}

/// Atomic URI/byte/time counters checked against configured caps
pub struct BudgetLedger {
    limits: BudgetSettings,
    uris_admitted: AtomicU64,
    bytes_fetched: AtomicU64,
    started_at: Instant,
    /// Elapsed time carried over from a recovered crawl
    prior_elapsed: Duration,
}

impl BudgetLedger {
    pub fn new(limits: BudgetSettings) -> Self {
        Self {
            limits,
            uris_admitted: AtomicU64::new(0),
            bytes_fetched: AtomicU64::new(0),
            started_at: Instant::now(),
            prior_elapsed: Duration::ZERO,
        }
    }

    /// Rebuilds a ledger from checkpointed counters
    pub fn restore(limits: BudgetSettings, uris: u64, bytes: u64, prior_elapsed: Duration) -> Self {
        Self {
            limits,
            uris_admitted: AtomicU64::new(uris),
            bytes_fetched: AtomicU64::new(bytes),
            started_at: Instant::now(),
            prior_elapsed,
        }
    }

    /// Claims one URI admission; returns false when the URI cap is reached
    pub fn try_admit_uri(&self) -> bool {
        match self.limits.max_uris {
            Some(max) => {
                // fetch_update keeps concurrent admits from overshooting the cap
                self.uris_admitted
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                        if current < max {
                            Some(current + 1)
                        } else {
                            None
                        }
                    })
                    .is_ok()
            }
            None => {
                self.uris_admitted.fetch_add(1, Ordering::Relaxed);
                true
            }
        }
    }

    /// Adds fetched bytes to the crawl-wide total
    pub fn record_bytes(&self, bytes: u64) {
        if bytes > 0 {
            self.bytes_fetched.fetch_add(bytes, Ordering::Relaxed);
        }
    }

    /// Total elapsed crawl time, including time before a recovery
    pub fn elapsed(&self) -> Duration {
        self.prior_elapsed + self.started_at.elapsed()
    }

    /// Returns the first exhausted crawl-wide scope, if any
    pub fn exhausted(&self) -> Option<BudgetScope> {
        if let Some(max) = self.limits.max_uris {
            if self.uris_admitted.load(Ordering::Relaxed) >= max {
                return Some(BudgetScope::Uris);
            }
        }
        if let Some(max) = self.limits.max_bytes {
            if self.bytes_fetched.load(Ordering::Relaxed) >= max {
                return Some(BudgetScope::Bytes);
            }
        }
        if let Some(max_secs) = self.limits.max_crawl_seconds {
            if self.elapsed() >= Duration::from_secs(max_secs) {
                return Some(BudgetScope::Time);
            }
        }
        None
    }

    pub fn uris_admitted(&self) -> u64 {
        self.uris_admitted.load(Ordering::Relaxed)
    }

    pub fn bytes_fetched(&self) -> u64 {
        self.bytes_fetched.load(Ordering::Relaxed)
    }

    /// Per-queue completed-URI cap from configuration
    pub fn max_queue_uris(&self) -> Option<u64> {
        self.limits.max_queue_uris
    }
}
