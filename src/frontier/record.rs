//! URI records, fetch outcomes, and retirement bookkeeping
//!
//! A `UriRecord` is one unit of crawl work. It is created when a candidate
//! URI passes the uniqueness filter, mutated by the scheduler on each
//! dispatch and outcome, and retired when it completes, exhausts its
//! attempts, or its budget scope runs out.

use chrono::{DateTime, Utc};
use std::time::Duration;
use url::Url;

/// How a URI entered the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoverySource {
    /// Configured or operator-added seed
    Seed,
    /// Extracted link, with the parent URI and hop count from the seed
    Link { parent: String, hop: u32 },
    /// Redirect target reported by a fetch worker
    Redirect { parent: String },
}

impl DiscoverySource {
    /// Database string for the source kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Link { .. } => "link",
            Self::Redirect { .. } => "redirect",
        }
    }

    /// Parent URI, if this source has one
    pub fn parent(&self) -> Option<&str> {
        match self {
            Self::Seed => None,
            Self::Link { parent, .. } | Self::Redirect { parent } => Some(parent),
        }
    }

    /// Hop count from the nearest seed
    pub fn hop(&self) -> u32 {
        match self {
            Self::Seed => 0,
            Self::Link { hop, .. } => *hop,
            Self::Redirect { .. } => 0,
        }
    }

    /// Reassembles a source from its persisted parts
    pub fn from_parts(kind: &str, parent: Option<String>, hop: u32) -> Option<Self> {
        match kind {
            "seed" => Some(Self::Seed),
            "link" => Some(Self::Link {
                parent: parent?,
                hop,
            }),
            "redirect" => Some(Self::Redirect { parent: parent? }),
            _ => None,
        }
    }
}

/// One unit of crawl work
///
/// The canonical URI is immutable once admitted; the attempt count only
/// increases; precedence may be lowered (made more urgent) but never raised.
#[derive(Debug, Clone)]
pub struct UriRecord {
    /// Canonical URI, the deduplication identity
    pub canonical: Url,

    /// The URI string as originally submitted
    pub original: String,

    /// How this URI was discovered
    pub source: DiscoverySource,

    /// Queue key the record is assigned to
    pub queue_key: String,

    /// Precedence tier (lower dispatches first)
    pub precedence: u8,

    /// Number of dispatches so far
    pub attempts: u32,

    /// When the record was last handed to a worker
    pub scheduled_at: Option<DateTime<Utc>>,

    /// Status code of the last fetch outcome, if any
    pub last_status: Option<u16>,

    /// Error message of the last failed outcome, if any
    pub last_error: Option<String>,

    /// Content digest from a prior successful fetch, for revisit detection
    pub prior_digest: Option<String>,
}

impl UriRecord {
    /// Creates a fresh record for an admitted URI
    pub fn new(
        canonical: Url,
        original: String,
        source: DiscoverySource,
        queue_key: String,
        precedence: u8,
    ) -> Self {
        Self {
            canonical,
            original,
            source,
            queue_key,
            precedence,
            attempts: 0,
            scheduled_at: None,
            last_status: None,
            last_error: None,
            prior_digest: None,
        }
    }

    /// Lowers the precedence number (raises urgency); never raises it
    pub fn lower_precedence(&mut self, precedence: u8) {
        if precedence < self.precedence {
            self.precedence = precedence;
        }
    }
}

/// Outcome of a fetch, reported by a worker via `Frontier::finished`
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The fetch completed; the record retires (or is resubmitted for
    /// revisit by the embedding policy)
    Success {
        status: u16,
        bytes: u64,
        fetch_duration: Duration,
        /// Server-advised delay (Retry-After, crawl-delay)
        server_delay: Option<Duration>,
        /// Digest of the fetched content, for revisit detection
        content_digest: Option<String>,
    },

    /// Transient failure; re-enqueued with backoff up to the attempt ceiling
    Retryable {
        error: String,
        fetch_duration: Duration,
        server_delay: Option<Duration>,
    },

    /// Permanent failure; retired immediately
    Fatal { error: String },

    /// Precondition not yet met (robots, DNS); re-enqueued without
    /// incrementing the attempt count
    Deferred { reason: String },
}

impl FetchOutcome {
    /// Database/log string for the outcome class
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Retryable { .. } => "retryable",
            Self::Fatal { .. } => "fatal",
            Self::Deferred { .. } => "deferred",
        }
    }

    /// Observed fetch duration, where one exists
    pub fn fetch_duration(&self) -> Option<Duration> {
        match self {
            Self::Success { fetch_duration, .. } | Self::Retryable { fetch_duration, .. } => {
                Some(*fetch_duration)
            }
            _ => None,
        }
    }

    /// Server-advised delay, where one was reported
    pub fn server_delay(&self) -> Option<Duration> {
        match self {
            Self::Success { server_delay, .. } | Self::Retryable { server_delay, .. } => {
                *server_delay
            }
            _ => None,
        }
    }

    /// Bytes transferred by this fetch
    pub fn bytes(&self) -> u64 {
        match self {
            Self::Success { bytes, .. } => *bytes,
            _ => 0,
        }
    }
}

/// Why a record left the frontier for good
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetireReason {
    /// Fetch succeeded and no retry is warranted
    Completed,
    /// Retryable failures reached the attempt ceiling
    MaxRetriesExceeded,
    /// A fatal failure was reported
    Fatal,
    /// The record's budget scope was exhausted
    BudgetExceeded,
}

impl RetireReason {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::MaxRetriesExceeded => "max_retries_exceeded",
            Self::Fatal => "fatal",
            Self::BudgetExceeded => "budget_exceeded",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "max_retries_exceeded" => Some(Self::MaxRetriesExceeded),
            "fatal" => Some(Self::Fatal),
            "budget_exceeded" => Some(Self::BudgetExceeded),
            _ => None,
        }
    }
}

impl std::fmt::Display for RetireReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Event emitted to archival/statistics collaborators when a record retires
#[derive(Debug, Clone)]
pub struct CompletedRecord {
    pub uri: String,
    pub queue_key: String,
    pub reason: RetireReason,
    pub status: Option<u16>,
    pub bytes: u64,
    pub attempts: u32,
    /// True when the fetched content digest matched the prior fetch
    pub identical_revisit: bool,
    pub finished_at: DateTime<Utc>,
}
