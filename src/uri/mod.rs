//! URI canonicalization and queue-key derivation
//!
//! The canonical form produced here is the identity used for deduplication,
//! so the same rules must apply at submission time and at any later
//! re-derivation.

mod canonicalize;
mod queue_key;

pub use canonicalize::canonicalize;
pub use queue_key::{queue_key, HostAssignment, QueueAssignment};
