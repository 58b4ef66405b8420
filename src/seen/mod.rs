//! Uniqueness filter: the persistent already-scheduled set
//!
//! Every candidate URI passes through this filter exactly once on its way
//! into a work queue. The filter stores 64-bit fingerprints of canonical
//! URIs in a set sharded by fingerprint, so concurrent submitters for
//! unrelated URIs never contend on the same lock. Admission is atomic: of
//! two concurrent `admit` calls for the same fingerprint, exactly one
//! returns true.
//!
//! The set is exact (no false positives); the fingerprint width is the
//! collision trade-off. Entries are append-only for the crawl's lifetime
//! and removed only by an explicit reset between crawls.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Mutex;

/// Number of lock shards; must be a power of two
const SHARD_COUNT: usize = 64;

/// Computes the 64-bit fingerprint of a canonical URI string
///
/// The fingerprint is the big-endian first 8 bytes of the SHA-256 digest.
pub fn fingerprint(canonical: &str) -> u64 {
    let digest = Sha256::digest(canonical.as_bytes());
    u64::from_be_bytes(digest[..8].try_into().expect("digest is at least 8 bytes"))
}

/// Sharded, exact set of canonical-URI fingerprints
pub struct SeenFilter {
    shards: Vec<Mutex<HashSet<u64>>>,
}

impl SeenFilter {
    /// Creates an empty filter
    pub fn new() -> Self {
        let shards = (0..SHARD_COUNT).map(|_| Mutex::new(HashSet::new())).collect();
        Self { shards }
    }

    fn shard(&self, fp: u64) -> &Mutex<HashSet<u64>> {
        &self.shards[(fp as usize) & (SHARD_COUNT - 1)]
    }

    /// Records a fingerprint, returning true on first admission
    ///
    /// Returns false on every subsequent call for the same fingerprint.
    pub fn admit(&self, fp: u64) -> bool {
        self.shard(fp)
            .lock()
            .expect("seen shard poisoned")
            .insert(fp)
    }

    /// Checks membership without admitting
    pub fn contains(&self, fp: u64) -> bool {
        self.shard(fp)
            .lock()
            .expect("seen shard poisoned")
            .contains(&fp)
    }

    /// Number of admitted fingerprints
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().expect("seen shard poisoned").len())
            .sum()
    }

    /// Returns true if no fingerprint has been admitted
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies out all fingerprints for checkpointing
    pub fn snapshot(&self) -> Vec<u64> {
        let mut all = Vec::with_capacity(self.len());
        for shard in &self.shards {
            all.extend(shard.lock().expect("seen shard poisoned").iter().copied());
        }
        all
    }

    /// Reloads the filter from a snapshot, replacing current contents
    pub fn restore(&self, fingerprints: impl IntoIterator<Item = u64>) {
        self.reset();
        for fp in fingerprints {
            self.admit(fp);
        }
    }

    /// Clears all fingerprints (only valid between crawls)
    pub fn reset(&self) {
        for shard in &self.shards {
            shard.lock().expect("seen shard poisoned").clear();
        }
    }
}

impl Default for SeenFilter {
    fn default() -> Self {
        Self::new()
    }
}
