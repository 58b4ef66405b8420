//! Politeness delay policy
//!
//! The delay between consecutive fetches to one queue key combines the
//! configured minimum delay, any server-advised delay, and a multiple of
//! the observed fetch duration (slow servers get longer breaks). The exact
//! combination is pluggable.

use crate::config::PolitenessSettings;
use crate::frontier::queue::WorkQueue;
use crate::frontier::record::FetchOutcome;
use std::time::Duration;

/// Computes the next-contact delay for a queue after an outcome
pub trait PolitenessPolicy: Send + Sync {
    fn delay(&self, queue: &WorkQueue, outcome: &FetchOutcome) -> Duration;
}

/// Default policy: `max(min_delay, server_advised, delay_factor × fetch
/// duration)` clamped to `max_delay`
///
/// Deferred outcomes get the minimum delay only; the deferral was not the
/// server's doing.
#[derive(Debug, Clone)]
pub struct DefaultPolitenessPolicy {
    min_delay: Duration,
    max_delay: Duration,
    delay_factor: f64,
}

impl DefaultPolitenessPolicy {
    pub fn new(min_delay: Duration, max_delay: Duration, delay_factor: f64) -> Self {
        Self {
            min_delay,
            max_delay: max_delay.max(min_delay),
            delay_factor,
        }
    }

    pub fn from_settings(settings: &PolitenessSettings) -> Self {
        Self::new(
            Duration::from_millis(settings.min_delay_ms),
            Duration::from_millis(settings.max_delay_ms),
            settings.delay_factor,
        )
    }
}

impl PolitenessPolicy for DefaultPolitenessPolicy {
    fn delay(&self, _queue: &WorkQueue, outcome: &FetchOutcome) -> Duration {
        if matches!(outcome, FetchOutcome::Deferred { .. }) {
            return self.min_delay;
        }

        let mut delay = self.min_delay;

        if let Some(advised) = outcome.server_delay() {
            delay = delay.max(advised);
        }

        if let Some(observed) = outcome.fetch_duration() {
            let scaled = observed.mul_f64(self.delay_factor);
            delay = delay.max(scaled);
        }

        delay.min(self.max_delay)
    }
}
