//! Recompute throttling.

use std::time::{Duration, Instant};

/// Default minimum spacing between two status recomputations.
pub const DEFAULT_RECOMPUTE_INTERVAL: Duration = Duration::from_secs(1);

/// Drops recompute requests that arrive too soon after the last one.
#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    last_run: Option<Instant>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_RECOMPUTE_INTERVAL)
    }
}

impl Debouncer {
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
        }
    }

    /// Returns `true` and records the run if a recompute should happen at `at`.
    ///
    /// Forced requests always run.
    pub fn should_run(&mut self, at: Instant, forced: bool) -> bool {
        let due = forced
            || self
                .last_run
                .is_none_or(|last| at.saturating_duration_since(last) >= self.interval);

        if due {
            self.last_run = Some(at);
        }
        due
    }
}
