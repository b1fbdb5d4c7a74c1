//! Per-watcher memory.
//!
//! Tracks the last observation and consecutive breach/failure counters so
//! a trigger must hold across `hysteresis_n` checks, not one noisy sample.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State a watcher carries between checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatcherState {
    /// Time of the last completed check.
    pub last_check_at: Option<DateTime<Utc>>,

    /// Value observed at the last successful check.
    pub last_value: Option<f64>,

    /// Consecutive checks whose trigger condition held.
    pub consecutive_breaches: u32,

    /// Consecutive checks whose collaborator call failed.
    pub consecutive_failures: u32,
}

impl WatcherState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a check whose trigger condition held.
    ///
    /// Returns `true` once the breach has persisted for `hysteresis_n`
    /// consecutive checks.
    pub fn record_breach(&mut self, value: f64, hysteresis_n: u32) -> bool {
        self.last_check_at = Some(Utc::now());
        self.last_value = Some(value);
        self.consecutive_breaches += 1;
        self.consecutive_failures = 0;
        self.consecutive_breaches >= hysteresis_n
    }

    /// Record a check whose trigger condition did not hold.
    pub fn record_clear(&mut self, value: f64) {
        self.last_check_at = Some(Utc::now());
        self.last_value = Some(value);
        self.consecutive_breaches = 0;
        self.consecutive_failures = 0;
    }

    /// Record a failed collaborator call.
    ///
    /// Breach counters are left untouched: a flaky metric source must not
    /// reset hysteresis progress.
    pub fn record_failure(&mut self) -> u32 {
        self.last_check_at = Some(Utc::now());
        self.consecutive_failures += 1;
        self.consecutive_failures
    }

    /// Reset counters after a request has been emitted.
    pub fn reset_breaches(&mut self) {
        self.consecutive_breaches = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hysteresis_requires_consecutive_breaches() {
        let mut state = WatcherState::new();

        assert!(!state.record_breach(0.5, 3));
        assert!(!state.record_breach(0.5, 3));
        assert!(state.record_breach(0.5, 3));
    }

    #[test]
    fn test_clear_resets_breach_count() {
        let mut state = WatcherState::new();

        assert!(!state.record_breach(0.5, 2));
        state.record_clear(0.9);
        assert!(!state.record_breach(0.5, 2));
        assert!(state.record_breach(0.5, 2));
    }

    #[test]
    fn test_failure_does_not_reset_breaches() {
        let mut state = WatcherState::new();

        assert!(!state.record_breach(0.5, 2));
        state.record_failure();
        assert!(state.record_breach(0.5, 2));
    }

    #[test]
    fn test_failure_counter_accumulates() {
        let mut state = WatcherState::new();
        assert_eq!(state.record_failure(), 1);
        assert_eq!(state.record_failure(), 2);
        state.record_clear(1.0);
        assert_eq!(state.record_failure(), 1);
    }
}
