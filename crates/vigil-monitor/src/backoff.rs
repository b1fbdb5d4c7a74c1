//! Capped exponential backoff for failing collaborator calls.

use std::time::Duration;

/// Exponential backoff with a ceiling.
///
/// A watcher whose metric source keeps failing doubles its delay on each
/// failure up to `max`, then resets on the next success.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Option<Duration>,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            current: None,
        }
    }

    /// Register a failure and return the delay to apply before the next
    /// attempt.
    pub fn next_delay(&mut self) -> Duration {
        let next = match self.current {
            None => self.base,
            Some(current) => current.saturating_mul(2).min(self.max),
        };
        self.current = Some(next);
        next
    }

    /// Register a success; the next failure starts from `base` again.
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Delay currently in effect, if any.
    pub fn current(&self) -> Option<Duration> {
        self.current
    }
}
