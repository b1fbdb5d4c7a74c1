//! Degradation signal watchers.
//!
//! One watcher per signal, each with its own cadence and failure domain:
//! performance, drift, schedule, and resources. The first three emit
//! retrain requests; the resource watcher only feeds the resource governor
//! and raises operational alerts.

mod drift;
mod performance;
mod resource;
mod schedule;

pub use drift::DriftWatcher;
pub use performance::PerformanceWatcher;
pub use resource::ResourceWatcher;
pub use schedule::ScheduleWatcher;

use std::time::Duration;

use async_trait::async_trait;
use vigil_types::RetrainRequest;

use crate::error::MonitorResult;
use crate::state::WatcherState;

/// Which signal a watcher observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherKind {
    /// Serving accuracy/AUC against the performance threshold.
    Performance,
    /// Distributional distance against the drift threshold.
    Drift,
    /// Elapsed time since the active version was trained.
    Schedule,
    /// Host CPU/memory/disk ceilings.
    Resource,
}

impl std::fmt::Display for WatcherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatcherKind::Performance => write!(f, "performance"),
            WatcherKind::Drift => write!(f, "drift"),
            WatcherKind::Schedule => write!(f, "schedule"),
            WatcherKind::Resource => write!(f, "resource"),
        }
    }
}

/// A periodic observer of one degradation signal.
///
/// `check` is invoked by the supervisor on this watcher's own interval.
/// A collaborator failure surfaces as an error; the supervisor logs it,
/// applies backoff, and retries on the next tick. Watcher failures never
/// crash the supervisor.
#[async_trait]
pub trait Watcher: Send {
    /// The signal this watcher observes.
    fn kind(&self) -> WatcherKind;

    /// Interval between checks.
    fn interval(&self) -> Duration;

    /// Evaluate the signal once, emitting a request when the trigger
    /// condition has held for the configured hysteresis.
    async fn check(&mut self) -> MonitorResult<Option<RetrainRequest>>;

    /// Per-watcher memory, for diagnostics.
    fn state(&self) -> &WatcherState;
}
