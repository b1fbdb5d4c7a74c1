//! Watchers and the monitor supervisor for VIGIL.
//!
//! Each watcher observes one degradation signal (serving performance,
//! input drift, elapsed schedule, host resources) on its own cadence and
//! its own failure domain. Trigger conditions feed a deduplicating
//! priority queue consumed by the retrain coordinator.

pub mod backoff;
pub mod config;
pub mod error;
pub mod queue;
pub mod state;
pub mod supervisor;
pub mod watchers;

pub use backoff::Backoff;
pub use config::MonitorConfig;
pub use error::{MonitorError, MonitorResult};
pub use queue::RequestQueue;
pub use state::WatcherState;
pub use supervisor::MonitorSupervisor;
pub use watchers::{
    DriftWatcher, PerformanceWatcher, ResourceWatcher, ScheduleWatcher, Watcher, WatcherKind,
};
