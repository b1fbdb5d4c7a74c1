//! Retrain coordination for VIGIL.
//!
//! The coordinator consumes retrain requests from the monitor's queue and
//! drives each through fetch, train, validate, deploy with per-phase time
//! budgets. One attempt runs at a time. Failed deployments roll back to
//! the version that was active when the attempt started, and every attempt
//! leaves an entry in the history log.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod governor;
pub mod history;
pub mod notify;
pub mod phase;

pub use config::CoordinatorConfig;
pub use coordinator::RetrainCoordinator;
pub use error::{CoordinatorError, CoordinatorResult};
pub use governor::ResourceGovernor;
pub use history::{HistoryLog, RetrainHistoryEntry};
pub use notify::{FanoutNotifier, TracingNotifier};
pub use phase::{AttemptOutcome, RetrainPhase};
