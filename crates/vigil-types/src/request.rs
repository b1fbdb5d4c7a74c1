//! Retrain requests emitted by watchers.
//!
//! Requests are ordered by reason priority first, then by submission time,
//! so a manual request always preempts a scheduled one and ties go to the
//! earlier submitter.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a retrain was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetrainReason {
    /// An operator explicitly requested retraining.
    Manual,

    /// Serving accuracy fell below the configured threshold.
    PerformanceDegradation,

    /// Input distribution drifted from the training reference.
    DataDrift,

    /// The active model exceeded its scheduled retrain interval.
    Scheduled,
}

impl RetrainReason {
    /// Priority of this reason (higher = more urgent).
    pub fn priority(&self) -> u8 {
        match self {
            RetrainReason::Manual => 3,
            RetrainReason::PerformanceDegradation => 2,
            RetrainReason::DataDrift => 1,
            RetrainReason::Scheduled => 0,
        }
    }
}

impl fmt::Display for RetrainReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrainReason::Manual => write!(f, "manual"),
            RetrainReason::PerformanceDegradation => write!(f, "performance_degradation"),
            RetrainReason::DataDrift => write!(f, "data_drift"),
            RetrainReason::Scheduled => write!(f, "scheduled"),
        }
    }
}

/// A unit of retrain work submitted by a watcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrainRequest {
    /// Why the retrain was requested.
    pub reason: RetrainReason,

    /// Time the request was submitted.
    pub submitted_at: DateTime<Utc>,
}

impl RetrainRequest {
    /// Create a request submitted now.
    pub fn new(reason: RetrainReason) -> Self {
        Self {
            reason,
            submitted_at: Utc::now(),
        }
    }

    /// Priority derived from the reason.
    pub fn priority(&self) -> u8 {
        self.reason.priority()
    }
}

impl Eq for RetrainRequest {}

impl Ord for RetrainRequest {
    /// Higher priority first; within the same priority, earlier submission
    /// wins (documented tiebreak).
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority()
            .cmp(&other.priority())
            .then_with(|| other.submitted_at.cmp(&self.submitted_at))
    }
}

impl PartialOrd for RetrainRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
