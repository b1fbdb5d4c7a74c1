//! Retrain attempt phases and outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a retrain attempt currently is.
///
/// Published through a watch channel so operators can observe the
/// controller without touching its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrainPhase {
    /// No attempt in progress.
    Idle,

    /// Fetching fresh training and test data.
    Fetching,

    /// Fitting the candidate model under the training watchdog.
    Training,

    /// Running the validation gates.
    Validating,

    /// Persisting the candidate and swapping the active pointer.
    Deploying,

    /// Restoring the previous version after a failed deployment.
    RollingBack,
}

impl fmt::Display for RetrainPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrainPhase::Idle => write!(f, "idle"),
            RetrainPhase::Fetching => write!(f, "fetching"),
            RetrainPhase::Training => write!(f, "training"),
            RetrainPhase::Validating => write!(f, "validating"),
            RetrainPhase::Deploying => write!(f, "deploying"),
            RetrainPhase::RollingBack => write!(f, "rolling_back"),
        }
    }
}

/// Terminal outcome of one retrain attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    /// The candidate passed validation and is now active.
    Deployed,

    /// The validator rejected the candidate; the previous version stays
    /// active.
    Rejected,

    /// A phase exceeded its time budget and the attempt was cancelled.
    Aborted,

    /// A collaborator or store failure ended the attempt.
    Error,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Deployed => write!(f, "deployed"),
            AttemptOutcome::Rejected => write!(f, "rejected"),
            AttemptOutcome::Aborted => write!(f, "aborted"),
            AttemptOutcome::Error => write!(f, "error"),
        }
    }
}
