//! Contracts for external collaborators.
//!
//! The controller never looks inside a model or a fitting algorithm; it
//! only consumes these traits. Datasets, artifacts, and predictions are
//! opaque values carried between collaborators.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by external collaborators.
#[derive(Debug, Error)]
pub enum CollabError {
    /// The collaborator is temporarily unreachable or has no data.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// The collaborator call exceeded its deadline.
    #[error("collaborator call timed out after {0:?}")]
    Timeout(Duration),

    /// The collaborator reported a failure.
    #[error("collaborator failed: {0}")]
    Failed(String),
}

/// Result type for collaborator calls.
pub type CollabResult<T> = Result<T, CollabError>;

/// An opaque dataset handed to the trainer and validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// Human-readable label (e.g. "train-2026-08-30").
    pub label: String,

    /// Number of rows, for logging only.
    pub rows: usize,

    /// Opaque payload; the controller never inspects it.
    pub payload: Vec<u8>,
}

impl Dataset {
    pub fn new(label: impl Into<String>, rows: usize, payload: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            rows,
            payload,
        }
    }
}

/// An opaque trained model, as produced by the trainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Serialized model bytes; the controller never inspects them.
    pub bytes: Vec<u8>,

    /// Interface/schema version the model declares.
    pub schema_version: Version,
}

impl ModelArtifact {
    pub fn new(bytes: Vec<u8>, schema_version: Version) -> Self {
        Self {
            bytes,
            schema_version,
        }
    }
}

/// Predictions produced by a model over a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    /// One value per input row.
    pub values: Vec<f64>,
}

impl Predictions {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Fraction of predictions identical to `other` (bitwise-equal values).
    ///
    /// Used by the stability gate: repeated runs of a deterministic model
    /// must agree with the first run. Length mismatch counts as zero
    /// agreement.
    pub fn agreement(&self, other: &Predictions) -> f64 {
        if self.values.len() != other.values.len() || self.values.is_empty() {
            return 0.0;
        }
        let matching = self
            .values
            .iter()
            .zip(other.values.iter())
            .filter(|(a, b)| a.to_bits() == b.to_bits())
            .count();
        matching as f64 / self.values.len() as f64
    }
}

/// A point-in-time resource utilization sample (fractions of capacity).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// CPU utilization (0.0-1.0).
    pub cpu: f64,

    /// Memory utilization (0.0-1.0).
    pub memory: f64,

    /// Disk utilization (0.0-1.0).
    pub disk: f64,
}

/// Pull-based oracle for serving metrics, drift, and resource usage.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Current serving performance, metric name -> value.
    async fn current_performance(&self) -> CollabResult<HashMap<String, f64>>;

    /// Distributional distance between recent inputs and the training
    /// reference (e.g. population stability index).
    async fn current_drift_score(&self) -> CollabResult<f64>;

    /// Current host resource utilization.
    async fn current_resource_usage(&self) -> CollabResult<ResourceUsage>;
}

/// Supplies fresh training and held-out test data.
#[async_trait]
pub trait DataLoader: Send + Sync {
    async fn load_training_data(&self) -> CollabResult<Dataset>;

    async fn load_test_data(&self) -> CollabResult<Dataset>;
}

/// Opaque fit/predict/evaluate capability with a time budget.
///
/// `fit` must be cancel-safe: the coordinator drops the future when the
/// training watchdog expires.
#[async_trait]
pub trait ModelTrainer: Send + Sync {
    async fn fit(&self, dataset: &Dataset, time_budget: Duration) -> CollabResult<ModelArtifact>;

    async fn predict(&self, model: &ModelArtifact, dataset: &Dataset) -> CollabResult<Predictions>;

    async fn evaluate(
        &self,
        model: &ModelArtifact,
        dataset: &Dataset,
    ) -> CollabResult<HashMap<String, f64>>;
}

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Informational.
    Info,
    /// Warning.
    Warning,
    /// Error.
    Error,
    /// Critical: human intervention required.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Fire-and-forget delivery of human-readable alerts.
///
/// Best-effort: implementations log failures and never block the control
/// loop.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, severity: Severity, message: &str, context: &HashMap<String, String>);
}
