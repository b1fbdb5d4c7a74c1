//! Shared types for the VIGIL model lifecycle controller.
//!
//! This crate defines the data model shared across the monitor, validator,
//! registry, and coordinator crates: strongly-typed identifiers, the model
//! version lifecycle, retrain requests, the shared controller status, and
//! the contracts for external collaborators (metric source, data loader,
//! trainer, notifier).

pub mod collab;
pub mod ids;
pub mod request;
pub mod status;
pub mod version;

pub use collab::{
    CollabError, CollabResult, DataLoader, Dataset, MetricSource, ModelArtifact, ModelTrainer,
    Notifier, Predictions, ResourceUsage, Severity,
};
pub use ids::{AttemptId, VersionId};
pub use request::{RetrainReason, RetrainRequest};
pub use status::SharedStatus;
pub use version::{ArtifactRef, ModelVersion, VersionStatus};
