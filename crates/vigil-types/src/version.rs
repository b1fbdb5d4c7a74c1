//! Model version records and their lifecycle.
//!
//! A `ModelVersion` describes one trained, storable model. Exactly one
//! version is `Active` at any time; candidates are transient and never
//! visible to serving traffic.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::ids::VersionId;

/// Opaque handle into the artifact store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a model version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionStatus {
    /// Freshly trained, owned by the coordinator, not yet serving.
    Candidate,

    /// The version currently serving predictions.
    Active,

    /// Superseded by a newer active version; retained for rollback.
    Retired,

    /// The version failed validation or deployment.
    Failed,
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionStatus::Candidate => write!(f, "candidate"),
            VersionStatus::Active => write!(f, "active"),
            VersionStatus::Retired => write!(f, "retired"),
            VersionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One trained, storable model version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelVersion {
    /// Unique identifier for this version.
    pub id: VersionId,

    /// Time the version was created (end of training).
    pub created_at: DateTime<Utc>,

    /// Handle to the stored artifact.
    pub artifact_ref: ArtifactRef,

    /// Metric name -> value, captured at validation time.
    pub metrics: HashMap<String, f64>,

    /// Current lifecycle status.
    pub status: VersionStatus,

    /// Time the version last left active service. Promotion order stops
    /// tracking retirement recency once a rollback has happened, so the
    /// rollback target is chosen by this timestamp, not log position.
    #[serde(default)]
    pub retired_at: Option<DateTime<Utc>>,

    /// Interface/schema version the artifact declares.
    pub schema_version: Version,
}

impl ModelVersion {
    /// Create a new candidate version for a freshly trained artifact.
    pub fn candidate(artifact_ref: ArtifactRef, schema_version: Version) -> Self {
        Self {
            id: VersionId::generate(),
            created_at: Utc::now(),
            artifact_ref,
            metrics: HashMap::new(),
            status: VersionStatus::Candidate,
            retired_at: None,
            schema_version,
        }
    }

    /// Whether this version is currently serving.
    pub fn is_active(&self) -> bool {
        self.status == VersionStatus::Active
    }

    /// Move this version out of active service, stamping the retirement.
    pub fn retire(&mut self) {
        self.status = VersionStatus::Retired;
        self.retired_at = Some(Utc::now());
    }

    /// When this version last stopped serving, falling back to creation
    /// time for versions that never carried a retirement stamp.
    pub fn retired_or_created_at(&self) -> DateTime<Utc> {
        self.retired_at.unwrap_or(self.created_at)
    }

    /// Age of this version.
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.created_at)
    }
}
