//! Version manager.
//!
//! Owns the ordered history of deployed versions and the active pointer.
//! Promote and rollback swap the pointer atomically; retention pruning
//! never touches the active version or the most recently retired one, so
//! one rollback step is always possible.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use vigil_types::{ModelArtifact, ModelVersion, SharedStatus, VersionId, VersionStatus};

use crate::error::{RegistryError, RegistryResult};
use crate::store::ArtifactStore;

/// Bounds on how many retired versions are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Maximum number of retired versions to retain. Minimum 1.
    pub max_versions: usize,

    /// Retired versions older than this many days are pruned. Minimum 1.
    pub retention_days: i64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_versions: 5,
            retention_days: 30,
        }
    }
}

impl RetentionPolicy {
    pub fn validate(&self) -> RegistryResult<()> {
        if self.max_versions == 0 {
            return Err(RegistryError::Configuration(
                "max_versions must be at least 1".to_string(),
            ));
        }
        if self.retention_days <= 0 {
            return Err(RegistryError::Configuration(
                "retention_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Manages the model version lifecycle on top of an artifact store.
///
/// The internal version log is ordered by promotion; status mutations
/// happen under one lock so observers see either the old world or the new
/// one, never a mix.
pub struct VersionManager {
    store: Arc<dyn ArtifactStore>,
    status: SharedStatus,
    policy: RetentionPolicy,
    versions: RwLock<Vec<ModelVersion>>,
}

impl VersionManager {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        status: SharedStatus,
        policy: RetentionPolicy,
    ) -> RegistryResult<Self> {
        policy.validate()?;
        Ok(Self {
            store,
            status,
            policy,
            versions: RwLock::new(Vec::new()),
        })
    }

    /// Persist a freshly trained artifact as a transient candidate.
    ///
    /// The candidate is NOT entered into the version log; the caller owns
    /// it until promote or discard.
    #[instrument(skip_all)]
    pub async fn stage_candidate(
        &self,
        artifact: &ModelArtifact,
        metrics: HashMap<String, f64>,
    ) -> RegistryResult<ModelVersion> {
        let mut candidate =
            ModelVersion::candidate(vigil_types::ArtifactRef::new(""), artifact.schema_version.clone());
        let artifact_ref = self.store.write(&candidate.id, artifact).await?;
        candidate.artifact_ref = artifact_ref;
        candidate.metrics = metrics;
        debug!(id = %candidate.id, "candidate staged");
        Ok(candidate)
    }

    /// Delete a rejected or undeployable candidate's artifact.
    ///
    /// If a failed promotion left the candidate in the version log, the
    /// log entry is dropped as well; a version that never served is not a
    /// rollback target.
    pub async fn discard_candidate(&self, candidate: &ModelVersion) -> RegistryResult<()> {
        {
            let mut versions = self.versions.write().expect("version log lock poisoned");
            if candidate.status == VersionStatus::Active
                || versions
                    .iter()
                    .any(|v| v.id == candidate.id && v.status == VersionStatus::Active)
            {
                return Err(RegistryError::ActiveVersionProtected(candidate.id.clone()));
            }
            versions.retain(|v| v.id != candidate.id);
        }
        self.store.delete(&candidate.artifact_ref).await?;
        debug!(id = %candidate.id, "candidate discarded");
        Ok(())
    }

    /// Atomically make a candidate the active serving version.
    ///
    /// The previous active version is retired in the same swap; the shared
    /// status pointer is updated before pruning runs.
    #[instrument(skip(self, candidate), fields(candidate = %candidate.id))]
    pub async fn promote(&self, mut candidate: ModelVersion) -> RegistryResult<ModelVersion> {
        if candidate.status != VersionStatus::Candidate {
            return Err(RegistryError::NotACandidate {
                id: candidate.id.clone(),
                status: candidate.status.to_string(),
            });
        }

        // The artifact must be readable before the pointer moves; a store
        // outage fails the promote with the old version still active.
        self.store.read(&candidate.artifact_ref).await?;

        candidate.status = VersionStatus::Active;
        let promoted = candidate.clone();
        {
            let mut versions = self.versions.write().expect("version log lock poisoned");
            for version in versions.iter_mut() {
                if version.status == VersionStatus::Active {
                    version.retire();
                }
            }
            versions.push(candidate);
        }
        self.status.set_current_version(Some(promoted.id.clone()));
        info!(id = %promoted.id, "version promoted to active");

        self.prune().await?;
        Ok(promoted)
    }

    /// Restore a previous version as active.
    ///
    /// `None` undoes one promotion (most recently retired version).
    /// `Some(id)` targets a retained version; rolling back to the version
    /// that is already active is a no-op.
    #[instrument(skip(self))]
    pub async fn rollback(&self, target: Option<VersionId>) -> RegistryResult<ModelVersion> {
        let target_id = match target {
            Some(id) => {
                let versions = self.versions.read().expect("version log lock poisoned");
                let found = versions
                    .iter()
                    .find(|v| v.id == id)
                    .ok_or(RegistryError::VersionNotFound(id))?;
                if found.status == VersionStatus::Active {
                    return Ok(found.clone());
                }
                found.id.clone()
            }
            None => {
                // Most recent retirement, not most recent promotion; after a
                // rollback those disagree.
                let versions = self.versions.read().expect("version log lock poisoned");
                versions
                    .iter()
                    .filter(|v| v.status == VersionStatus::Retired)
                    .max_by_key(|v| v.retired_or_created_at())
                    .map(|v| v.id.clone())
                    .ok_or(RegistryError::NoRollbackTarget)?
            }
        };

        // Surface store unavailability before any state changes.
        let artifact_ref = {
            let versions = self.versions.read().expect("version log lock poisoned");
            versions
                .iter()
                .find(|v| v.id == target_id)
                .map(|v| v.artifact_ref.clone())
                .ok_or_else(|| RegistryError::VersionNotFound(target_id.clone()))?
        };
        self.store.read(&artifact_ref).await?;

        let restored = {
            let mut versions = self.versions.write().expect("version log lock poisoned");
            for version in versions.iter_mut() {
                if version.status == VersionStatus::Active {
                    version.retire();
                }
            }
            let restored = versions
                .iter_mut()
                .find(|v| v.id == target_id)
                .ok_or_else(|| RegistryError::VersionNotFound(target_id.clone()))?;
            restored.status = VersionStatus::Active;
            restored.retired_at = None;
            restored.clone()
        };
        self.status.set_current_version(Some(restored.id.clone()));
        info!(id = %restored.id, "rolled back to previous version");

        Ok(restored)
    }

    /// Delete retired versions outside the retention window.
    ///
    /// The active version and the most recently retired version are always
    /// preserved. Returns the pruned version ids.
    #[instrument(skip(self))]
    pub async fn prune(&self) -> RegistryResult<Vec<VersionId>> {
        let doomed = {
            let versions = self.versions.read().expect("version log lock poisoned");
            select_prunable(&versions, &self.policy)
        };

        let mut pruned = Vec::new();
        for (id, artifact_ref) in doomed {
            // A missing artifact is not fatal to pruning bookkeeping.
            if let Err(e) = self.store.delete(&artifact_ref).await {
                debug!(%id, error = %e, "artifact already gone during prune");
            }
            pruned.push(id);
        }

        if !pruned.is_empty() {
            let mut versions = self.versions.write().expect("version log lock poisoned");
            versions.retain(|v| !pruned.contains(&v.id));
            info!(count = pruned.len(), "pruned retired versions");
        }

        Ok(pruned)
    }

    /// The currently active version, if any.
    pub fn active_version(&self) -> Option<ModelVersion> {
        self.versions
            .read()
            .expect("version log lock poisoned")
            .iter()
            .find(|v| v.status == VersionStatus::Active)
            .cloned()
    }

    /// Look up a retained version by id.
    pub fn get(&self, id: &VersionId) -> Option<ModelVersion> {
        self.versions
            .read()
            .expect("version log lock poisoned")
            .iter()
            .find(|v| &v.id == id)
            .cloned()
    }

    /// Snapshot of the retained version log, oldest first.
    pub fn history(&self) -> Vec<ModelVersion> {
        self.versions
            .read()
            .expect("version log lock poisoned")
            .clone()
    }

    /// The artifact store backing this manager.
    pub fn store(&self) -> Arc<dyn ArtifactStore> {
        self.store.clone()
    }
}

/// Pure retention selection: retired versions beyond `max_versions` or
/// older than `retention_days`, excluding the most recently retired one.
fn select_prunable(
    versions: &[ModelVersion],
    policy: &RetentionPolicy,
) -> Vec<(VersionId, vigil_types::ArtifactRef)> {
    let cutoff = Utc::now() - ChronoDuration::days(policy.retention_days);

    // Ordered by retirement recency, not log position; a version re-retired
    // after a rollback is newer than log order suggests.
    let mut retired: Vec<&ModelVersion> = versions
        .iter()
        .filter(|v| v.status == VersionStatus::Retired)
        .collect();
    retired.sort_by_key(|v| v.retired_or_created_at());

    let Some((keep_always, rest)) = retired.split_last() else {
        return Vec::new();
    };

    let mut doomed = Vec::new();
    // `rest` is ordered oldest first; the ones beyond the cap are the
    // oldest entries.
    let over_cap = rest.len().saturating_sub(policy.max_versions.saturating_sub(1));
    for (index, version) in rest.iter().enumerate() {
        let beyond_cap = index < over_cap;
        let too_old = version.created_at < cutoff;
        if beyond_cap || too_old {
            doomed.push((version.id.clone(), version.artifact_ref.clone()));
        }
    }

    debug_assert!(doomed.iter().all(|(id, _)| id != &keep_always.id));
    doomed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryArtifactStore;
    use semver::Version;

    fn artifact(tag: u8) -> ModelArtifact {
        ModelArtifact::new(vec![tag], Version::new(1, 0, 0))
    }

    fn manager_with(policy: RetentionPolicy) -> VersionManager {
        VersionManager::new(
            Arc::new(InMemoryArtifactStore::new()),
            SharedStatus::new(),
            policy,
        )
        .unwrap()
    }

    async fn stage_and_promote(manager: &VersionManager, tag: u8) -> ModelVersion {
        let candidate = manager
            .stage_candidate(&artifact(tag), HashMap::new())
            .await
            .unwrap();
        manager.promote(candidate).await.unwrap()
    }

    fn active_count(manager: &VersionManager) -> usize {
        manager
            .history()
            .iter()
            .filter(|v| v.status == VersionStatus::Active)
            .count()
    }

    #[tokio::test]
    async fn test_promote_retires_previous_active() {
        let manager = manager_with(RetentionPolicy::default());

        let first = stage_and_promote(&manager, 1).await;
        let second = stage_and_promote(&manager, 2).await;

        assert_eq!(manager.active_version().unwrap().id, second.id);
        assert_eq!(
            manager.get(&first.id).unwrap().status,
            VersionStatus::Retired
        );
        assert_eq!(active_count(&manager), 1);
    }

    #[tokio::test]
    async fn test_promote_updates_shared_status() {
        let status = SharedStatus::new();
        let manager = VersionManager::new(
            Arc::new(InMemoryArtifactStore::new()),
            status.clone(),
            RetentionPolicy::default(),
        )
        .unwrap();

        let promoted = stage_and_promote(&manager, 1).await;
        assert_eq!(status.current_version_id(), Some(promoted.id));
    }

    #[tokio::test]
    async fn test_promote_rejects_non_candidate() {
        let manager = manager_with(RetentionPolicy::default());
        let promoted = stage_and_promote(&manager, 1).await;

        assert!(matches!(
            manager.promote(promoted).await,
            Err(RegistryError::NotACandidate { .. })
        ));
    }

    #[tokio::test]
    async fn test_rollback_one_step() {
        let manager = manager_with(RetentionPolicy::default());

        let first = stage_and_promote(&manager, 1).await;
        let second = stage_and_promote(&manager, 2).await;

        let restored = manager.rollback(None).await.unwrap();
        assert_eq!(restored.id, first.id);
        assert_eq!(manager.active_version().unwrap().id, first.id);
        assert_eq!(
            manager.get(&second.id).unwrap().status,
            VersionStatus::Retired
        );
        assert_eq!(active_count(&manager), 1);
    }

    #[tokio::test]
    async fn test_one_step_undo_after_prior_rollback() {
        let manager = manager_with(RetentionPolicy::default());

        let first = stage_and_promote(&manager, 1).await;
        let second = stage_and_promote(&manager, 2).await;
        manager.rollback(None).await.unwrap();
        let third = stage_and_promote(&manager, 3).await;

        // `first` was retired again after `second`, so it is the one-step
        // undo target despite sitting earlier in the log.
        let restored = manager.rollback(None).await.unwrap();
        assert_eq!(restored.id, first.id);
        assert_ne!(restored.id, second.id);
        assert_eq!(manager.get(&third.id).unwrap().status, VersionStatus::Retired);
    }

    #[tokio::test]
    async fn test_rollback_to_active_is_noop() {
        let manager = manager_with(RetentionPolicy::default());
        let promoted = stage_and_promote(&manager, 1).await;

        let restored = manager.rollback(Some(promoted.id.clone())).await.unwrap();
        assert_eq!(restored.id, promoted.id);
        assert_eq!(manager.active_version().unwrap().id, promoted.id);
    }

    #[tokio::test]
    async fn test_rollback_to_unknown_version_fails() {
        let manager = manager_with(RetentionPolicy::default());
        stage_and_promote(&manager, 1).await;

        assert!(matches!(
            manager.rollback(Some(VersionId::generate())).await,
            Err(RegistryError::VersionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rollback_without_retired_fails() {
        let manager = manager_with(RetentionPolicy::default());
        stage_and_promote(&manager, 1).await;

        assert!(matches!(
            manager.rollback(None).await,
            Err(RegistryError::NoRollbackTarget)
        ));
    }

    #[tokio::test]
    async fn test_retention_bound() {
        let policy = RetentionPolicy {
            max_versions: 5,
            retention_days: 365,
        };
        let manager = manager_with(policy);

        for tag in 0..12 {
            stage_and_promote(&manager, tag).await;
        }

        let history = manager.history();
        let retired = history
            .iter()
            .filter(|v| v.status == VersionStatus::Retired)
            .count();
        assert!(retired <= 5, "retired count {} exceeds bound", retired);
        assert_eq!(active_count(&manager), 1);

        // The store holds exactly the retained versions.
        let stored = manager.store().list().await.unwrap();
        assert_eq!(stored.len(), history.len());
    }

    #[tokio::test]
    async fn test_prune_keeps_newest_retired() {
        let policy = RetentionPolicy {
            max_versions: 1,
            retention_days: 365,
        };
        let manager = manager_with(policy);

        stage_and_promote(&manager, 1).await;
        let second = stage_and_promote(&manager, 2).await;
        stage_and_promote(&manager, 3).await;

        // With max_versions=1, only the newest retired version survives,
        // so one rollback step stays possible.
        let restored = manager.rollback(None).await.unwrap();
        assert_eq!(restored.id, second.id);
    }

    #[tokio::test]
    async fn test_prune_keeps_latest_retirement_not_latest_promotion() {
        let policy = RetentionPolicy {
            max_versions: 1,
            retention_days: 365,
        };
        let manager = manager_with(policy);

        let first = stage_and_promote(&manager, 1).await;
        let second = stage_and_promote(&manager, 2).await;
        manager.rollback(None).await.unwrap();
        stage_and_promote(&manager, 3).await;

        // `first` retired most recently; `second` is the prunable one.
        let restored = manager.rollback(None).await.unwrap();
        assert_eq!(restored.id, first.id);
        assert!(manager.get(&second.id).is_none());
    }

    #[tokio::test]
    async fn test_active_version_cannot_be_discarded() {
        let manager = manager_with(RetentionPolicy::default());
        let promoted = stage_and_promote(&manager, 1).await;

        assert!(matches!(
            manager.discard_candidate(&promoted).await,
            Err(RegistryError::ActiveVersionProtected(_))
        ));
        assert!(manager.store().read(&promoted.artifact_ref).await.is_ok());
    }

    #[tokio::test]
    async fn test_discard_refuses_stale_snapshot_of_active_version() {
        let manager = manager_with(RetentionPolicy::default());
        let candidate = manager
            .stage_candidate(&artifact(1), HashMap::new())
            .await
            .unwrap();
        manager.promote(candidate.clone()).await.unwrap();

        // The snapshot still says candidate, but the log says active.
        assert!(matches!(
            manager.discard_candidate(&candidate).await,
            Err(RegistryError::ActiveVersionProtected(_))
        ));
        assert!(manager.get(&candidate.id).is_some());
    }

    #[tokio::test]
    async fn test_discard_drops_rolled_back_promotion_from_log() {
        let manager = manager_with(RetentionPolicy::default());
        let baseline = stage_and_promote(&manager, 1).await;

        let candidate = manager
            .stage_candidate(&artifact(2), HashMap::new())
            .await
            .unwrap();
        manager.promote(candidate.clone()).await.unwrap();
        manager.rollback(Some(baseline.id.clone())).await.unwrap();

        // The failed promotion's version never served after the rollback;
        // discarding it removes both the log entry and the artifact.
        manager.discard_candidate(&candidate).await.unwrap();
        assert!(manager.get(&candidate.id).is_none());
        assert!(manager.store().read(&candidate.artifact_ref).await.is_err());
        assert_eq!(manager.active_version().unwrap().id, baseline.id);
    }

    #[tokio::test]
    async fn test_discarded_candidate_leaves_no_artifact() {
        let manager = manager_with(RetentionPolicy::default());
        let candidate = manager
            .stage_candidate(&artifact(7), HashMap::new())
            .await
            .unwrap();

        manager.discard_candidate(&candidate).await.unwrap();
        assert!(manager.store().read(&candidate.artifact_ref).await.is_err());
        assert!(manager.active_version().is_none());
    }

    #[test]
    fn test_select_prunable_age_based() {
        let policy = RetentionPolicy {
            max_versions: 10,
            retention_days: 7,
        };
        let mut old = ModelVersion::candidate(
            vigil_types::ArtifactRef::new("old"),
            Version::new(1, 0, 0),
        );
        old.status = VersionStatus::Retired;
        old.created_at = Utc::now() - ChronoDuration::days(30);

        let mut newest = ModelVersion::candidate(
            vigil_types::ArtifactRef::new("newest"),
            Version::new(1, 0, 0),
        );
        newest.status = VersionStatus::Retired;

        let mut active = ModelVersion::candidate(
            vigil_types::ArtifactRef::new("active"),
            Version::new(1, 0, 0),
        );
        active.status = VersionStatus::Active;

        let versions = vec![old.clone(), newest, active];
        let doomed = select_prunable(&versions, &policy);
        assert_eq!(doomed.len(), 1);
        assert_eq!(doomed[0].0, old.id);
    }

    #[test]
    fn test_policy_validation() {
        assert!(RetentionPolicy::default().validate().is_ok());
        assert!(RetentionPolicy {
            max_versions: 0,
            retention_days: 7
        }
        .validate()
        .is_err());
        assert!(RetentionPolicy {
            max_versions: 3,
            retention_days: 0
        }
        .validate()
        .is_err());
    }
}
