//! Shared controller status.
//!
//! The one piece of state read by more than one actor: the coordinator and
//! version manager write it, watchers and operators read it. Updates swap
//! whole values under a lock so readers never observe a half-written
//! transition.

use std::sync::{Arc, RwLock};

use crate::ids::VersionId;

#[derive(Debug, Default)]
struct StatusInner {
    is_retraining: bool,
    current_version_id: Option<VersionId>,
}

/// Cloneable handle to the shared controller status.
#[derive(Debug, Clone, Default)]
pub struct SharedStatus {
    inner: Arc<RwLock<StatusInner>>,
}

impl SharedStatus {
    /// Create a status with no active version and no retrain in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a retrain attempt is currently in flight.
    pub fn is_retraining(&self) -> bool {
        self.inner.read().expect("status lock poisoned").is_retraining
    }

    /// The currently active version, if any.
    pub fn current_version_id(&self) -> Option<VersionId> {
        self.inner
            .read()
            .expect("status lock poisoned")
            .current_version_id
            .clone()
    }

    /// Mark the start of a retrain attempt.
    ///
    /// Returns `false` if an attempt was already in flight, in which case
    /// the flag is left untouched. The caller treats that as an invariant
    /// violation.
    pub fn begin_retrain(&self) -> bool {
        let mut inner = self.inner.write().expect("status lock poisoned");
        if inner.is_retraining {
            return false;
        }
        inner.is_retraining = true;
        true
    }

    /// Mark the end of a retrain attempt.
    pub fn end_retrain(&self) {
        self.inner.write().expect("status lock poisoned").is_retraining = false;
    }

    /// Atomically swap the active version pointer.
    pub fn set_current_version(&self, id: Option<VersionId>) {
        self.inner
            .write()
            .expect("status lock poisoned")
            .current_version_id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_retrain_is_exclusive() {
        let status = SharedStatus::new();
        assert!(status.begin_retrain());
        assert!(!status.begin_retrain());
        status.end_retrain();
        assert!(status.begin_retrain());
    }

    #[test]
    fn test_current_version_swap() {
        let status = SharedStatus::new();
        assert!(status.current_version_id().is_none());

        let id = VersionId::generate();
        status.set_current_version(Some(id.clone()));
        assert_eq!(status.current_version_id(), Some(id));
    }

    #[test]
    fn test_clones_share_state() {
        let status = SharedStatus::new();
        let other = status.clone();

        assert!(status.begin_retrain());
        assert!(other.is_retraining());
    }
}
