//! Schedule watcher.
//!
//! Breaches when the active version's age reaches the configured retrain
//! interval. Elapsed time is monotonic, so no hysteresis applies; queue
//! dedup keeps repeated breaches from piling up.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use vigil_types::{RetrainReason, RetrainRequest, SharedStatus, VersionId};

use super::{Watcher, WatcherKind};
use crate::config::MonitorConfig;
use crate::error::MonitorResult;
use crate::state::WatcherState;

/// Resolves a version id to its training timestamp.
///
/// Injected so the watcher does not depend on the registry crate.
type VersionTimestampLookup = dyn Fn(&VersionId) -> Option<DateTime<Utc>> + Send + Sync;

/// Watches the age of the active version.
pub struct ScheduleWatcher {
    status: SharedStatus,
    created_at_lookup: Arc<VersionTimestampLookup>,
    retrain_interval: Duration,
    interval: Duration,
    state: WatcherState,
}

impl ScheduleWatcher {
    pub fn new<F>(status: SharedStatus, created_at_lookup: F, config: &MonitorConfig) -> Self
    where
        F: Fn(&VersionId) -> Option<DateTime<Utc>> + Send + Sync + 'static,
    {
        Self {
            status,
            created_at_lookup: Arc::new(created_at_lookup),
            retrain_interval: config.retrain_interval,
            interval: config.schedule_interval,
            state: WatcherState::new(),
        }
    }
}

#[async_trait]
impl Watcher for ScheduleWatcher {
    fn kind(&self) -> WatcherKind {
        WatcherKind::Schedule
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    #[instrument(skip(self), fields(watcher = "schedule"))]
    async fn check(&mut self) -> MonitorResult<Option<RetrainRequest>> {
        let Some(version_id) = self.status.current_version_id() else {
            debug!("no active version; schedule watcher idle");
            return Ok(None);
        };

        let Some(created_at) = (self.created_at_lookup)(&version_id) else {
            debug!(%version_id, "active version not found in registry");
            return Ok(None);
        };

        let elapsed = Utc::now()
            .signed_duration_since(created_at)
            .to_std()
            .unwrap_or(Duration::ZERO);

        if elapsed >= self.retrain_interval {
            self.state.record_breach(elapsed.as_secs_f64(), 1);
            self.state.reset_breaches();
            info!(
                %version_id,
                elapsed_secs = elapsed.as_secs(),
                interval_secs = self.retrain_interval.as_secs(),
                "active model past retrain interval, requesting retrain"
            );
            return Ok(Some(RetrainRequest::new(RetrainReason::Scheduled)));
        }

        self.state.record_clear(elapsed.as_secs_f64());
        Ok(None)
    }

    fn state(&self) -> &WatcherState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn config_with_interval(secs: u64) -> MonitorConfig {
        MonitorConfig {
            retrain_interval: Duration::from_secs(secs),
            ..MonitorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_no_active_version_is_idle() {
        let status = SharedStatus::new();
        let mut watcher =
            ScheduleWatcher::new(status, |_: &VersionId| None, &config_with_interval(60));

        assert!(watcher.check().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fresh_version_does_not_trigger() {
        let status = SharedStatus::new();
        status.set_current_version(Some(VersionId::generate()));

        let mut watcher = ScheduleWatcher::new(
            status,
            |_: &VersionId| Some(Utc::now()),
            &config_with_interval(3600),
        );

        assert!(watcher.check().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_version_triggers() {
        let status = SharedStatus::new();
        status.set_current_version(Some(VersionId::generate()));

        let mut watcher = ScheduleWatcher::new(
            status,
            |_: &VersionId| Some(Utc::now() - ChronoDuration::hours(2)),
            &config_with_interval(3600),
        );

        let request = watcher.check().await.unwrap().expect("stale model triggers");
        assert_eq!(request.reason, RetrainReason::Scheduled);
    }
}
