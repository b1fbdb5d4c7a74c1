//! Drift watcher.
//!
//! Pulls the distributional-distance score between recent inputs and the
//! training reference; breaches when it exceeds the drift threshold for
//! `hysteresis_n` consecutive checks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument};
use vigil_types::{CollabError, MetricSource, RetrainReason, RetrainRequest};

use super::{Watcher, WatcherKind};
use crate::config::MonitorConfig;
use crate::error::{MonitorError, MonitorResult};
use crate::state::WatcherState;

/// Watches the drift score against the drift threshold.
pub struct DriftWatcher {
    source: Arc<dyn MetricSource>,
    threshold: f64,
    hysteresis_n: u32,
    interval: Duration,
    timeout: Duration,
    state: WatcherState,
}

impl DriftWatcher {
    pub fn new(source: Arc<dyn MetricSource>, config: &MonitorConfig) -> Self {
        Self {
            source,
            threshold: config.drift_threshold,
            hysteresis_n: config.hysteresis_n,
            interval: config.drift_interval,
            timeout: config.metric_timeout,
            state: WatcherState::new(),
        }
    }
}

#[async_trait]
impl Watcher for DriftWatcher {
    fn kind(&self) -> WatcherKind {
        WatcherKind::Drift
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    #[instrument(skip(self), fields(watcher = "drift"))]
    async fn check(&mut self) -> MonitorResult<Option<RetrainRequest>> {
        let result = tokio::time::timeout(self.timeout, self.source.current_drift_score()).await;

        let score = match result {
            Ok(Ok(score)) => score,
            Ok(Err(e)) => {
                self.state.record_failure();
                return Err(MonitorError::MetricSource(e));
            }
            Err(_) => {
                self.state.record_failure();
                return Err(MonitorError::MetricSource(CollabError::Timeout(
                    self.timeout,
                )));
            }
        };

        if score > self.threshold {
            if self.state.record_breach(score, self.hysteresis_n) {
                self.state.reset_breaches();
                info!(
                    score,
                    threshold = self.threshold,
                    "input drift detected, requesting retrain"
                );
                return Ok(Some(RetrainRequest::new(RetrainReason::DataDrift)));
            }
            Ok(None)
        } else {
            self.state.record_clear(score);
            Ok(None)
        }
    }

    fn state(&self) -> &WatcherState {
        &self.state
    }
}
