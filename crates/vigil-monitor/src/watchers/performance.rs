//! Performance watcher.
//!
//! Pulls the tracked serving metric and breaches when it falls below the
//! configured threshold for `hysteresis_n` consecutive checks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument};
use vigil_types::{CollabError, MetricSource, RetrainReason, RetrainRequest};

use super::{Watcher, WatcherKind};
use crate::config::MonitorConfig;
use crate::error::{MonitorError, MonitorResult};
use crate::state::WatcherState;

/// Watches one serving metric against the performance threshold.
pub struct PerformanceWatcher {
    source: Arc<dyn MetricSource>,
    metric: String,
    threshold: f64,
    hysteresis_n: u32,
    interval: Duration,
    timeout: Duration,
    state: WatcherState,
}

impl PerformanceWatcher {
    pub fn new(source: Arc<dyn MetricSource>, config: &MonitorConfig) -> Self {
        Self {
            source,
            metric: config.performance_metric.clone(),
            threshold: config.performance_threshold,
            hysteresis_n: config.hysteresis_n,
            interval: config.performance_interval,
            timeout: config.metric_timeout,
            state: WatcherState::new(),
        }
    }
}

#[async_trait]
impl Watcher for PerformanceWatcher {
    fn kind(&self) -> WatcherKind {
        WatcherKind::Performance
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    #[instrument(skip(self), fields(watcher = "performance"))]
    async fn check(&mut self) -> MonitorResult<Option<RetrainRequest>> {
        let result =
            tokio::time::timeout(self.timeout, self.source.current_performance()).await;

        let metrics = match result {
            Ok(Ok(metrics)) => metrics,
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

        let value = match metrics.get(&self.metric) {
            Some(value) => *value,
            None => {
                self.state.record_failure();
                return Err(MonitorError::MetricSource(CollabError::Failed(format!(
                    "metric source did not report '{}'",
                    self.metric
                ))));
            }
        };

        if value < self.threshold {
            if self.state.record_breach(value, self.hysteresis_n) {
                self.state.reset_breaches();
                info!(
                    metric = %self.metric,
                    value,
                    threshold = self.threshold,
                    "performance degraded, requesting retrain"
                );
                return Ok(Some(RetrainRequest::new(
                    RetrainReason::PerformanceDegradation,
                )));
            }
            Ok(None)
        } else {
            self.state.record_clear(value);
            Ok(None)
        }
    }

    fn state(&self) -> &WatcherState {
        &self.state
    }
}
