//! Resource watcher.
//!
//! Unlike the other watchers it never emits retrain requests. It feeds
//! live CPU/memory/disk samples to the coordinator's resource governor and
//! raises an operational alert when a ceiling is crossed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{instrument, warn};
use vigil_types::{CollabError, MetricSource, Notifier, ResourceUsage, RetrainRequest, Severity};

use super::{Watcher, WatcherKind};
use crate::config::MonitorConfig;
use crate::error::{MonitorError, MonitorResult};
use crate::state::WatcherState;

/// Receives each resource sample (the coordinator's resource governor).
type SampleSink = dyn Fn(ResourceUsage) + Send + Sync;

/// Samples host resources, alerting on ceiling breaches.
pub struct ResourceWatcher {
    source: Arc<dyn MetricSource>,
    notifier: Arc<dyn Notifier>,
    sink: Arc<SampleSink>,
    cpu_threshold: f64,
    memory_threshold: f64,
    disk_threshold: f64,
    interval: Duration,
    timeout: Duration,
    over_ceiling: bool,
    state: WatcherState,
}

impl ResourceWatcher {
    pub fn new<F>(
        source: Arc<dyn MetricSource>,
        notifier: Arc<dyn Notifier>,
        sink: F,
        config: &MonitorConfig,
    ) -> Self
    where
        F: Fn(ResourceUsage) + Send + Sync + 'static,
    {
        Self {
            source,
            notifier,
            sink: Arc::new(sink),
            cpu_threshold: config.cpu_threshold,
            memory_threshold: config.memory_threshold,
            disk_threshold: config.disk_threshold,
            interval: config.resource_interval,
            timeout: config.metric_timeout,
            over_ceiling: false,
            state: WatcherState::new(),
        }
    }

    fn breaches(&self, usage: &ResourceUsage) -> Vec<(&'static str, f64, f64)> {
        let mut breaches = Vec::new();
        if usage.cpu > self.cpu_threshold {
            breaches.push(("cpu", usage.cpu, self.cpu_threshold));
        }
        if usage.memory > self.memory_threshold {
            breaches.push(("memory", usage.memory, self.memory_threshold));
        }
        if usage.disk > self.disk_threshold {
            breaches.push(("disk", usage.disk, self.disk_threshold));
        }
        breaches
    }
}

#[async_trait]
impl Watcher for ResourceWatcher {
    fn kind(&self) -> WatcherKind {
        WatcherKind::Resource
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    #[instrument(skip(self), fields(watcher = "resource"))]
    async fn check(&mut self) -> MonitorResult<Option<RetrainRequest>> {
        let result =
            tokio::time::timeout(self.timeout, self.source.current_resource_usage()).await;

        let usage = match result {
            Ok(Ok(usage)) => usage,
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

        (self.sink)(usage);
        self.state.record_clear(usage.cpu);

        let breaches = self.breaches(&usage);
        if breaches.is_empty() {
            self.over_ceiling = false;
            return Ok(None);
        }

        // Alert on the transition only, not every sample above the ceiling.
        if !self.over_ceiling {
            self.over_ceiling = true;
            let detail = breaches
                .iter()
                .map(|(name, value, ceiling)| format!("{} {:.2} > {:.2}", name, value, ceiling))
                .collect::<Vec<_>>()
                .join(", ");
            warn!(%detail, "resource ceiling exceeded");

            let mut context = HashMap::new();
            context.insert("cpu".to_string(), format!("{:.3}", usage.cpu));
            context.insert("memory".to_string(), format!("{:.3}", usage.memory));
            context.insert("disk".to_string(), format!("{:.3}", usage.disk));
            self.notifier
                .send(
                    Severity::Warning,
                    &format!("resource ceiling exceeded: {}", detail),
                    &context,
                )
                .await;
        }

        // Never a retrain trigger.
        Ok(None)
    }

    fn state(&self) -> &WatcherState {
        &self.state
    }
}
