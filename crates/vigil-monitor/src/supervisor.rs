//! Monitor supervisor.
//!
//! Owns the lifecycle of all watchers and the request queue. Each watcher
//! runs on its own tokio task with its own cadence; a failing watcher backs
//! off and retries without affecting the others. No business logic beyond
//! scheduling and queue admission lives here.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vigil_types::{Notifier, RetrainRequest, Severity};

use crate::backoff::Backoff;
use crate::config::MonitorConfig;
use crate::error::{MonitorError, MonitorResult};
use crate::queue::RequestQueue;
use crate::watchers::Watcher;

/// Launches and supervises the watcher tasks.
pub struct MonitorSupervisor {
    config: MonitorConfig,
    queue: RequestQueue,
    notifier: Arc<dyn Notifier>,
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl MonitorSupervisor {
    pub fn new(config: MonitorConfig, queue: RequestQueue, notifier: Arc<dyn Notifier>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            queue,
            notifier,
            shutdown_tx,
            handles: Vec::new(),
        }
    }

    /// The shared request queue.
    pub fn queue(&self) -> RequestQueue {
        self.queue.clone()
    }

    /// Submit a request directly (operator/manual path), applying the same
    /// dedup rule as watcher submissions.
    pub fn submit(&self, request: RetrainRequest) -> bool {
        self.queue.submit(request)
    }

    /// Launch one task per watcher. Fails if already started.
    pub fn start(&mut self, watchers: Vec<Box<dyn Watcher>>) -> MonitorResult<()> {
        if !self.handles.is_empty() {
            return Err(MonitorError::AlreadyRunning);
        }

        info!(watcher_count = watchers.len(), "starting monitor supervisor");

        for watcher in watchers {
            let queue = self.queue.clone();
            let notifier = self.notifier.clone();
            let shutdown_rx = self.shutdown_tx.subscribe();
            let backoff = Backoff::new(self.config.backoff_base, self.config.backoff_max);
            let alert_threshold = self.config.failure_alert_threshold;

            self.handles.push(tokio::spawn(run_watcher(
                watcher,
                queue,
                notifier,
                shutdown_rx,
                backoff,
                alert_threshold,
            )));
        }

        Ok(())
    }

    /// Graceful shutdown: no new ticks are scheduled, in-flight checks
    /// finish, then all tasks are joined.
    pub async fn stop(&mut self) {
        info!("stopping monitor supervisor");
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
    }

    /// Whether the supervisor currently has running watcher tasks.
    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }
}

/// Per-watcher scheduling loop.
///
/// The shutdown signal is only honored between checks: an in-flight check
/// always completes before the task exits.
async fn run_watcher(
    mut watcher: Box<dyn Watcher>,
    queue: RequestQueue,
    notifier: Arc<dyn Notifier>,
    mut shutdown_rx: watch::Receiver<bool>,
    mut backoff: Backoff,
    alert_threshold: u32,
) {
    let kind = watcher.kind();
    let interval = watcher.interval();
    let mut consecutive_failures: u32 = 0;

    debug!(watcher = %kind, interval_secs = interval.as_secs(), "watcher task started");

    loop {
        // Interval plus any backoff from a failing collaborator.
        let delay = interval + backoff.current().unwrap_or_default();

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
                continue;
            }
        }

        match watcher.check().await {
            Ok(Some(request)) => {
                consecutive_failures = 0;
                backoff.reset();
                let reason = request.reason;
                if queue.submit(request) {
                    debug!(watcher = %kind, %reason, "retrain request enqueued");
                } else {
                    debug!(watcher = %kind, %reason, "retrain request coalesced");
                }
            }
            Ok(None) => {
                consecutive_failures = 0;
                backoff.reset();
            }
            Err(e) => {
                consecutive_failures += 1;
                let delay = backoff.next_delay();
                warn!(
                    watcher = %kind,
                    error = %e,
                    consecutive_failures,
                    backoff_secs = delay.as_secs(),
                    "watcher check failed; backing off"
                );

                // Escalate once when the failure persists.
                if consecutive_failures == alert_threshold {
                    let context = HashMap::from([
                        ("watcher".to_string(), kind.to_string()),
                        ("failures".to_string(), consecutive_failures.to_string()),
                    ]);
                    notifier
                        .send(
                            Severity::Warning,
                            &format!(
                                "watcher '{}' has failed {} consecutive checks",
                                kind, consecutive_failures
                            ),
                            &context,
                        )
                        .await;
                }
            }
        }
    }

    debug!(watcher = %kind, "watcher task stopped");
}
