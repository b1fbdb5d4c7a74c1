//! Notifier implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};
use vigil_types::{Notifier, Severity};

/// Emits notifications as structured log events.
///
/// The default notifier; deployments wire real channels in behind
/// `FanoutNotifier`.
#[derive(Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, severity: Severity, message: &str, context: &HashMap<String, String>) {
        match severity {
            Severity::Info => info!(%severity, ?context, "{message}"),
            Severity::Warning => warn!(%severity, ?context, "{message}"),
            Severity::Error | Severity::Critical => error!(%severity, ?context, "{message}"),
        }
    }
}

/// Delivers every notification to each wrapped notifier in turn.
pub struct FanoutNotifier {
    targets: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(targets: Vec<Arc<dyn Notifier>>) -> Self {
        Self { targets }
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn send(&self, severity: Severity, message: &str, context: &HashMap<String, String>) {
        for target in &self.targets {
            target.send(severity, message, context).await;
        }
    }
}
