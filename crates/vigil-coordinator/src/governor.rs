//! Resource governor.
//!
//! Receives live utilization samples from the resource watcher and keeps
//! the most recent one. The coordinator reads it when an attempt starts so
//! attempt logs carry the machine's condition at training time. It never
//! vetoes an attempt; ceiling alerts are the watcher's job.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use vigil_types::ResourceUsage;

/// Most recent resource sample, shared with the resource watcher.
#[derive(Default)]
pub struct ResourceGovernor {
    latest: Mutex<Option<(ResourceUsage, DateTime<Utc>)>>,
    limits: Mutex<Option<ResourceUsage>>,
}

impl ResourceGovernor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Install utilization ceilings, enabling [`constrained`](Self::constrained).
    pub fn set_limits(&self, limits: ResourceUsage) {
        *self.limits.lock().expect("governor lock poisoned") = Some(limits);
    }

    /// Whether the latest sample exceeds the installed ceilings. `false`
    /// when no limits or no sample are present.
    pub fn constrained(&self) -> bool {
        let limits = *self.limits.lock().expect("governor lock poisoned");
        limits.is_some_and(|limits| self.over_ceiling(&limits))
    }

    /// Record a fresh sample.
    pub fn record(&self, usage: ResourceUsage) {
        *self.latest.lock().expect("governor lock poisoned") = Some((usage, Utc::now()));
    }

    /// The most recent sample, if any has arrived yet.
    pub fn latest(&self) -> Option<ResourceUsage> {
        self.latest
            .lock()
            .expect("governor lock poisoned")
            .map(|(usage, _)| usage)
    }

    /// Age of the most recent sample.
    pub fn sample_age(&self) -> Option<chrono::Duration> {
        self.latest
            .lock()
            .expect("governor lock poisoned")
            .map(|(_, at)| Utc::now().signed_duration_since(at))
    }

    /// Whether the latest sample exceeds any of the given ceilings.
    /// `false` when no sample has arrived.
    pub fn over_ceiling(&self, limits: &ResourceUsage) -> bool {
        self.latest().is_some_and(|usage| {
            usage.cpu > limits.cpu || usage.memory > limits.memory || usage.disk > limits.disk
        })
    }

    /// A closure suitable as the resource watcher's sample sink.
    pub fn sample_fn(self: &Arc<Self>) -> impl Fn(ResourceUsage) + Send + Sync + 'static {
        let governor = Arc::clone(self);
        move |usage| governor.record(usage)
    }
}
