//! Deduplicating priority queue for retrain requests.
//!
//! Watchers submit; the retrain coordinator is the single consumer.
//! A reason already queued or currently in flight is coalesced rather than
//! enqueued again, so flapping signals cannot grow the queue without bound.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::debug;
use vigil_types::{RetrainReason, RetrainRequest};

use crate::error::{MonitorError, MonitorResult};

#[derive(Debug, Default)]
struct QueueInner {
    queued: Vec<RetrainRequest>,
    in_flight: HashSet<RetrainReason>,
    closed: bool,
}

/// Shared request queue with reason-level dedup and priority ordering.
#[derive(Debug, Clone, Default)]
pub struct RequestQueue {
    inner: Arc<Mutex<QueueInner>>,
    notify: Arc<Notify>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a request. Returns `true` if it was admitted, `false` if it
    /// was coalesced with an identical queued or in-flight reason.
    pub fn submit(&self, request: RetrainRequest) -> bool {
        let mut inner = self.inner.lock().expect("queue lock poisoned");
        if inner.closed {
            return false;
        }
        let reason = request.reason;
        if inner.in_flight.contains(&reason)
            || inner.queued.iter().any(|queued| queued.reason == reason)
        {
            debug!(%reason, "coalesced duplicate retrain request");
            return false;
        }
        inner.queued.push(request);
        drop(inner);
        self.notify.notify_one();
        true
    }

    /// Wait for the highest-priority request.
    ///
    /// Within the same priority, the earlier submission wins. Returns
    /// `QueueClosed` once the queue has been closed and drained.
    pub async fn recv(&self) -> MonitorResult<RetrainRequest> {
        loop {
            let notified = self.notify.notified();
            {
                let mut inner = self.inner.lock().expect("queue lock poisoned");
                if let Some(index) = Self::best_index(&inner.queued) {
                    return Ok(inner.queued.swap_remove(index));
                }
                if inner.closed {
                    return Err(MonitorError::QueueClosed);
                }
            }
            notified.await;
        }
    }

    /// Remove the best queued request without waiting.
    pub fn try_recv(&self) -> Option<RetrainRequest> {
        let mut inner = self.inner.lock().expect("queue lock poisoned");
        Self::best_index(&inner.queued).map(|index| inner.queued.swap_remove(index))
    }

    /// Mark a reason as in flight for dedup purposes.
    pub fn mark_in_flight(&self, reason: RetrainReason) {
        self.inner
            .lock()
            .expect("queue lock poisoned")
            .in_flight
            .insert(reason);
    }

    /// Clear a previously in-flight reason.
    pub fn clear_in_flight(&self, reason: RetrainReason) {
        self.inner
            .lock()
            .expect("queue lock poisoned")
            .in_flight
            .remove(&reason);
    }

    /// Close the queue; pending requests can still be drained.
    pub fn close(&self) {
        self.inner.lock().expect("queue lock poisoned").closed = true;
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    /// Number of queued requests.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("queue lock poisoned").queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn best_index(queued: &[RetrainRequest]) -> Option<usize> {
        queued
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_of_queued_reason() {
        let queue = RequestQueue::new();

        assert!(queue.submit(RetrainRequest::new(RetrainReason::DataDrift)));
        assert!(!queue.submit(RetrainRequest::new(RetrainReason::DataDrift)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_dedup_of_in_flight_reason() {
        let queue = RequestQueue::new();
        queue.mark_in_flight(RetrainReason::Scheduled);

        assert!(!queue.submit(RetrainRequest::new(RetrainReason::Scheduled)));
        assert!(queue.submit(RetrainRequest::new(RetrainReason::Manual)));

        queue.clear_in_flight(RetrainReason::Scheduled);
        assert!(queue.submit(RetrainRequest::new(RetrainReason::Scheduled)));
    }

    #[tokio::test]
    async fn test_priority_order() {
        let queue = RequestQueue::new();

        queue.submit(RetrainRequest::new(RetrainReason::Scheduled));
        queue.submit(RetrainRequest::new(RetrainReason::Manual));
        queue.submit(RetrainRequest::new(RetrainReason::DataDrift));

        assert_eq!(queue.recv().await.unwrap().reason, RetrainReason::Manual);
        assert_eq!(queue.recv().await.unwrap().reason, RetrainReason::DataDrift);
        assert_eq!(queue.recv().await.unwrap().reason, RetrainReason::Scheduled);
    }

    #[tokio::test]
    async fn test_recv_wakes_on_submit() {
        let queue = RequestQueue::new();
        let consumer = queue.clone();

        let handle = tokio::spawn(async move { consumer.recv().await });
        tokio::task::yield_now().await;

        queue.submit(RetrainRequest::new(RetrainReason::Manual));
        let request = handle.await.unwrap().unwrap();
        assert_eq!(request.reason, RetrainReason::Manual);
    }

    #[tokio::test]
    async fn test_closed_queue_drains_then_errors() {
        let queue = RequestQueue::new();
        queue.submit(RetrainRequest::new(RetrainReason::Scheduled));
        queue.close();

        assert!(queue.recv().await.is_ok());
        assert!(matches!(
            queue.recv().await,
            Err(MonitorError::QueueClosed)
        ));
    }

    #[test]
    fn test_closed_queue_rejects_submissions() {
        let queue = RequestQueue::new();
        queue.close();
        assert!(!queue.submit(RetrainRequest::new(RetrainReason::Manual)));
    }
}
