//! Admission gateway: the request-facing entry into the queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::domain::{Task, TaskId, TaskIdGenerator};
use crate::error::AdmissionError;
use crate::ports::MetricsSink;
use crate::queue::{BoundedQueue, TryPushError};

/// Non-blocking admission into the bounded queue.
///
/// `submit` never waits on worker progress: the enqueue is attempted exactly
/// once and either sticks or the caller gets backpressure. Once accepted, a
/// task is fire-and-forget; no per-task error ever reaches the submitter.
pub struct AdmissionGateway {
    queue: Arc<BoundedQueue>,
    ids: Arc<TaskIdGenerator>,
    metrics: Arc<dyn MetricsSink>,
    shutting_down: Arc<AtomicBool>,
}

impl AdmissionGateway {
    pub fn new(
        queue: Arc<BoundedQueue>,
        ids: Arc<TaskIdGenerator>,
        metrics: Arc<dyn MetricsSink>,
        shutting_down: Arc<AtomicBool>,
    ) -> Self {
        Self {
            queue,
            ids,
            metrics,
            shutting_down,
        }
    }

    /// Admit one task.
    ///
    /// During shutdown the request is rejected before an identity is even
    /// allocated. On a full queue the freshly allocated identity is discarded;
    /// identities are not guaranteed to map to an executed task.
    pub async fn submit(&self) -> Result<TaskId, AdmissionError> {
        if self.shutting_down.load(Ordering::SeqCst) {
            self.metrics.inc_unavailable();
            return Err(AdmissionError::ShuttingDown);
        }

        let id = self.ids.next_id();
        match self.queue.try_push(Task::new(id.clone())).await {
            Ok(()) => {
                self.metrics.inc_accepted();
                debug!(task_id = %id, "task admitted");
                Ok(id)
            }
            Err(TryPushError::Full(_)) => {
                self.metrics.inc_unavailable();
                warn!(task_id = %id, "queue full, task rejected");
                Err(AdmissionError::QueueFull)
            }
            Err(TryPushError::Closed(_)) => {
                // Lost the race with queue closure; the identity is wasted.
                self.metrics.inc_unavailable();
                Err(AdmissionError::ShuttingDown)
            }
        }
    }

    /// Readiness: healthy until shutdown is announced, regardless of queue
    /// fill. Load balancers use this to stop routing before the hard phases.
    pub fn is_ready(&self) -> bool {
        !self.shutting_down.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Recorder;

    fn gateway_with(
        capacity: usize,
    ) -> (AdmissionGateway, Arc<Recorder>, Arc<AtomicBool>, Arc<TaskIdGenerator>) {
        let queue = Arc::new(BoundedQueue::new(capacity));
        let ids = Arc::new(TaskIdGenerator::new());
        let recorder = Arc::new(Recorder::new());
        let shutting_down = Arc::new(AtomicBool::new(false));
        let gateway = AdmissionGateway::new(
            queue,
            Arc::clone(&ids),
            Arc::clone(&recorder) as Arc<dyn MetricsSink>,
            Arc::clone(&shutting_down),
        );
        (gateway, recorder, shutting_down, ids)
    }

    #[tokio::test]
    async fn backpressure_after_capacity_is_reached() {
        // Capacity 2, no workers running: third submission must bounce.
        let (gateway, recorder, _, _) = gateway_with(2);

        assert!(gateway.submit().await.is_ok());
        assert!(gateway.submit().await.is_ok());
        assert_eq!(gateway.submit().await, Err(AdmissionError::QueueFull));

        let snap = recorder.snapshot();
        assert_eq!(snap.accepted_total, 2);
        assert_eq!(snap.unavailable_total, 1);
    }

    #[tokio::test]
    async fn shutdown_rejects_without_allocating_an_identity() {
        let (gateway, recorder, shutting_down, ids) = gateway_with(2);
        shutting_down.store(true, Ordering::SeqCst);

        assert_eq!(gateway.submit().await, Err(AdmissionError::ShuttingDown));
        assert_eq!(ids.issued(), 0);
        assert_eq!(recorder.snapshot().unavailable_total, 1);
    }

    #[tokio::test]
    async fn readiness_follows_the_shutdown_flag_not_queue_fill() {
        let (gateway, _, shutting_down, _) = gateway_with(1);

        gateway.submit().await.unwrap();
        // Full queue: still ready.
        assert!(gateway.is_ready());

        shutting_down.store(true, Ordering::SeqCst);
        assert!(!gateway.is_ready());
    }

    #[tokio::test]
    async fn losing_the_race_with_queue_closure_reads_as_shutting_down() {
        let (gateway, recorder, _, ids) = gateway_with(2);

        // Queue closed before the flag flipped: the allocated id is wasted.
        gateway.queue.close().await;
        assert_eq!(gateway.submit().await, Err(AdmissionError::ShuttingDown));
        assert_eq!(ids.issued(), 1);
        assert_eq!(recorder.snapshot().unavailable_total, 1);
    }
}
