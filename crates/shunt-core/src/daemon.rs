//! Daemon composition: wiring of queue, gateway, workers, and shutdown.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

use crate::domain::{TaskId, TaskIdGenerator};
use crate::gateway::AdmissionGateway;
use crate::ports::{
    ExternalCapability, MetricsSink, MetricsSnapshot, NotProcessedStore, Recorder,
    resident_memory_bytes,
};
use crate::queue::BoundedQueue;
use crate::shutdown::{ShutdownConfig, ShutdownCoordinator, ShutdownReport};
use crate::worker::WorkerPool;

/// Daemon tunables. Worker count and queue capacity are fixed for the
/// daemon's lifetime.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub workers: usize,
    pub queue_capacity: usize,

    /// Hard per-task deadline for a single execution attempt.
    pub task_deadline: Duration,

    pub shutdown: ShutdownConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            queue_capacity: 100,
            task_deadline: Duration::from_secs(3),
            shutdown: ShutdownConfig::default(),
        }
    }
}

/// Point-in-time view served by the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonStatus {
    pub ready: bool,
    pub queue_depth: usize,
    pub metrics: MetricsSnapshot,
    pub not_processed_count: usize,
    pub not_processed: Vec<TaskId>,
}

/// The running daemon.
///
/// Construction starts the worker pool; `shutdown` consumes the daemon and
/// runs the ordered drain/cancel/persist/join sequence.
pub struct Daemon {
    config: DaemonConfig,
    gateway: Arc<AdmissionGateway>,
    queue: Arc<BoundedQueue>,
    pool: WorkerPool,
    store: Arc<dyn NotProcessedStore>,
    recorder: Arc<Recorder>,
    shutting_down: Arc<AtomicBool>,
}

impl Daemon {
    /// Wire the components and start `config.workers` workers.
    pub fn start(
        config: DaemonConfig,
        capability: Arc<dyn ExternalCapability>,
        store: Arc<dyn NotProcessedStore>,
        recorder: Arc<Recorder>,
    ) -> Self {
        let queue = Arc::new(BoundedQueue::new(config.queue_capacity));
        let shutting_down = Arc::new(AtomicBool::new(false));
        let ids = Arc::new(TaskIdGenerator::new());

        let gateway = Arc::new(AdmissionGateway::new(
            Arc::clone(&queue),
            ids,
            Arc::clone(&recorder) as Arc<dyn MetricsSink>,
            Arc::clone(&shutting_down),
        ));

        let pool = WorkerPool::spawn(
            config.workers,
            Arc::clone(&queue),
            capability,
            Arc::clone(&recorder) as Arc<dyn MetricsSink>,
            config.task_deadline,
        );

        info!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            task_deadline_ms = config.task_deadline.as_millis() as u64,
            "daemon started"
        );

        Self {
            config,
            gateway,
            queue,
            pool,
            store,
            recorder,
            shutting_down,
        }
    }

    /// The admission entry point, shareable with any number of submitters.
    pub fn gateway(&self) -> Arc<AdmissionGateway> {
        Arc::clone(&self.gateway)
    }

    /// Snapshot counters, gauges, queue depth, and the not-processed set.
    pub async fn status(&self) -> DaemonStatus {
        self.recorder.set_mem_used(resident_memory_bytes());
        let not_processed = self.store.list_all().await;
        DaemonStatus {
            ready: self.gateway.is_ready(),
            queue_depth: self.queue.len().await,
            metrics: self.recorder.snapshot(),
            not_processed_count: not_processed.len(),
            not_processed,
        }
    }

    /// Run the full shutdown sequence and return the final accounting.
    pub async fn shutdown(self) -> ShutdownReport {
        self.into_coordinator().run(None).await
    }

    /// Like [`Daemon::shutdown`], but `abort_rx` can cut the drain delay
    /// short (typically wired to a second termination signal).
    pub async fn shutdown_with_abort(self, abort_rx: watch::Receiver<bool>) -> ShutdownReport {
        self.into_coordinator().run(Some(abort_rx)).await
    }

    fn into_coordinator(self) -> ShutdownCoordinator {
        ShutdownCoordinator {
            config: self.config.shutdown,
            shutting_down: self.shutting_down,
            queue: self.queue,
            pool: self.pool,
            store: self.store,
            recorder: self.recorder,
        }
    }
}
