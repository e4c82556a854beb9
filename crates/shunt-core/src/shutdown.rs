//! Multi-phase shutdown: drain, cancel, persist, bounded join, accounting.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{error, info};

use crate::domain::TaskId;
use crate::ports::{MetricsSnapshot, NotProcessedStore, Recorder, resident_memory_bytes};
use crate::queue::BoundedQueue;
use crate::worker::WorkerPool;

/// Tunables for the shutdown sequence.
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Grace interval after flipping readiness, giving upstream routers time
    /// to stop sending new admission requests.
    pub drain_delay: Duration,

    /// Upper bound on waiting for in-flight work to finish. Interactive
    /// deployments keep this short; batch deployments may raise it by minutes.
    pub join_bound: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_delay: Duration::from_secs(5),
            join_bound: Duration::from_secs(10),
        }
    }
}

/// Final accounting emitted after the last phase.
#[derive(Debug, Clone, Serialize)]
pub struct ShutdownReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// True when the join bound expired before every worker reported back.
    /// Tasks still running at that point are neither retried nor recorded as
    /// not-processed; the loss is accepted and logged.
    pub forced_exit: bool,

    pub metrics: MetricsSnapshot,

    /// Tasks that were queued but never reached a worker.
    pub not_processed: Vec<TaskId>,
}

/// Runs the ordered shutdown phases over the daemon's shared pieces.
pub(crate) struct ShutdownCoordinator {
    pub config: ShutdownConfig,
    pub shutting_down: Arc<AtomicBool>,
    pub queue: Arc<BoundedQueue>,
    pub pool: WorkerPool,
    pub store: Arc<dyn NotProcessedStore>,
    pub recorder: Arc<Recorder>,
}

impl ShutdownCoordinator {
    /// Execute all phases in order. Total latency is bounded by
    /// `drain_delay + join_bound` plus a small constant.
    ///
    /// `abort_rx` cuts the drain delay short when an external signal fires;
    /// the later phases are already time-bounded and ignore it.
    pub(crate) async fn run(self, abort_rx: Option<watch::Receiver<bool>>) -> ShutdownReport {
        let started_at = Utc::now();

        // Phase 1: announce. Admission and readiness flip immediately.
        self.shutting_down.store(true, Ordering::SeqCst);
        info!("shutdown announced, readiness now unhealthy, draining traffic");

        // Phase 2: give upstream routers time to observe the readiness flip.
        self.drain_delay(abort_rx).await;

        // Phase 3: cancel in-flight executions.
        self.pool.cancel();

        // Phase 4: close the queue and persist whatever never started.
        self.queue.close().await;
        let leftover = self.queue.drain().await;
        for task in &leftover {
            self.store.record(task.id.clone()).await;
        }
        if !leftover.is_empty() {
            info!(
                count = leftover.len(),
                "queued tasks recorded as not processed"
            );
        }

        // Phase 5: bounded join.
        let forced_exit = timeout(self.config.join_bound, self.pool.join())
            .await
            .is_err();
        if forced_exit {
            error!(
                join_bound_ms = self.config.join_bound.as_millis() as u64,
                "force exit after join bound; unfinished tasks are unaccounted"
            );
        } else {
            info!("all workers have stopped");
        }

        // Phase 6: final accounting, emitted as one structured record.
        self.recorder.set_mem_used(resident_memory_bytes());
        let report = ShutdownReport {
            started_at,
            finished_at: Utc::now(),
            forced_exit,
            metrics: self.recorder.snapshot(),
            not_processed: self.store.list_all().await,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => info!(report = %json, "shutdown complete"),
            Err(err) => error!(error = %err, "failed to format shutdown report"),
        }
        report
    }

    async fn drain_delay(&self, abort_rx: Option<watch::Receiver<bool>>) {
        let delay = tokio::time::sleep(self.config.drain_delay);
        tokio::pin!(delay);

        let Some(mut abort_rx) = abort_rx else {
            delay.await;
            return;
        };

        loop {
            tokio::select! {
                _ = &mut delay => return,
                changed = abort_rx.changed() => match changed {
                    Ok(()) if *abort_rx.borrow() => {
                        info!("drain delay cut short by abort signal");
                        return;
                    }
                    // A send(false) is not an abort; keep waiting.
                    Ok(()) => {}
                    // Sender gone: nothing can abort anymore, wait it out.
                    Err(_) => {
                        delay.await;
                        return;
                    }
                },
            }
        }
    }
}
