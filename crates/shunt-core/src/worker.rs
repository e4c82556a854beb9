//! Worker pool: a fixed set of concurrent execution loops.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout};
use tracing::{info, warn};

use crate::domain::{Task, TaskOutcome};
use crate::ports::{ExternalCapability, MetricsSink};
use crate::queue::BoundedQueue;

/// Handle over the worker loops.
///
/// The pool size is fixed for the daemon's lifetime. `cancel` stops the loops
/// taking new tasks and unwinds in-flight executions; `join` waits for every
/// loop to return (the caller bounds that wait).
pub struct WorkerPool {
    cancel_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

struct WorkerContext {
    queue: Arc<BoundedQueue>,
    capability: Arc<dyn ExternalCapability>,
    metrics: Arc<dyn MetricsSink>,
    task_deadline: Duration,
}

impl WorkerPool {
    /// Spawn `n` workers consuming from `queue`.
    pub fn spawn(
        n: usize,
        queue: Arc<BoundedQueue>,
        capability: Arc<dyn ExternalCapability>,
        metrics: Arc<dyn MetricsSink>,
        task_deadline: Duration,
    ) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 1..=n {
            let ctx = WorkerContext {
                queue: Arc::clone(&queue),
                capability: Arc::clone(&capability),
                metrics: Arc::clone(&metrics),
                task_deadline,
            };
            let rx = cancel_rx.clone();
            joins.push(tokio::spawn(worker_loop(worker_id, ctx, rx)));
        }

        Self { cancel_tx, joins }
    }

    /// Cancel all workers: no new tasks are taken and in-flight executions
    /// unwind through their cancellation path.
    pub fn cancel(&self) {
        // ignore send error: all workers may have exited already
        let _ = self.cancel_tx.send(true);
    }

    /// Wait for every worker loop to finish.
    pub async fn join(self) {
        for join in self.joins {
            let _ = join.await;
        }
    }
}

async fn worker_loop(worker_id: usize, ctx: WorkerContext, mut cancel_rx: watch::Receiver<bool>) {
    loop {
        if *cancel_rx.borrow() {
            info!(worker_id, "worker stopped by cancellation");
            return;
        }

        // The only blocking point: wait for the next task or cancellation.
        let task = tokio::select! {
            _ = cancel_rx.changed() => continue,
            task = ctx.queue.pop() => task,
        };

        let Some(task) = task else {
            info!(worker_id, "worker quit, task queue closed");
            return;
        };

        execute_task(worker_id, &ctx, &mut cancel_rx, task).await;
    }
}

/// One execution attempt: deadline-scoped call, classification, accounting.
///
/// The active gauge is decremented and the duration observed on every exit
/// path, regardless of outcome.
async fn execute_task(
    worker_id: usize,
    ctx: &WorkerContext,
    cancel_rx: &mut watch::Receiver<bool>,
    task: Task,
) {
    ctx.metrics.inc_active();
    let started = Instant::now();
    info!(worker_id, task_id = %task.id, "start processing");

    let outcome = tokio::select! {
        _ = cancel_rx.changed() => TaskOutcome::Cancelled,
        result = timeout(ctx.task_deadline, ctx.capability.call(&task.id, worker_id)) => {
            match result {
                Ok(Ok(())) => TaskOutcome::Completed,
                Ok(Err(err)) => {
                    warn!(worker_id, task_id = %task.id, error = %err, "capability reported failure");
                    TaskOutcome::BusinessError
                }
                Err(_elapsed) => {
                    warn!(worker_id, task_id = %task.id, "timeout occurred");
                    TaskOutcome::TimedOut
                }
            }
        }
    };

    match outcome {
        TaskOutcome::Completed => ctx.metrics.inc_processed(),
        TaskOutcome::BusinessError => ctx.metrics.inc_task_error(),
        // Shutdown cancellation counts into the timeout bucket: the task was
        // already dequeued, so it is dropped rather than persisted.
        TaskOutcome::TimedOut | TaskOutcome::Cancelled => ctx.metrics.inc_timeout(),
    }

    let elapsed = started.elapsed();
    ctx.metrics.observe_task_duration(elapsed);
    ctx.metrics.dec_active();
    info!(
        worker_id,
        task_id = %task.id,
        outcome = outcome.as_str(),
        elapsed_ms = elapsed.as_millis() as u64,
        "finished processing"
    );
}
