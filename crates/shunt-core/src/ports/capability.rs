//! External capability port: the slow, unreliable dependency.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use crate::domain::TaskId;
use crate::error::CapabilityError;

/// The single operation the daemon needs from the slow dependency.
///
/// The worker wraps the call in its own deadline and races it against the
/// shutdown signal, so implementations must be prompt about cancellation:
/// the future is simply dropped when either fires, and the call must not
/// block the executor past that point.
#[async_trait]
pub trait ExternalCapability: Send + Sync {
    async fn call(&self, task_id: &TaskId, worker_id: usize) -> Result<(), CapabilityError>;
}

/// Production stand-in for the real dependency.
///
/// Latency is uniform in 1–11 s and roughly one call in ten fails with a
/// semantic error, which keeps both the timeout and the business-error paths
/// exercised under any real load.
pub struct SimulatedCapability;

#[async_trait]
impl ExternalCapability for SimulatedCapability {
    async fn call(&self, task_id: &TaskId, worker_id: usize) -> Result<(), CapabilityError> {
        // Draw before the await: the rng handle is not Send.
        let (delay, fails) = {
            let mut rng = rand::thread_rng();
            (
                Duration::from_millis(1000 + rng.gen_range(0..10_000)),
                rng.gen_range(0..10) == 0,
            )
        };

        if fails {
            return Err(CapabilityError::new(format!(
                "worker {worker_id} / {task_id}: simulated external failure"
            )));
        }

        tokio::time::sleep(delay).await;
        debug!(
            worker_id,
            task_id = %task_id,
            delay_ms = delay.as_millis() as u64,
            "external call completed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn simulated_call_finishes_within_the_advertised_latency() {
        let capability = SimulatedCapability;
        let id = TaskId::new("task-1");

        // Paused clock auto-advances through the random sleep.
        let result = tokio::time::timeout(Duration::from_secs(12), capability.call(&id, 1)).await;
        let outcome = result.expect("call must resolve within the latency ceiling");

        if let Err(err) = outcome {
            assert!(err.message.contains("simulated external failure"));
        }
    }
}
