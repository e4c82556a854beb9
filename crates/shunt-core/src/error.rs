//! Error taxonomy of the daemon.
//!
//! Per-task failures (business error, deadline, cancellation) never propagate
//! to the caller that admitted the task; admission is fire-and-forget once
//! accepted. The only error a submitter ever sees is [`AdmissionError`].

use thiserror::Error;

/// Why an admission attempt was rejected.
///
/// Surfaced synchronously to the caller; the daemon never retries on its
/// behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// The queue is at capacity.
    #[error("task queue is full, try again later")]
    QueueFull,

    /// Shutdown has been announced; no new work is accepted.
    #[error("daemon is shutting down")]
    ShuttingDown,
}

/// A semantic failure reported by the external capability itself.
///
/// Deadline expiry and shutdown cancellation are not capability errors: the
/// worker detects those on its side of the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("external capability failure: {message}")]
pub struct CapabilityError {
    pub message: String,
}

impl CapabilityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
