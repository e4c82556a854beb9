//! shunt-core
//!
//! Core building blocks for the shunt daemon: a bounded task queue with
//! non-blocking admission, a fixed pool of workers executing each task
//! against a slow external dependency under a hard per-task deadline, and a
//! multi-phase shutdown that drains the queue, bounds the wait for in-flight
//! work, and best-effort persists tasks that never started.
//!
//! # Module layout
//! - **domain**: task identity and terminal outcomes
//! - **queue**: the bounded MPMC FIFO buffer
//! - **gateway**: admission with backpressure
//! - **worker**: the execution loops and outcome classification
//! - **shutdown**: the ordered drain/cancel/persist/join sequence
//! - **ports**: collaborator seams (capability, store, metrics) with one
//!   production implementation each
//! - **daemon**: composition root tying it all together

pub mod daemon;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod ports;
pub mod queue;
pub mod shutdown;
pub mod worker;

pub use daemon::{Daemon, DaemonConfig, DaemonStatus};
pub use error::{AdmissionError, CapabilityError};
pub use shutdown::{ShutdownConfig, ShutdownReport};
