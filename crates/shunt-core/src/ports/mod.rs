//! Collaborator ports.
//!
//! Each trait is the seam to an external collaborator: the slow dependency,
//! the not-processed store, and the metrics sink. Every port has exactly one
//! production implementation here; tests substitute trivial fakes.

pub mod capability;
pub mod metrics;
pub mod store;

pub use self::capability::{ExternalCapability, SimulatedCapability};
pub use self::metrics::{
    HistogramSnapshot, MetricsSink, MetricsSnapshot, Recorder, resident_memory_bytes,
};
pub use self::store::{InMemoryStore, NotProcessedStore};
