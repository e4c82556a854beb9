//! Metrics sink port and the atomic production recorder.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Upper bucket bounds (seconds) for the task duration histogram.
///
/// Tasks are bounded by the per-task deadline, so a 10 s ceiling is generous.
const DURATION_BUCKETS: [f64; 7] = [0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Counter/gauge/histogram sink consumed by the gateway and the workers.
///
/// Implementations must not block the caller materially; the production
/// recorder is all atomics. Counters are monotonic, the active gauge reflects
/// only currently in-flight work.
pub trait MetricsSink: Send + Sync {
    /// Admission accepted a task into the queue.
    fn inc_accepted(&self);

    /// Admission answered "unavailable" (queue full or shutting down).
    fn inc_unavailable(&self);

    /// A task completed successfully.
    fn inc_processed(&self);

    /// The capability reported a semantic failure.
    fn inc_task_error(&self);

    /// The per-task deadline expired, or shutdown cancelled the execution.
    fn inc_timeout(&self);

    fn inc_active(&self);
    fn dec_active(&self);

    /// Wall-clock time from dequeue to terminal outcome, any outcome.
    fn observe_task_duration(&self, duration: Duration);
}

/// Point-in-time snapshot of the duration histogram.
///
/// Bucket counts are cumulative (prometheus-style `le` semantics); samples
/// above the last bound only show up in `count`.
#[derive(Debug, Clone, Serialize)]
pub struct HistogramSnapshot {
    pub buckets: Vec<(f64, u64)>,
    pub count: u64,
    pub sum_seconds: f64,
}

/// Point-in-time snapshot of all counters and gauges.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub mem_used_bytes: u64,
    pub active_tasks: i64,
    pub accepted_total: u64,
    pub unavailable_total: u64,
    pub processed_total: u64,
    pub task_errors_total: u64,
    pub timeouts_total: u64,
    pub task_duration: HistogramSnapshot,
}

/// Production recorder.
///
/// One explicitly constructed instance is shared by reference with every
/// component that records; there is no process-wide registry. Whoever
/// composes the daemon owns its lifecycle.
#[derive(Debug, Default)]
pub struct Recorder {
    accepted: AtomicU64,
    unavailable: AtomicU64,
    processed: AtomicU64,
    task_errors: AtomicU64,
    timeouts: AtomicU64,
    active: AtomicI64,
    mem_used: AtomicU64,

    // Per-bucket (non-cumulative) counts; cumulated at snapshot time.
    duration_buckets: [AtomicU64; DURATION_BUCKETS.len()],
    duration_overflow: AtomicU64,
    duration_count: AtomicU64,
    duration_sum_micros: AtomicU64,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the memory gauge; callers sample it right before a snapshot.
    pub fn set_mem_used(&self, bytes: u64) {
        self.mem_used.store(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut buckets = Vec::with_capacity(DURATION_BUCKETS.len());
        let mut cumulative = 0u64;
        for (i, le) in DURATION_BUCKETS.iter().enumerate() {
            cumulative += self.duration_buckets[i].load(Ordering::Relaxed);
            buckets.push((*le, cumulative));
        }

        MetricsSnapshot {
            mem_used_bytes: self.mem_used.load(Ordering::Relaxed),
            active_tasks: self.active.load(Ordering::Relaxed),
            accepted_total: self.accepted.load(Ordering::Relaxed),
            unavailable_total: self.unavailable.load(Ordering::Relaxed),
            processed_total: self.processed.load(Ordering::Relaxed),
            task_errors_total: self.task_errors.load(Ordering::Relaxed),
            timeouts_total: self.timeouts.load(Ordering::Relaxed),
            task_duration: HistogramSnapshot {
                buckets,
                count: self.duration_count.load(Ordering::Relaxed),
                sum_seconds: self.duration_sum_micros.load(Ordering::Relaxed) as f64 / 1e6,
            },
        }
    }
}

impl MetricsSink for Recorder {
    fn inc_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_unavailable(&self) {
        self.unavailable.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_task_error(&self) {
        self.task_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_active(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    fn dec_active(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    fn observe_task_duration(&self, duration: Duration) {
        let secs = duration.as_secs_f64();
        self.duration_count.fetch_add(1, Ordering::Relaxed);
        self.duration_sum_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);

        match DURATION_BUCKETS.iter().position(|le| secs <= *le) {
            Some(i) => self.duration_buckets[i].fetch_add(1, Ordering::Relaxed),
            None => self.duration_overflow.fetch_add(1, Ordering::Relaxed),
        };
    }
}

/// Resident set size of this process, for the memory gauge.
/// Only wired up on Linux; elsewhere the gauge stays at zero.
#[cfg(target_os = "linux")]
pub fn resident_memory_bytes() -> u64 {
    // statm reports pages; field 1 is the resident set.
    if let Ok(statm) = std::fs::read_to_string("/proc/self/statm")
        && let Some(resident) = statm.split_whitespace().nth(1)
        && let Ok(pages) = resident.parse::<u64>()
    {
        return pages * 4096;
    }
    0
}

#[cfg(not(target_os = "linux"))]
pub fn resident_memory_bytes() -> u64 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_and_gauge_tracks_in_flight() {
        let recorder = Recorder::new();
        recorder.inc_accepted();
        recorder.inc_accepted();
        recorder.inc_unavailable();
        recorder.inc_processed();
        recorder.inc_task_error();
        recorder.inc_timeout();

        recorder.inc_active();
        recorder.inc_active();
        recorder.dec_active();

        let snap = recorder.snapshot();
        assert_eq!(snap.accepted_total, 2);
        assert_eq!(snap.unavailable_total, 1);
        assert_eq!(snap.processed_total, 1);
        assert_eq!(snap.task_errors_total, 1);
        assert_eq!(snap.timeouts_total, 1);
        assert_eq!(snap.active_tasks, 1);
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let recorder = Recorder::new();
        recorder.observe_task_duration(Duration::from_millis(50)); // <= 0.1
        recorder.observe_task_duration(Duration::from_millis(300)); // <= 0.5
        recorder.observe_task_duration(Duration::from_secs(4)); // <= 5.0
        recorder.observe_task_duration(Duration::from_secs(60)); // overflow

        let hist = recorder.snapshot().task_duration;
        assert_eq!(hist.count, 4);
        assert!(hist.sum_seconds > 64.0);

        let bucket = |le: f64| {
            hist.buckets
                .iter()
                .find(|(bound, _)| *bound == le)
                .map(|(_, count)| *count)
                .unwrap()
        };
        assert_eq!(bucket(0.1), 1);
        assert_eq!(bucket(0.5), 2);
        assert_eq!(bucket(5.0), 3);
        assert_eq!(bucket(10.0), 3); // the 60 s sample is only in `count`
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let recorder = Recorder::new();
        recorder.set_mem_used(4096);
        let json = serde_json::to_value(recorder.snapshot()).unwrap();
        assert_eq!(json["mem_used_bytes"], 4096);
        assert_eq!(json["timeouts_total"], 0);
    }
}
