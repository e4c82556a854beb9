//! Task identity: human-readable ids from a process-wide monotonic counter.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Identifier of a task, unique for the process lifetime.
///
/// Formatted as `task-<n>` where `<n>` comes from a monotonic counter, so ids
/// stay readable in logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A unit of work admitted into the daemon.
///
/// Immutable once created: the queue buffers it, exactly one worker takes
/// ownership of it, and nothing mutates it along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
}

impl Task {
    pub fn new(id: TaskId) -> Self {
        Self { id }
    }
}

/// Monotonic task id generator.
///
/// A single atomic counter is enough for a single-process daemon; ids issued
/// under concurrent admission are still unique and monotonic. An id allocated
/// for an admission attempt that then loses the enqueue race is simply wasted.
#[derive(Debug, Default)]
pub struct TaskIdGenerator {
    counter: AtomicU64,
}

impl TaskIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id.
    pub fn next_id(&self) -> TaskId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        TaskId(format!("task-{n}"))
    }

    /// How many ids have been handed out so far.
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn ids_are_sequential_and_readable() {
        let ids = TaskIdGenerator::new();
        assert_eq!(ids.next_id().as_str(), "task-1");
        assert_eq!(ids.next_id().as_str(), "task-2");
        assert_eq!(ids.issued(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_allocation_never_duplicates() {
        let ids = Arc::new(TaskIdGenerator::new());

        let mut joins = Vec::new();
        for _ in 0..4 {
            let ids = Arc::clone(&ids);
            joins.push(tokio::spawn(async move {
                (0..250).map(|_| ids.next_id()).collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for join in joins {
            for id in join.await.unwrap() {
                assert!(seen.insert(id), "duplicate id issued");
            }
        }
        assert_eq!(seen.len(), 1000);
        assert_eq!(ids.issued(), 1000);
    }

    #[test]
    fn task_id_serializes_as_plain_string() {
        let id = TaskId::new("task-7");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"task-7\"");
        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
