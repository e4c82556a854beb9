//! Not-processed store port: tasks that were admitted but never started.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::TaskId;

/// Best-effort record of tasks the shutdown drain pulled out of the queue.
///
/// The contract is deliberately weak: an id recorded here is visible to a
/// subsequent `list_all` in the same process, nothing more. No ordering, no
/// durability across a crash.
#[async_trait]
pub trait NotProcessedStore: Send + Sync {
    /// Append a task that was queued but never reached a worker.
    async fn record(&self, task_id: TaskId);

    /// Every id recorded so far.
    async fn list_all(&self) -> Vec<TaskId>;
}

/// In-memory production implementation: a mutex-protected set.
#[derive(Default)]
pub struct InMemoryStore {
    storage: Mutex<HashSet<TaskId>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotProcessedStore for InMemoryStore {
    async fn record(&self, task_id: TaskId) {
        self.storage.lock().await.insert(task_id);
    }

    async fn list_all(&self) -> Vec<TaskId> {
        let storage = self.storage.lock().await;
        let mut ids: Vec<TaskId> = storage.iter().cloned().collect();
        // The set iterates in arbitrary order; sort for stable output.
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recorded_ids_are_visible_to_list_all() {
        let store = InMemoryStore::new();
        store.record(TaskId::new("task-2")).await;
        store.record(TaskId::new("task-1")).await;

        let ids = store.list_all().await;
        assert_eq!(ids, vec![TaskId::new("task-1"), TaskId::new("task-2")]);
    }

    #[tokio::test]
    async fn recording_twice_keeps_a_single_entry() {
        let store = InMemoryStore::new();
        store.record(TaskId::new("task-1")).await;
        store.record(TaskId::new("task-1")).await;

        assert_eq!(store.list_all().await.len(), 1);
    }
}
