//! Bounded FIFO task queue shared between producers and workers.

use std::collections::VecDeque;

use tokio::sync::{Mutex, Notify};

use crate::domain::Task;

/// Error returned by a non-blocking push attempt.
///
/// The task is handed back to the caller (the `TrySendError` idiom), which
/// decides whether to discard it or report backpressure upstream.
#[derive(Debug, PartialEq, Eq)]
pub enum TryPushError {
    /// The queue is at capacity.
    Full(Task),

    /// The queue has been closed; no further additions are accepted.
    Closed(Task),
}

struct QueueState {
    buf: VecDeque<Task>,
    closed: bool,
}

/// Bounded MPMC FIFO queue.
///
/// - `try_push` either succeeds or reports immediately; it never waits for a
///   consumer to make room.
/// - `pop` suspends until an item is available or the queue is closed; after
///   close it keeps draining whatever is still buffered before yielding
///   `None`.
///
/// The lock is only held across short critical sections and never across an
/// await, so a `pop` future dropped mid-wait cannot have taken a task with it.
pub struct BoundedQueue {
    capacity: usize,
    state: Mutex<QueueState>,
    notify: Notify,
}

impl BoundedQueue {
    /// Create a queue holding at most `capacity` tasks.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(QueueState {
                buf: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Non-blocking enqueue: succeeds or reports `Full`/`Closed` immediately.
    pub async fn try_push(&self, task: Task) -> Result<(), TryPushError> {
        {
            let mut state = self.state.lock().await;
            if state.closed {
                return Err(TryPushError::Closed(task));
            }
            if state.buf.len() >= self.capacity {
                return Err(TryPushError::Full(task));
            }
            state.buf.push_back(task);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Dequeue the next task in FIFO order.
    ///
    /// Returns `None` once the queue is closed and fully drained.
    pub async fn pop(&self) -> Option<Task> {
        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(task) = state.buf.pop_front() {
                    // Pass the wakeup on: another consumer may be parked while
                    // items (or the closed flag) are still pending.
                    if !state.buf.is_empty() || state.closed {
                        self.notify.notify_one();
                    }
                    return Some(task);
                }
                if state.closed {
                    // Cascade so every parked consumer eventually observes
                    // closure, not just the one holding the stored permit.
                    self.notify.notify_one();
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Close the queue: rejects further pushes and wakes waiting consumers.
    ///
    /// Buffered items remain available to `pop` and `drain`.
    pub async fn close(&self) {
        {
            let mut state = self.state.lock().await;
            state.closed = true;
        }
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    /// Remove and return everything still buffered.
    ///
    /// Used by the shutdown drain phase after `close`; each task leaves the
    /// queue exactly once, either here or via `pop`.
    pub async fn drain(&self) -> Vec<Task> {
        let mut state = self.state.lock().await;
        state.buf.drain(..).collect()
    }

    /// Number of tasks currently buffered.
    pub async fn len(&self) -> usize {
        self.state.lock().await.buf.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }
}
