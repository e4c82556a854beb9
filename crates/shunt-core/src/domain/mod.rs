//! Shared data model: task identity and terminal outcomes.

mod outcome;
mod task;

pub use outcome::TaskOutcome;
pub use task::{Task, TaskId, TaskIdGenerator};
