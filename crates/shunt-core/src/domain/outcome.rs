//! Terminal classification of a task execution.

use serde::{Deserialize, Serialize};

/// How a single execution attempt ended.
///
/// Transitions are one-way and there is no retry path: a dequeued task reaches
/// exactly one of these states. A task the queue closed on before any worker
/// dequeued it takes the separate "not processed" path instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The external capability returned success.
    Completed,

    /// The capability reported a semantic failure; the task is dropped.
    BusinessError,

    /// The per-task deadline elapsed before the capability returned.
    TimedOut,

    /// Shutdown cancelled the execution mid-flight.
    Cancelled,
}

impl TaskOutcome {
    /// Label used in logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskOutcome::Completed => "completed",
            TaskOutcome::BusinessError => "business_error",
            TaskOutcome::TimedOut => "timed_out",
            TaskOutcome::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(TaskOutcome::Completed, "completed")]
    #[case(TaskOutcome::BusinessError, "business_error")]
    #[case(TaskOutcome::TimedOut, "timed_out")]
    #[case(TaskOutcome::Cancelled, "cancelled")]
    fn log_label_matches_serialized_form(#[case] outcome: TaskOutcome, #[case] label: &str) {
        assert_eq!(outcome.as_str(), label);
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, format!("\"{label}\""));
    }
}
