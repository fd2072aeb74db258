//! Age-based lifecycle classification
//!
//! The classifier does not care which notion of "age" it receives (time since
//! creation or since the last update); every call site states which one it
//! passes.

use super::schema::TaskStatus;

const MINUTE_MS: u64 = 60 * 1000;

/// Below this age a task counts as freshly delegated work
pub const DEFAULT_TODO_BELOW_MS: u64 = 20 * MINUTE_MS;

/// Below this age (and at or above the todo threshold) a task is in flight
pub const DEFAULT_PENDING_BELOW_MS: u64 = 2 * 60 * MINUTE_MS;

/// Age thresholds for [`AgeClassifier`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeClassifier {
    pub todo_below_ms: u64,
    pub pending_below_ms: u64,
}

impl Default for AgeClassifier {
    fn default() -> Self {
        Self {
            todo_below_ms: DEFAULT_TODO_BELOW_MS,
            pending_below_ms: DEFAULT_PENDING_BELOW_MS,
        }
    }
}

impl AgeClassifier {
    pub fn from_minutes(todo_below_mins: u64, pending_below_mins: u64) -> Self {
        Self {
            todo_below_ms: todo_below_mins * MINUTE_MS,
            pending_below_ms: pending_below_mins * MINUTE_MS,
        }
    }

    /// An abort always wins over recency
    pub fn classify(&self, age_ms: u64, aborted: bool) -> TaskStatus {
        if aborted {
            TaskStatus::Failed
        } else if age_ms < self.todo_below_ms {
            TaskStatus::Todo
        } else if age_ms < self.pending_below_ms {
            TaskStatus::Pending
        } else {
            TaskStatus::Completed
        }
    }
}

/// Classify with the default thresholds
pub fn classify(age_ms: u64, aborted: bool) -> TaskStatus {
    AgeClassifier::default().classify(age_ms, aborted)
}
