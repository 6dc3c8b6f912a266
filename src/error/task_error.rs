use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const TIMEOUT_HINT: &str = "likely cause: model response timeout";

/// Failure class of a single task; never aborts the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskErrorKind {
    Timeout,
    SessionConstruction,
    Execution,
}

impl std::fmt::Display for TaskErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskErrorKind::Timeout => write!(f, "timeout"),
            TaskErrorKind::SessionConstruction => write!(f, "session_construction"),
            TaskErrorKind::Execution => write!(f, "execution"),
        }
    }
}

/// Structured failure recorded in place of a raw response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskError {
    pub task_id: String,
    pub kind: TaskErrorKind,
    pub error_type: String,
    pub message: String,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl TaskError {
    pub fn timeout(task_id: &str, limit: Duration, elapsed: Duration) -> Self {
        Self {
            task_id: task_id.to_string(),
            kind: TaskErrorKind::Timeout,
            error_type: "TimeoutError".to_string(),
            message: format!("task exceeded {}s timeout", limit.as_secs_f64()),
            elapsed_ms: elapsed.as_millis() as u64,
            hint: Some(TIMEOUT_HINT.to_string()),
        }
    }

    pub fn construction(task_id: &str, err: &Error, elapsed: Duration) -> Self {
        Self {
            task_id: task_id.to_string(),
            kind: TaskErrorKind::SessionConstruction,
            error_type: err.type_name().to_string(),
            message: err.to_string(),
            elapsed_ms: elapsed.as_millis() as u64,
            hint: None,
        }
    }

    pub fn execution(task_id: &str, err: &Error, elapsed: Duration) -> Self {
        Self {
            task_id: task_id.to_string(),
            kind: TaskErrorKind::Execution,
            error_type: err.type_name().to_string(),
            message: err.to_string(),
            elapsed_ms: elapsed.as_millis() as u64,
            hint: None,
        }
    }

    /// A task whose future panicked or was aborted before producing a result.
    pub fn panicked(task_id: &str, message: String, elapsed: Duration) -> Self {
        Self {
            task_id: task_id.to_string(),
            kind: TaskErrorKind::Execution,
            error_type: "panic".to_string(),
            message,
            elapsed_ms: elapsed.as_millis() as u64,
            hint: None,
        }
    }

    /// A task with no entry in the run log being scored.
    pub fn missing(task_id: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            kind: TaskErrorKind::Execution,
            error_type: "MissingRun".to_string(),
            message: "missing from run log".to_string(),
            elapsed_ms: 0,
            hint: None,
        }
    }
}
