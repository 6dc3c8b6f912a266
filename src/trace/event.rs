use std::ops::AddAssign;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tool invocation exactly as the model emitted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawToolCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded argument blob, possibly malformed.
    pub arguments: String,
}

/// Entry of the per-task request log, in the order it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestEvent {
    /// A batch of tool calls issued in a single model turn.
    ToolCalls { turn: usize, calls: Vec<RawToolCall> },
    ToolResult {
        call_id: String,
        tool: String,
        output: Value,
        is_error: bool,
    },
    Message { role: String, content: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens += rhs.prompt_tokens;
        self.completion_tokens += rhs.completion_tokens;
        self.total_tokens += rhs.total_tokens;
    }
}

/// Everything one session produced for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    pub task_id: String,
    pub events: Vec<RequestEvent>,
    #[serde(default)]
    pub final_answer: Option<String>,
    #[serde(default)]
    pub usage: Usage,
    pub elapsed_ms: u64,
}

impl RawResponse {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            events: Vec::new(),
            final_answer: None,
            usage: Usage::default(),
            elapsed_ms: 0,
        }
    }

    pub fn tool_call_count(&self) -> usize {
        self.events
            .iter()
            .map(|e| match e {
                RequestEvent::ToolCalls { calls, .. } => calls.len(),
                _ => 0,
            })
            .sum()
    }
}
