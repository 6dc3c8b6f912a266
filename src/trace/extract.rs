use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    score::decode_arguments,
    task::{StepSpec, ToolCallSpec},
    trace::{RawResponse, RequestEvent},
};

/// Normalised sequence of steps observed in one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub steps: Vec<StepSpec>,
    /// Calls whose argument blob could not be decoded and was replaced by an empty map.
    #[serde(default)]
    pub decode_failures: usize,
}

impl ExecutionTrace {
    pub fn new(steps: Vec<StepSpec>) -> Self {
        Self {
            steps,
            decode_failures: 0,
        }
    }

    pub fn calls(&self) -> impl Iterator<Item = &ToolCallSpec> {
        self.steps.iter().flat_map(|s| s.calls.iter())
    }
}

/// Turn a raw request log into a trace: each tool-call batch becomes one step, in log order.
pub fn extract_trace(raw: &RawResponse) -> ExecutionTrace {
    let mut trace = ExecutionTrace::default();

    for event in &raw.events {
        let RequestEvent::ToolCalls { calls, .. } = event else {
            continue;
        };

        let mut step = Vec::with_capacity(calls.len());
        for call in calls {
            let arguments = match decode_arguments(&call.arguments) {
                Ok(args) => args,
                Err(e) => {
                    warn!(
                        task_id = %raw.task_id,
                        tool = %call.name,
                        error = %e,
                        "undecodable tool arguments"
                    );
                    trace.decode_failures += 1;
                    Default::default()
                }
            };
            step.push(ToolCallSpec::new(call.name.clone(), arguments));
        }
        trace.steps.push(StepSpec::new(step));
    }

    trace
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::RawToolCall;
    use serde_json::json;

    fn raw_call(name: &str, arguments: &str) -> RawToolCall {
        RawToolCall {
            id: format!("call_{name}"),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[test]
    fn batches_become_steps_in_order() {
        let mut raw = RawResponse::new("t1");
        raw.events = vec![
            RequestEvent::Message {
                role: "assistant".into(),
                content: "thinking".into(),
            },
            RequestEvent::ToolCalls {
                turn: 0,
                calls: vec![raw_call("A", r#"{"x": 1}"#), raw_call("B", r#"{"y": "2"}"#)],
            },
            RequestEvent::ToolResult {
                call_id: "call_A".into(),
                tool: "A".into(),
                output: json!("ok"),
                is_error: false,
            },
            RequestEvent::ToolCalls {
                turn: 1,
                calls: vec![raw_call("C", "{}")],
            },
        ];

        let trace = extract_trace(&raw);
        assert_eq!(trace.steps.len(), 2);
        assert_eq!(trace.steps[0].calls.len(), 2);
        assert_eq!(trace.steps[0].calls[0].arguments["x"], json!(1));
        assert_eq!(trace.steps[1].calls[0].tool, "C");
        assert_eq!(trace.decode_failures, 0);
    }

    #[test]
    fn malformed_arguments_become_empty_map() {
        let mut raw = RawResponse::new("t2");
        raw.events = vec![RequestEvent::ToolCalls {
            turn: 0,
            calls: vec![raw_call("A", "{not json"), raw_call("B", "")],
        }];

        let trace = extract_trace(&raw);
        assert_eq!(trace.steps[0].calls.len(), 2);
        assert!(trace.steps[0].calls[0].arguments.is_empty());
        assert!(trace.steps[0].calls[1].arguments.is_empty());
        assert_eq!(trace.decode_failures, 1);
    }

    #[test]
    fn log_without_tool_calls_is_empty_trace() {
        let mut raw = RawResponse::new("t3");
        raw.events.push(RequestEvent::Message {
            role: "assistant".into(),
            content: "final".into(),
        });
        assert!(extract_trace(&raw).steps.is_empty());
    }
}
