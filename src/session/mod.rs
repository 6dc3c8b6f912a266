use std::{sync::Arc, time::Duration};

use serde_json::{Map, Value, json};
use tokio::time::{Instant, error::Elapsed};
use tracing::{debug, info};

use crate::{
    error::Result,
    model::{ChatMessage, CompletionRequest, ModelClient},
    prompt::build_system_prompt,
    score::decode_arguments,
    tools::{ToolCatalog, ToolDescriptor, ToolHost, ToolHostFactory},
    trace::{RawResponse, RawToolCall, RequestEvent},
};

/// Assembles task-scoped sessions from the shared catalog, model client and host factory.
#[derive(Clone)]
pub struct SessionBuilder {
    catalog: Arc<ToolCatalog>,
    model: Arc<dyn ModelClient>,
    hosts: Arc<dyn ToolHostFactory>,
}

impl SessionBuilder {
    pub fn new(
        catalog: Arc<ToolCatalog>,
        model: Arc<dyn ModelClient>,
        hosts: Arc<dyn ToolHostFactory>,
    ) -> Self {
        Self {
            catalog,
            model,
            hosts,
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Bind `pool` to a fresh tool host and instruct the model to make exactly
    /// `tool_call_budget` calls.
    pub async fn build(
        &self,
        task_id: &str,
        pool: &[String],
        tool_call_budget: usize,
    ) -> Result<Session> {
        let tools = self.catalog.resolve(pool)?;
        let host = self.hosts.spawn(task_id, &tools).await?;
        let system_prompt = build_system_prompt(&tools, tool_call_budget);

        debug!(task_id, pool_size = tools.len(), tool_call_budget, "session built");
        Ok(Session {
            task_id: task_id.to_string(),
            model: self.model.clone(),
            tools,
            host,
            system_prompt,
            tool_call_budget,
            max_turns: tool_call_budget + 1,
            closed: false,
        })
    }
}

/// One agent bound to one task's tool pool. Not reusable across tasks.
pub struct Session {
    task_id: String,
    model: Arc<dyn ModelClient>,
    tools: Vec<ToolDescriptor>,
    host: Box<dyn ToolHost>,
    system_prompt: String,
    tool_call_budget: usize,
    max_turns: usize,
    closed: bool,
}

impl Session {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn tool_call_budget(&self) -> usize {
        self.tool_call_budget
    }

    /// Tool calls the host has served for this session.
    pub fn host_calls(&self) -> usize {
        self.host.calls()
    }

    /// [`Session::run`] under a hard wall-clock limit. On timeout the in-flight model or
    /// tool call is dropped; the caller still owns the session and must [`close`](Self::close) it.
    pub async fn run_with_timeout(
        &mut self,
        prompt: &str,
        limit: Duration,
    ) -> std::result::Result<Result<RawResponse>, Elapsed> {
        tokio::time::timeout(limit, self.run(prompt)).await
    }

    /// Drive the model/tool loop until the model answers without tool calls or the turn
    /// budget (`tool_call_budget + 1`) is spent.
    pub async fn run(&mut self, prompt: &str) -> Result<RawResponse> {
        let start = Instant::now();
        let mut response = RawResponse::new(self.task_id.clone());
        let mut request = CompletionRequest {
            messages: vec![
                ChatMessage::system(&self.system_prompt),
                ChatMessage::user(prompt),
            ],
            tools: self.tools.clone(),
        };

        for turn in 0..self.max_turns {
            let reply = self.model.complete(&request).await?;
            response.usage += reply.usage;

            if let Some(content) = &reply.content {
                response.events.push(RequestEvent::Message {
                    role: "assistant".to_string(),
                    content: content.clone(),
                });
            }

            if reply.tool_calls.is_empty() {
                response.final_answer = reply.content;
                break;
            }

            let calls: Vec<RawToolCall> = reply
                .tool_calls
                .into_iter()
                .enumerate()
                .map(|(i, mut call)| {
                    if call.id.is_empty() {
                        call.id = format!("call_{turn}_{i}");
                    }
                    call
                })
                .collect();

            debug!(task_id = %self.task_id, turn, calls = calls.len(), "model issued tool calls");
            response.events.push(RequestEvent::ToolCalls {
                turn,
                calls: calls.clone(),
            });
            request
                .messages
                .push(ChatMessage::assistant(reply.content, calls.clone()));

            for call in &calls {
                let (output, is_error) = self.dispatch(call).await?;
                request
                    .messages
                    .push(ChatMessage::tool(&call.id, output.to_string()));
                response.events.push(RequestEvent::ToolResult {
                    call_id: call.id.clone(),
                    tool: call.name.clone(),
                    output,
                    is_error,
                });
            }
        }

        response.elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            task_id = %self.task_id,
            tool_calls = response.tool_call_count(),
            budget = self.tool_call_budget,
            elapsed_ms = response.elapsed_ms,
            "session finished"
        );
        Ok(response)
    }

    async fn dispatch(&mut self, call: &RawToolCall) -> Result<(Value, bool)> {
        if !self.tools.iter().any(|t| t.name == call.name) {
            return Ok((
                json!({ "error": format!("tool '{}' is not available in this session", call.name) }),
                true,
            ));
        }

        let arguments: Map<String, Value> = match decode_arguments(&call.arguments) {
            Ok(args) => args,
            Err(e) => {
                return Ok((json!({ "error": e.to_string() }), true));
            }
        };

        let output = self.host.call(&call.name, &arguments).await?;
        let is_error = output.get("error").is_some();
        Ok((output, is_error))
    }

    /// Release the tool host. Idempotent; called on every exit path.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.host.shutdown().await
    }
}
