use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{error::Result, tools::ToolDescriptor};

/// Tool executor owned by exactly one session. Never shared or reused across tasks.
#[async_trait]
pub trait ToolHost: Send {
    /// Execute one tool call. Tool-level failures come back as `Ok` payloads; `Err` means
    /// the host itself is broken.
    async fn call(&mut self, name: &str, arguments: &Map<String, Value>) -> Result<Value>;

    /// Calls served so far by this host.
    fn calls(&self) -> usize;

    /// Release processes and connections. Must be safe to call more than once.
    async fn shutdown(&mut self) -> Result<()>;
}

/// Creates a fresh [`ToolHost`] for each task.
#[async_trait]
pub trait ToolHostFactory: Send + Sync {
    async fn spawn(&self, task_id: &str, tools: &[ToolDescriptor]) -> Result<Box<dyn ToolHost>>;
}
