use std::process::Stdio;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::{Child, ChildStdin, ChildStdout, Command},
    task::JoinHandle,
};
use tracing::{debug, info};

use crate::{
    error::{Result, bench_error::BenchError},
    tools::{ToolDescriptor, ToolHost, ToolHostFactory},
};

/// Spawns one tool-server process per task.
///
/// Protocol: one JSON object per line on stdin, `{"tool": name, "arguments": {...}}`,
/// answered by one JSON value per line on stdout. The allowed tool names are passed in the
/// `RUSBENCH_TOOLS` environment variable as a comma-separated list.
#[derive(Debug, Clone)]
pub struct ProcessToolHostFactory {
    pub command: String,
    pub args: Vec<String>,
}

impl ProcessToolHostFactory {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

#[async_trait]
impl ToolHostFactory for ProcessToolHostFactory {
    async fn spawn(&self, task_id: &str, tools: &[ToolDescriptor]) -> Result<Box<dyn ToolHost>> {
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .env("RUSBENCH_TOOLS", names.join(","))
            .env("RUSBENCH_TASK_ID", task_id)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BenchError::ToolHost(format!("failed to spawn tool server '{}': {e}", self.command))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BenchError::ToolHost("failed to capture stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BenchError::ToolHost("failed to capture stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BenchError::ToolHost("failed to capture stderr".into()))?;

        let owner = task_id.to_string();
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(task_id = %owner, "tool server stderr: {}", line);
            }
        });

        info!(task_id, command = %self.command, tools = names.len(), "spawned tool server");
        Ok(Box::new(ProcessToolHost {
            task_id: task_id.to_string(),
            child: Some(child),
            stdin,
            stdout: BufReader::new(stdout),
            stderr_task: Some(stderr_task),
            calls: 0,
        }))
    }
}

pub struct ProcessToolHost {
    task_id: String,
    child: Option<Child>,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr_task: Option<JoinHandle<()>>,
    calls: usize,
}

#[async_trait]
impl ToolHost for ProcessToolHost {
    async fn call(&mut self, name: &str, arguments: &Map<String, Value>) -> Result<Value> {
        if self.child.is_none() {
            return Err(BenchError::ToolHost("tool server already shut down".into()).into());
        }
        self.calls += 1;

        let request = json!({ "tool": name, "arguments": arguments });
        let mut framed = serde_json::to_string(&request)?;
        framed.push('\n');
        self.stdin.write_all(framed.as_bytes()).await?;
        self.stdin.flush().await?;

        let mut line = String::new();
        if self.stdout.read_line(&mut line).await? == 0 {
            return Err(BenchError::ToolHost("tool server closed stdout".into()).into());
        }

        let response: Value = serde_json::from_str(line.trim_end_matches(['\r', '\n']))
            .unwrap_or_else(|_| Value::String(line.trim_end().to_string()));
        Ok(response)
    }

    fn calls(&self) -> usize {
        self.calls
    }

    async fn shutdown(&mut self) -> Result<()> {
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                debug!(task_id = %self.task_id, error = %e, "tool server kill failed");
            }
            if let Err(e) = child.wait().await {
                debug!(task_id = %self.task_id, error = %e, "tool server reap failed");
            }
            debug!(task_id = %self.task_id, calls = self.calls, "tool server stopped");
        }
        Ok(())
    }
}
