use std::{collections::HashMap, path::Path, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::{
    error::{Result, bench_error::BenchError},
    score::normalize_arguments,
    tools::{ToolDescriptor, ToolHost, ToolHostFactory},
};

/// Canned response for a tool, optionally keyed by arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockEntry {
    /// `None` matches any arguments and is consulted after exact matches.
    #[serde(default)]
    pub arguments: Option<Map<String, Value>>,
    pub response: Value,
}

/// Read-only lookup tables standing in for the mock tool implementations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MockTable {
    pub entries: HashMap<String, Vec<MockEntry>>,
}

impl MockTable {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn lookup(&self, name: &str, arguments: &Map<String, Value>) -> Option<&Value> {
        let entries = self.entries.get(name)?;
        let wanted = normalize_arguments(arguments);
        entries
            .iter()
            .find(|e| {
                e.arguments
                    .as_ref()
                    .is_some_and(|args| normalize_arguments(args) == wanted)
            })
            .or_else(|| entries.iter().find(|e| e.arguments.is_none()))
            .map(|e| &e.response)
    }
}

pub struct LookupToolHostFactory {
    table: Arc<MockTable>,
}

impl LookupToolHostFactory {
    pub fn new(table: MockTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }
}

#[async_trait]
impl ToolHostFactory for LookupToolHostFactory {
    async fn spawn(&self, task_id: &str, tools: &[ToolDescriptor]) -> Result<Box<dyn ToolHost>> {
        debug!(task_id, tools = tools.len(), "spawning lookup tool host");
        Ok(Box::new(LookupToolHost {
            table: self.table.clone(),
            calls: 0,
            closed: false,
        }))
    }
}

/// In-process host answering from a [`MockTable`]. Its call counter is private to the task.
pub struct LookupToolHost {
    table: Arc<MockTable>,
    calls: usize,
    closed: bool,
}

#[async_trait]
impl ToolHost for LookupToolHost {
    async fn call(&mut self, name: &str, arguments: &Map<String, Value>) -> Result<Value> {
        if self.closed {
            return Err(BenchError::ToolHost("host already shut down".into()).into());
        }
        self.calls += 1;
        Ok(self
            .table
            .lookup(name, arguments)
            .cloned()
            .unwrap_or_else(|| json!({ "error": format!("no matching record for {name}") })))
    }

    fn calls(&self) -> usize {
        self.calls
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
