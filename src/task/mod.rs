use std::{collections::BTreeSet, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, bench_error::BenchError};

/// One expected (or observed) tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallSpec {
    #[serde(alias = "name", alias = "tool_name")]
    pub tool: String,
    #[serde(default, alias = "args", alias = "parameters")]
    pub arguments: Map<String, Value>,
}

impl ToolCallSpec {
    pub fn new(tool: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            tool: tool.into(),
            arguments,
        }
    }
}

/// Tool calls issued together in one turn. Order inside a step carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepSpec {
    pub calls: Vec<ToolCallSpec>,
}

impl StepSpec {
    pub fn new(calls: Vec<ToolCallSpec>) -> Self {
        Self { calls }
    }

    pub fn tool_names(&self) -> BTreeSet<&str> {
        self.calls.iter().map(|c| c.tool.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(alias = "question")]
    pub prompt: String,
    #[serde(alias = "steps", alias = "answer")]
    pub golden_steps: Vec<StepSpec>,
}

impl Task {
    /// Credit value of the task: total golden tool calls across all steps.
    pub fn weight(&self) -> usize {
        self.golden_steps.iter().map(|s| s.calls.len()).sum()
    }

    /// Distinct tool names the task requires.
    pub fn golden_tools(&self) -> BTreeSet<String> {
        self.golden_steps
            .iter()
            .flat_map(|s| s.calls.iter().map(|c| c.tool.clone()))
            .collect()
    }
}

pub fn load_tasks(path: impl AsRef<Path>) -> Result<Vec<Task>> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    let tasks: Vec<Task> = serde_json::from_str(&raw)?;

    let mut seen = BTreeSet::new();
    for task in &tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(BenchError::InvalidData(format!("duplicate task id: {}", task.id)).into());
        }
    }

    tracing::info!(count = tasks.len(), path = %path.as_ref().display(), "loaded tasks");
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Task {
        serde_json::from_value(json!({
            "id": "parallel_easy_001",
            "question": "weather in Paris and Rome",
            "golden_steps": [
                [
                    {"tool": "get_weather", "arguments": {"city": "Paris"}},
                    {"name": "get_weather_alt", "args": {"city": "Rome"}}
                ],
                [{"tool": "summarize"}]
            ]
        }))
        .unwrap()
    }

    #[test]
    fn weight_counts_flattened_calls() {
        let task = sample();
        assert_eq!(task.weight(), 3);
        assert_eq!(task.weight(), task.weight());
    }

    #[test]
    fn aliases_and_defaults_are_accepted() {
        let task = sample();
        assert_eq!(task.prompt, "weather in Paris and Rome");
        assert_eq!(task.golden_steps[0].calls[1].tool, "get_weather_alt");
        assert!(task.golden_steps[1].calls[0].arguments.is_empty());
    }

    #[test]
    fn golden_tools_are_deduplicated() {
        let task = sample();
        let tools: Vec<_> = task.golden_tools().into_iter().collect();
        assert_eq!(tools, vec!["get_weather", "get_weather_alt", "summarize"]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let task = json!({"id": "a", "prompt": "p", "golden_steps": []});
        std::fs::write(&path, json!([task, task]).to_string()).unwrap();
        assert!(load_tasks(&path).is_err());
    }
}
