use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    error::{Result, bench_error::BenchError},
    model::{CompletionRequest, ModelClient, ModelTurn},
    task::{StepSpec, Task},
    trace::RawToolCall,
};

/// Model stand-in that replays each task's golden steps, one step per turn.
///
/// A dry run with this client must score every task at full weight; anything less points
/// at a broken task file, catalog or skip list.
pub struct OracleModel {
    steps_by_prompt: HashMap<String, Vec<StepSpec>>,
}

impl OracleModel {
    pub fn new(tasks: &[Task]) -> Self {
        Self {
            steps_by_prompt: tasks
                .iter()
                .map(|t| (t.prompt.clone(), t.golden_steps.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl ModelClient for OracleModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<ModelTurn> {
        let prompt = request
            .prompt()
            .ok_or_else(|| BenchError::Model("request has no user prompt".into()))?;
        let steps = self
            .steps_by_prompt
            .get(prompt)
            .ok_or_else(|| BenchError::TaskNotFound(prompt.chars().take(60).collect()))?;

        let turn = request.completed_turns();
        let Some(step) = steps.get(turn) else {
            return Ok(ModelTurn::answer("done"));
        };

        let calls = step
            .calls
            .iter()
            .enumerate()
            .map(|(i, call)| -> Result<RawToolCall> {
                Ok(RawToolCall {
                    id: format!("call_{turn}_{i}"),
                    name: call.tool.clone(),
                    arguments: serde_json::to_string(&call.arguments)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ModelTurn::calls(calls))
    }

    fn model_id(&self) -> String {
        "oracle".to_string()
    }
}
