pub mod aggregate;
pub mod category;

use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    error::{Result, TaskError, TaskErrorKind},
    scheduler::TaskRun,
    score::{SkipSet, score},
    task::{StepSpec, Task},
    trace::{ExecutionTrace, extract_trace},
};

pub use aggregate::{AggregateReport, AxisScores, MultiRunAggregator, TaskAggregate, avg_at_r};
pub use category::{CategoryDimension, CategoryScheme};

/// Expected vs. observed calls for one task, with both verdicts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    pub task_id: String,
    pub weight: usize,
    pub expected_tools: Vec<Vec<String>>,
    pub expected_inputs: Vec<Vec<Map<String, Value>>>,
    pub actual_tools: Vec<Vec<String>>,
    pub actual_inputs: Vec<Vec<Map<String, Value>>>,
    pub unordered_match: bool,
    pub structured_match: bool,
    pub unordered_score: usize,
    pub structured_score: usize,
    #[serde(default)]
    pub decode_failures: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
}

impl TaskReport {
    fn new(task: &Task, trace: &ExecutionTrace, skip: &SkipSet) -> Self {
        let record = score(trace, task, skip);
        let (expected_tools, expected_inputs) = split_steps(&task.golden_steps);
        let (actual_tools, actual_inputs) = split_steps(&trace.steps);
        Self {
            task_id: task.id.clone(),
            weight: record.weight,
            expected_tools,
            expected_inputs,
            actual_tools,
            actual_inputs,
            unordered_score: record.unordered_score(),
            structured_score: record.structured_score(),
            unordered_match: record.unordered_match,
            structured_match: record.structured_match,
            decode_failures: trace.decode_failures,
            error: None,
        }
    }

    fn errored(task: &Task, error: TaskError) -> Self {
        let (expected_tools, expected_inputs) = split_steps(&task.golden_steps);
        Self {
            task_id: task.id.clone(),
            weight: task.weight(),
            expected_tools,
            expected_inputs,
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn is_errored(&self) -> bool {
        self.error.is_some()
    }
}

fn split_steps(steps: &[StepSpec]) -> (Vec<Vec<String>>, Vec<Vec<Map<String, Value>>>) {
    steps
        .iter()
        .map(|step| {
            step.calls
                .iter()
                .map(|c| (c.tool.clone(), c.arguments.clone()))
                .unzip::<_, _, Vec<_>, Vec<_>>()
        })
        .unzip()
}

/// Totals for one run. Errored tasks and tasks that ran but scored zero are counted apart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub errored_tasks: usize,
    pub zero_unordered_tasks: usize,
    pub zero_structured_tasks: usize,
    pub total_weight: usize,
    pub unordered_score: usize,
    pub structured_score: usize,
    pub unordered_pct: f64,
    pub structured_pct: f64,
    pub errors_by_kind: BTreeMap<TaskErrorKind, usize>,
}

impl RunSummary {
    pub fn from_reports(reports: &[TaskReport]) -> Self {
        let mut summary = Self {
            total_tasks: reports.len(),
            ..Self::default()
        };
        for report in reports {
            summary.total_weight += report.weight;
            match &report.error {
                Some(error) => {
                    summary.errored_tasks += 1;
                    *summary.errors_by_kind.entry(error.kind).or_default() += 1;
                }
                None => {
                    summary.completed_tasks += 1;
                    summary.unordered_score += report.unordered_score;
                    summary.structured_score += report.structured_score;
                    if !report.unordered_match {
                        summary.zero_unordered_tasks += 1;
                    }
                    if !report.structured_match {
                        summary.zero_structured_tasks += 1;
                    }
                }
            }
        }
        if summary.total_weight > 0 {
            let total = summary.total_weight as f64;
            summary.unordered_pct = 100.0 * summary.unordered_score as f64 / total;
            summary.structured_pct = 100.0 * summary.structured_score as f64 / total;
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub summary: RunSummary,
    pub tasks: Vec<TaskReport>,
}

impl RunReport {
    pub fn new(run_id: impl Into<String>, tasks: Vec<TaskReport>) -> Self {
        Self {
            run_id: run_id.into(),
            created_at: Utc::now(),
            summary: RunSummary::from_reports(&tasks),
            tasks,
        }
    }
}

/// Score every task against its run, in task order. `runs` carry the index of the task
/// they belong to; a task with no matching run is reported as errored.
pub fn build_reports(tasks: &[Task], runs: &[TaskRun], skip: &SkipSet) -> Vec<TaskReport> {
    let mut by_index: HashMap<usize, &TaskRun> = HashMap::with_capacity(runs.len());
    for run in runs {
        if tasks.get(run.index).is_some_and(|t| t.id == run.task_id) {
            by_index.insert(run.index, run);
        } else {
            warn!(task_id = %run.task_id, index = run.index, "run does not match any task");
        }
    }

    tasks
        .iter()
        .enumerate()
        .map(|(index, task)| match by_index.get(&index).map(|run| &run.result) {
            Some(Ok(response)) => TaskReport::new(task, &extract_trace(response), skip),
            Some(Err(error)) => TaskReport::errored(task, error.clone()),
            None => {
                warn!(task_id = %task.id, index, "task missing from run log");
                TaskReport::errored(task, TaskError::missing(&task.id))
            }
        })
        .collect()
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    std::fs::write(path.as_ref(), body)?;
    Ok(())
}
