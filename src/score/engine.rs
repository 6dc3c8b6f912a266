use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    score::{
        SkipSet,
        args::{NormalizedArgs, normalize_arguments},
    },
    task::{StepSpec, Task},
    trace::ExecutionTrace,
};

/// Both correctness verdicts for one task in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub task_id: String,
    pub weight: usize,
    pub unordered_match: bool,
    pub structured_match: bool,
}

impl ScoreRecord {
    pub fn unordered_score(&self) -> usize {
        if self.unordered_match { self.weight } else { 0 }
    }

    pub fn structured_score(&self) -> usize {
        if self.structured_match { self.weight } else { 0 }
    }
}

pub fn score(trace: &ExecutionTrace, task: &Task, skip: &SkipSet) -> ScoreRecord {
    let unordered_match = unordered_match(&trace.steps, &task.golden_steps, skip);
    let structured_match =
        unordered_match && step_topology_matches(&trace.steps, &task.golden_steps, skip);
    ScoreRecord {
        task_id: task.id.clone(),
        weight: task.weight(),
        unordered_match,
        structured_match,
    }
}

/// Full weight when the right tools were called with the right arguments, in any
/// step arrangement; zero otherwise.
pub fn score_unordered(trace: &ExecutionTrace, task: &Task, skip: &SkipSet) -> usize {
    if unordered_match(&trace.steps, &task.golden_steps, skip) {
        task.weight()
    } else {
        0
    }
}

/// Full weight when the unordered check passes and every step holds the same parallel
/// group as its golden counterpart; zero otherwise.
pub fn score_structured(trace: &ExecutionTrace, task: &Task, skip: &SkipSet) -> usize {
    if unordered_match(&trace.steps, &task.golden_steps, skip)
        && step_topology_matches(&trace.steps, &task.golden_steps, skip)
    {
        task.weight()
    } else {
        0
    }
}

type ComparedCalls = BTreeSet<(String, NormalizedArgs)>;

fn tool_names<'a>(steps: impl IntoIterator<Item = &'a StepSpec>) -> BTreeSet<&'a str> {
    steps
        .into_iter()
        .flat_map(|step| step.calls.iter().map(|c| c.tool.as_str()))
        .collect()
}

fn compared_calls<'a>(steps: impl IntoIterator<Item = &'a StepSpec>, skip: &SkipSet) -> ComparedCalls {
    steps
        .into_iter()
        .flat_map(|step| step.calls.iter())
        .filter(|call| !skip.contains(&call.tool))
        .map(|call| (call.tool.clone(), normalize_arguments(&call.arguments)))
        .collect()
}

fn unordered_match(actual: &[StepSpec], golden: &[StepSpec], skip: &SkipSet) -> bool {
    tool_names(actual) == tool_names(golden)
        && compared_calls(actual, skip) == compared_calls(golden, skip)
}

fn step_topology_matches(actual: &[StepSpec], golden: &[StepSpec], skip: &SkipSet) -> bool {
    if actual.len() != golden.len() {
        return false;
    }
    actual.iter().zip(golden).all(|(a, g)| {
        a.tool_names() == g.tool_names()
            && compared_calls(std::iter::once(a), skip) == compared_calls(std::iter::once(g), skip)
    })
}
