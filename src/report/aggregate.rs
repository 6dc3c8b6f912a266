use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::report::{CategoryScheme, TaskReport};

/// avg@R: mean of the binary outcomes, not pass@R. Empty input scores zero.
pub fn avg_at_r(outcomes: &[bool]) -> f64 {
    if outcomes.is_empty() {
        return 0.0;
    }
    outcomes.iter().filter(|&&ok| ok).count() as f64 / outcomes.len() as f64
}

/// Weighted percentages on both correctness axes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisScores {
    pub tasks: usize,
    pub total_weight: usize,
    pub unordered_pct: f64,
    pub structured_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAggregate {
    pub task_id: String,
    pub weight: usize,
    pub unordered_avg: f64,
    pub structured_avg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub runs: usize,
    pub overall: AxisScores,
    /// Dimension → category → scores.
    pub categories: BTreeMap<String, BTreeMap<String, AxisScores>>,
    pub tasks: Vec<TaskAggregate>,
}

#[derive(Debug, Default)]
struct TaskTally {
    weight: usize,
    unordered: Vec<bool>,
    structured: Vec<bool>,
}

/// Folds the per-task reports of R repeated runs into avg@R category scores.
#[derive(Debug)]
pub struct MultiRunAggregator {
    scheme: CategoryScheme,
    order: Vec<String>,
    tallies: HashMap<String, TaskTally>,
    runs: usize,
}

impl MultiRunAggregator {
    pub fn new(scheme: CategoryScheme) -> Self {
        Self {
            scheme,
            order: Vec::new(),
            tallies: HashMap::new(),
            runs: 0,
        }
    }

    /// Add one run. Errored tasks count as failed outcomes on both axes.
    pub fn record(&mut self, reports: &[TaskReport]) {
        self.runs += 1;
        for report in reports {
            let tally = self
                .tallies
                .entry(report.task_id.clone())
                .or_insert_with(|| {
                    self.order.push(report.task_id.clone());
                    TaskTally::default()
                });
            tally.weight = report.weight;
            tally.unordered.push(report.unordered_match);
            tally.structured.push(report.structured_match);
        }
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn finish(&self) -> AggregateReport {
        let tasks: Vec<TaskAggregate> = self
            .order
            .iter()
            .filter_map(|id| self.tallies.get(id).map(|t| (id, t)))
            .map(|(id, tally)| TaskAggregate {
                task_id: id.clone(),
                weight: tally.weight,
                unordered_avg: self.padded_avg(&tally.unordered),
                structured_avg: self.padded_avg(&tally.structured),
            })
            .collect();

        let overall = weighted(tasks.iter());

        let mut grouped: BTreeMap<String, BTreeMap<String, Vec<&TaskAggregate>>> = BTreeMap::new();
        for task in &tasks {
            for (dimension, category) in self.scheme.categorize(&task.task_id) {
                grouped
                    .entry(dimension)
                    .or_default()
                    .entry(category)
                    .or_default()
                    .push(task);
            }
        }
        let categories = grouped
            .into_iter()
            .map(|(dimension, cats)| {
                let scores = cats
                    .into_iter()
                    .map(|(category, members)| (category, weighted(members.into_iter())))
                    .collect();
                (dimension, scores)
            })
            .collect();

        AggregateReport {
            runs: self.runs,
            overall,
            categories,
            tasks,
        }
    }

    /// Missing runs (task absent from a run) count as failures.
    fn padded_avg(&self, outcomes: &[bool]) -> f64 {
        let mut padded = outcomes.to_vec();
        padded.resize(self.runs.max(outcomes.len()), false);
        avg_at_r(&padded)
    }
}

fn weighted<'a>(tasks: impl Iterator<Item = &'a TaskAggregate>) -> AxisScores {
    let mut scores = AxisScores::default();
    let mut unordered = 0.0;
    let mut structured = 0.0;
    for task in tasks {
        scores.tasks += 1;
        scores.total_weight += task.weight;
        unordered += task.weight as f64 * task.unordered_avg;
        structured += task.weight as f64 * task.structured_avg;
    }
    if scores.total_weight > 0 {
        scores.unordered_pct = 100.0 * unordered / scores.total_weight as f64;
        scores.structured_pct = 100.0 * structured / scores.total_weight as f64;
    }
    scores
}
