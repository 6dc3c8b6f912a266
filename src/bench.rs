use std::{path::Path, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    config::{BenchConfig, ModelProvider, ToolHostConfig},
    error::Result,
    model::{ModelClient, OpenAiCompatClient, OracleModel},
    report::{
        AggregateReport, MultiRunAggregator, RunReport, RunSummary, build_reports, write_json,
    },
    scheduler::Scheduler,
    score::SkipSet,
    session::SessionBuilder,
    task::{Task, load_tasks},
    tools::{
        LookupToolHostFactory, MockTable, ProcessToolHostFactory, ToolCatalog, ToolHostFactory,
    },
    trace::{RunRecord, read_run_log, write_run_log},
};

/// Everything one invocation produced: per-run reports plus the avg@R aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchOutcome {
    pub model: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub runs: Vec<RunReport>,
    pub aggregate: AggregateReport,
}

/// Compact view written to `summary.json`; full task detail stays in the per-run reports.
#[derive(Debug, Serialize)]
struct SummaryFile<'a> {
    model: &'a str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    config: &'a BenchConfig,
    runs: Vec<RunHeadline<'a>>,
    aggregate: &'a AggregateReport,
}

#[derive(Debug, Serialize)]
struct RunHeadline<'a> {
    run_id: &'a str,
    #[serde(flatten)]
    summary: &'a RunSummary,
}

pub struct Benchmark {
    config: BenchConfig,
    tasks: Vec<Task>,
    catalog: Arc<ToolCatalog>,
    skip: SkipSet,
    model: Arc<dyn ModelClient>,
    hosts: Arc<dyn ToolHostFactory>,
}

impl Benchmark {
    pub fn new(
        config: BenchConfig,
        tasks: Vec<Task>,
        catalog: ToolCatalog,
        skip: SkipSet,
        model: Arc<dyn ModelClient>,
        hosts: Arc<dyn ToolHostFactory>,
    ) -> Self {
        Self {
            config,
            tasks,
            catalog: Arc::new(catalog),
            skip,
            model,
            hosts,
        }
    }

    /// Load tasks, catalog, skip list and mock tables named by `config`, and build the
    /// configured model client and tool host factory.
    pub fn from_config(config: BenchConfig) -> Result<Self> {
        config.validate()?;
        let tasks = load_tasks(&config.tasks_path)?;
        let catalog = ToolCatalog::load(&config.catalog_path)?;
        let skip = match &config.skip_list_path {
            Some(path) => SkipSet::load(path)?,
            None => SkipSet::default(),
        };

        let model: Arc<dyn ModelClient> = match config.model.provider {
            ModelProvider::Oracle => Arc::new(OracleModel::new(&tasks)),
            ModelProvider::OpenAi => Arc::new(
                OpenAiCompatClient::new(
                    config.model.base_url.clone(),
                    config.model.model.clone(),
                    config.model.api_key()?,
                )
                .with_max_tokens(config.model.max_tokens)
                .with_temperature(config.model.temperature),
            ),
        };

        let hosts: Arc<dyn ToolHostFactory> = match &config.tool_host {
            ToolHostConfig::InProcess => {
                let table = match &config.mock_table_path {
                    Some(path) => MockTable::load(path)?,
                    None => MockTable::default(),
                };
                Arc::new(LookupToolHostFactory::new(table))
            }
            ToolHostConfig::Process { command, args } => {
                Arc::new(ProcessToolHostFactory::new(command.clone(), args.clone()))
            }
        };

        info!(
            tasks = tasks.len(),
            catalog = catalog.len(),
            skip = skip.len(),
            model = %model.model_id(),
            "benchmark loaded"
        );
        Ok(Self::new(config, tasks, catalog, skip, model, hosts))
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Run the task set `config.runs` times, writing a run log and report per run and
    /// `summary.json` with the aggregate into `output_dir`.
    pub async fn run(&self) -> Result<BenchOutcome> {
        let started_at = Utc::now();
        let output_dir = &self.config.output_dir;
        std::fs::create_dir_all(output_dir)?;

        let sessions =
            SessionBuilder::new(self.catalog.clone(), self.model.clone(), self.hosts.clone());
        let scheduler = Scheduler::new(sessions, self.config.scheduler());
        let mut aggregator = MultiRunAggregator::new(self.config.categories.clone());
        let mut runs = Vec::with_capacity(self.config.runs);

        for round in 0..self.config.runs {
            let run_id = Uuid::new_v4().to_string();
            info!(run_id = %run_id, round, total = self.config.runs, "starting run");

            let task_runs = scheduler.run_all(&self.tasks).await;
            write_run_log(output_dir.join(format!("run_{round}.jsonl")), &run_id, &task_runs)?;

            let reports = build_reports(&self.tasks, &task_runs, &self.skip);
            let report = RunReport::new(run_id, reports);
            write_json(output_dir.join(format!("report_{round}.json")), &report)?;
            info!(
                run_id = %report.run_id,
                errored = report.summary.errored_tasks,
                unordered_pct = report.summary.unordered_pct,
                structured_pct = report.summary.structured_pct,
                "run scored"
            );

            aggregator.record(&report.tasks);
            runs.push(report);
        }

        let outcome = BenchOutcome {
            model: self.model.model_id(),
            started_at,
            finished_at: Utc::now(),
            aggregate: aggregator.finish(),
            runs,
        };
        self.write_summary(&outcome)?;
        Ok(outcome)
    }

    /// Score a previously written run log without calling the model again.
    pub fn rescore(&self, log: impl AsRef<Path>) -> Result<RunReport> {
        rescore_log(&self.tasks, &self.skip, log.as_ref())
    }

    fn write_summary(&self, outcome: &BenchOutcome) -> Result<()> {
        let summary = SummaryFile {
            model: &outcome.model,
            started_at: outcome.started_at,
            finished_at: outcome.finished_at,
            config: &self.config,
            runs: outcome
                .runs
                .iter()
                .map(|r| RunHeadline {
                    run_id: &r.run_id,
                    summary: &r.summary,
                })
                .collect(),
            aggregate: &outcome.aggregate,
        };
        let path = self.config.output_dir.join("summary.json");
        write_json(&path, &summary)?;
        info!(
            path = %path.display(),
            runs = outcome.aggregate.runs,
            unordered_pct = outcome.aggregate.overall.unordered_pct,
            structured_pct = outcome.aggregate.overall.structured_pct,
            "summary written"
        );
        Ok(())
    }
}

/// Offline scorer for saved run logs. Needs only the task set and skip list.
pub struct RunScorer {
    tasks: Vec<Task>,
    skip: SkipSet,
}

impl RunScorer {
    pub fn new(tasks: Vec<Task>, skip: SkipSet) -> Self {
        Self { tasks, skip }
    }

    /// Load `tasks_path` and `skip_list_path` from `config`; the catalog and mock
    /// tables are left alone.
    pub fn from_config(config: &BenchConfig) -> Result<Self> {
        let tasks = load_tasks(&config.tasks_path)?;
        let skip = match &config.skip_list_path {
            Some(path) => SkipSet::load(path)?,
            None => SkipSet::default(),
        };
        info!(tasks = tasks.len(), skip = skip.len(), "scorer loaded");
        Ok(Self::new(tasks, skip))
    }

    pub fn rescore(&self, log: impl AsRef<Path>) -> Result<RunReport> {
        rescore_log(&self.tasks, &self.skip, log.as_ref())
    }
}

fn rescore_log(tasks: &[Task], skip: &SkipSet, log: &Path) -> Result<RunReport> {
    let task_runs = read_run_log(log)?;
    let run_id = read_run_id(log)?.unwrap_or_else(|| Uuid::new_v4().to_string());
    Ok(RunReport::new(run_id, build_reports(tasks, &task_runs, skip)))
}

fn read_run_id(log: &Path) -> Result<Option<String>> {
    let raw = std::fs::read_to_string(log)?;
    let Some(line) = raw.lines().find(|l| !l.trim().is_empty()) else {
        return Ok(None);
    };
    let record: RunRecord = serde_json::from_str(line)?;
    Ok(Some(record.run_id))
}
