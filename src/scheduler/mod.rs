use std::{collections::BTreeSet, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rand::{SeedableRng, rngs::StdRng};
use tokio::{sync::Semaphore, time::Instant};
use tracing::{error, info, warn};

use crate::{
    error::{Error, TaskError, bench_error::BenchError},
    session::SessionBuilder,
    task::Task,
    tools::sample_pool,
    trace::RawResponse,
};

pub type TaskResult = std::result::Result<RawResponse, TaskError>;

/// Outcome of one task in one scheduler pass.
#[derive(Debug, Clone)]
pub struct TaskRun {
    /// Position of the task in the input list.
    pub index: usize,
    pub task_id: String,
    pub started_at: DateTime<Utc>,
    pub result: TaskResult,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub concurrency: usize,
    pub pool_size: usize,
    pub per_task_timeout: Duration,
    /// Fixes tool-pool sampling per task index when set.
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            pool_size: 10,
            per_task_timeout: Duration::from_secs(360),
            seed: None,
        }
    }
}

pub struct Scheduler {
    sessions: SessionBuilder,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(sessions: SessionBuilder, config: SchedulerConfig) -> Self {
        Self { sessions, config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run every task under the concurrency gate and return one [`TaskRun`] per task, in
    /// input order. A failing, panicking or timed-out task never affects the others.
    pub async fn run_all(&self, tasks: &[Task]) -> Vec<TaskRun> {
        let gate = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let all_tools = Arc::new(self.sessions.catalog().names());

        info!(
            tasks = tasks.len(),
            concurrency = self.config.concurrency,
            pool_size = self.config.pool_size,
            timeout_secs = self.config.per_task_timeout.as_secs(),
            "scheduling tasks"
        );

        let handles = tasks.iter().cloned().enumerate().map(|(index, task)| {
            let gate = gate.clone();
            let sessions = self.sessions.clone();
            let config = self.config.clone();
            let all_tools = all_tools.clone();
            let task_id = task.id.clone();
            let spawned_at = Utc::now();

            let handle = tokio::spawn(async move {
                let _permit = match gate.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        let err: Error =
                            BenchError::Configuration("concurrency gate closed".into()).into();
                        return TaskRun {
                            index,
                            task_id: task.id.clone(),
                            started_at: Utc::now(),
                            result: Err(TaskError::execution(&task.id, &err, Duration::ZERO)),
                        };
                    }
                };
                run_one(index, &task, &sessions, &config, &all_tools).await
            });

            async move {
                match handle.await {
                    Ok(run) => run,
                    Err(join_err) => {
                        error!(task_id = %task_id, error = %join_err, "task panicked");
                        let elapsed = (Utc::now() - spawned_at).to_std().unwrap_or_default();
                        TaskRun {
                            index,
                            task_id: task_id.clone(),
                            started_at: spawned_at,
                            result: Err(TaskError::panicked(&task_id, join_err.to_string(), elapsed)),
                        }
                    }
                }
            }
        });

        let runs = join_all(handles).await;

        let failed = runs.iter().filter(|r| r.result.is_err()).count();
        info!(tasks = runs.len(), failed, "all tasks finished");
        runs
    }
}

async fn run_one(
    index: usize,
    task: &Task,
    sessions: &SessionBuilder,
    config: &SchedulerConfig,
    all_tools: &BTreeSet<String>,
) -> TaskRun {
    let started_at = Utc::now();
    let start = Instant::now();
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
        None => StdRng::from_entropy(),
    };

    let result = execute(task, sessions, config, all_tools, &mut rng, start).await;

    match &result {
        Ok(response) => info!(
            task_id = %task.id,
            elapsed_ms = response.elapsed_ms,
            tool_calls = response.tool_call_count(),
            "task completed"
        ),
        Err(e) => warn!(
            task_id = %task.id,
            kind = %e.kind,
            elapsed_ms = e.elapsed_ms,
            error = %e.message,
            "task failed"
        ),
    }

    TaskRun {
        index,
        task_id: task.id.clone(),
        started_at,
        result,
    }
}

async fn execute(
    task: &Task,
    sessions: &SessionBuilder,
    config: &SchedulerConfig,
    all_tools: &BTreeSet<String>,
    rng: &mut StdRng,
    start: Instant,
) -> TaskResult {
    let pool = sample_pool(&task.golden_tools(), config.pool_size, all_tools, rng)
        .map_err(|e| TaskError::construction(&task.id, &e, start.elapsed()))?;
    let mut session = sessions
        .build(&task.id, &pool, task.weight())
        .await
        .map_err(|e| TaskError::construction(&task.id, &e, start.elapsed()))?;

    let outcome = session
        .run_with_timeout(&task.prompt, config.per_task_timeout)
        .await;

    if let Err(e) = session.close().await {
        warn!(task_id = %task.id, error = %e, "tool host cleanup failed");
    }

    match outcome {
        Ok(Ok(mut response)) => {
            response.elapsed_ms = start.elapsed().as_millis() as u64;
            Ok(response)
        }
        Ok(Err(e)) => Err(TaskError::execution(&task.id, &e, start.elapsed())),
        Err(_) => Err(TaskError::timeout(
            &task.id,
            config.per_task_timeout,
            start.elapsed(),
        )),
    }
}
