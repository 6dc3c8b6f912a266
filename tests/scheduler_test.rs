#[cfg(test)]
mod scheduler_tests {
    use std::{
        collections::HashMap,
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::{Duration, Instant},
    };

    use async_trait::async_trait;
    use serde_json::{Map, Value, json};

    use rusbench::{
        error::{Result, TaskErrorKind, task_error::TIMEOUT_HINT},
        model::{CompletionRequest, ModelClient, ModelTurn, OracleModel},
        report::build_reports,
        scheduler::{Scheduler, SchedulerConfig},
        score::SkipSet,
        session::SessionBuilder,
        task::Task,
        tools::{ToolCatalog, ToolDescriptor, ToolHost, ToolHostFactory},
        trace::RequestEvent,
    };

    type OfferedPools = Arc<Mutex<HashMap<String, Vec<String>>>>;

    /// Oracle that can be told to stall or panic on specific prompts. Records the tool
    /// pool each prompt was offered.
    struct ScriptedModel {
        oracle: OracleModel,
        delays: HashMap<String, Duration>,
        panic_on: Option<String>,
        offered: OfferedPools,
    }

    impl ScriptedModel {
        fn new(tasks: &[Task]) -> Self {
            Self {
                oracle: OracleModel::new(tasks),
                delays: HashMap::new(),
                panic_on: None,
                offered: OfferedPools::default(),
            }
        }

        fn delay(mut self, task: &Task, by: Duration) -> Self {
            self.delays.insert(task.prompt.clone(), by);
            self
        }

        fn panic_on(mut self, task: &Task) -> Self {
            self.panic_on = Some(task.prompt.clone());
            self
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn complete(&self, request: &CompletionRequest) -> Result<ModelTurn> {
            let prompt = request.prompt().unwrap_or_default().to_string();
            self.offered
                .lock()
                .unwrap()
                .entry(prompt.clone())
                .or_insert_with(|| request.tools.iter().map(|t| t.name.clone()).collect());
            if self.panic_on.as_deref() == Some(prompt.as_str()) {
                panic!("scripted model failure");
            }
            if let Some(delay) = self.delays.get(&prompt) {
                tokio::time::sleep(*delay).await;
            }
            self.oracle.complete(request).await
        }

        fn model_id(&self) -> String {
            "scripted".to_string()
        }
    }

    #[derive(Default)]
    struct Counters {
        spawned: AtomicUsize,
        shut_down: AtomicUsize,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    struct CountingFactory {
        counters: Arc<Counters>,
    }

    struct CountingHost {
        counters: Arc<Counters>,
        calls: usize,
        closed: bool,
    }

    #[async_trait]
    impl ToolHostFactory for CountingFactory {
        async fn spawn(
            &self,
            _task_id: &str,
            _tools: &[ToolDescriptor],
        ) -> Result<Box<dyn ToolHost>> {
            self.counters.spawned.fetch_add(1, Ordering::SeqCst);
            let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.peak.fetch_max(active, Ordering::SeqCst);
            Ok(Box::new(CountingHost {
                counters: self.counters.clone(),
                calls: 0,
                closed: false,
            }))
        }
    }

    #[async_trait]
    impl ToolHost for CountingHost {
        async fn call(&mut self, name: &str, _arguments: &Map<String, Value>) -> Result<Value> {
            self.calls += 1;
            // Yield so concurrent sessions interleave their calls.
            tokio::task::yield_now().await;
            Ok(json!({ "tool": name, "seen": self.calls }))
        }

        fn calls(&self) -> usize {
            self.calls
        }

        async fn shutdown(&mut self) -> Result<()> {
            if !self.closed {
                self.closed = true;
                self.counters.shut_down.fetch_add(1, Ordering::SeqCst);
                self.counters.active.fetch_sub(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    fn catalog() -> Arc<ToolCatalog> {
        let tools = ["lookup", "search", "fetch", "translate", "convert", "summarize"]
            .into_iter()
            .map(|n| {
                ToolDescriptor::new(n.to_string(), format!("{n} tool"), json!({"type": "object"}))
            })
            .collect();
        Arc::new(ToolCatalog::new(tools).unwrap())
    }

    fn task(id: &str, steps: Value) -> Task {
        serde_json::from_value(json!({
            "id": id,
            "prompt": format!("please solve {id}"),
            "golden_steps": steps,
        }))
        .unwrap()
    }

    fn five_tasks() -> Vec<Task> {
        vec![
            task("single_1", json!([[{"tool": "lookup", "arguments": {"id": 1}}]])),
            task(
                "parallel_2",
                json!([[
                    {"tool": "search", "arguments": {"q": "a"}},
                    {"tool": "fetch", "arguments": {"url": "x"}}
                ]]),
            ),
            task("single_3", json!([[{"tool": "translate", "arguments": {"text": "hi"}}]])),
            task(
                "sequential_4",
                json!([
                    [{"tool": "search", "arguments": {"q": "b"}}],
                    [{"tool": "summarize", "arguments": {"doc": "b"}}]
                ]),
            ),
            task("single_5", json!([[{"tool": "convert", "arguments": {"amount": 2.0}}]])),
        ]
    }

    fn scheduler(
        model: ScriptedModel,
        counters: &Arc<Counters>,
        config: SchedulerConfig,
    ) -> Scheduler {
        let sessions = SessionBuilder::new(
            catalog(),
            Arc::new(model),
            Arc::new(CountingFactory {
                counters: counters.clone(),
            }),
        );
        Scheduler::new(sessions, config)
    }

    fn config(concurrency: usize, timeout: Duration) -> SchedulerConfig {
        SchedulerConfig {
            concurrency,
            pool_size: 4,
            per_task_timeout: timeout,
            seed: Some(42),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_isolated_to_one_task() {
        let tasks = five_tasks();
        let model = ScriptedModel::new(&tasks).delay(&tasks[2], Duration::from_secs(30));
        let counters = Arc::new(Counters::default());
        let scheduler = scheduler(model, &counters, config(5, Duration::from_millis(300)));

        let started = Instant::now();
        let runs = scheduler.run_all(&tasks).await;
        assert!(started.elapsed() < Duration::from_secs(10));

        assert_eq!(runs.len(), 5);
        let err = runs[2].result.as_ref().unwrap_err();
        assert_eq!(err.kind, TaskErrorKind::Timeout);
        assert_eq!(err.task_id, "single_3");
        assert_eq!(err.hint.as_deref(), Some(TIMEOUT_HINT));
        assert!(err.elapsed_ms >= 300);

        let reports = build_reports(&tasks, &runs, &SkipSet::default());
        for (i, report) in reports.iter().enumerate() {
            if i == 2 {
                assert!(report.is_errored());
                assert_eq!(report.unordered_score, 0);
            } else {
                assert!(report.structured_match, "task {} should score", report.task_id);
                assert_eq!(report.unordered_score, tasks[i].weight());
            }
        }

        // The timed-out session's host is released too.
        assert_eq!(counters.spawned.load(Ordering::SeqCst), 5);
        assert_eq!(counters.shut_down.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let tasks = five_tasks();
        let mut model = ScriptedModel::new(&tasks);
        for (i, task) in tasks.iter().enumerate() {
            // Earlier tasks finish later.
            model = model.delay(task, Duration::from_millis(20 * (5 - i as u64)));
        }
        let counters = Arc::new(Counters::default());
        let scheduler = scheduler(model, &counters, config(3, Duration::from_secs(10)));

        let runs = scheduler.run_all(&tasks).await;
        for (i, run) in runs.iter().enumerate() {
            assert_eq!(run.index, i);
            assert_eq!(run.task_id, tasks[i].id);
            assert!(run.result.is_ok());
        }
    }

    #[tokio::test]
    async fn test_concurrency_gate_bounds_live_sessions() {
        let tasks = five_tasks();
        let mut model = ScriptedModel::new(&tasks);
        for task in &tasks {
            model = model.delay(task, Duration::from_millis(50));
        }
        let counters = Arc::new(Counters::default());
        let scheduler = scheduler(model, &counters, config(2, Duration::from_secs(10)));

        let runs = scheduler.run_all(&tasks).await;
        assert!(runs.iter().all(|r| r.result.is_ok()));
        assert!(counters.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(counters.active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_sessions_keep_separate_tool_state() {
        let step = json!([[
            {"tool": "lookup", "arguments": {"id": 1}},
            {"tool": "lookup", "arguments": {"id": 2}},
            {"tool": "lookup", "arguments": {"id": 3}}
        ]]);
        let tasks: Vec<Task> = (0..4)
            .map(|i| task(&format!("parallel_{i}"), step.clone()))
            .collect();
        let counters = Arc::new(Counters::default());
        let model = ScriptedModel::new(&tasks);
        let scheduler = scheduler(model, &counters, config(4, Duration::from_secs(10)));

        let runs = scheduler.run_all(&tasks).await;
        for run in &runs {
            let response = run.result.as_ref().unwrap();
            let seen: Vec<u64> = response
                .events
                .iter()
                .filter_map(|e| match e {
                    RequestEvent::ToolResult { output, .. } => output["seen"].as_u64(),
                    _ => None,
                })
                .collect();
            assert_eq!(seen, vec![1, 2, 3], "task {} saw another task's calls", run.task_id);
        }
    }

    #[tokio::test]
    async fn test_construction_failure_is_recorded_per_task() {
        let mut tasks = five_tasks();
        tasks[1] = task("single_bad", json!([[{"tool": "not_in_catalog", "arguments": {}}]]));
        let counters = Arc::new(Counters::default());
        let model = ScriptedModel::new(&tasks);
        let scheduler = scheduler(model, &counters, config(2, Duration::from_secs(10)));

        let runs = scheduler.run_all(&tasks).await;
        let err = runs[1].result.as_ref().unwrap_err();
        assert_eq!(err.kind, TaskErrorKind::SessionConstruction);
        assert_eq!(err.error_type, "ConfigurationError");
        assert_eq!(runs.iter().filter(|r| r.result.is_ok()).count(), 4);
        // No host was spawned for the broken task.
        assert_eq!(counters.spawned.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_too_few_distractors_fails_construction() {
        let tasks = five_tasks();
        let counters = Arc::new(Counters::default());
        let config = SchedulerConfig {
            pool_size: 10,
            ..config(2, Duration::from_secs(10))
        };
        let scheduler = scheduler(ScriptedModel::new(&tasks), &counters, config);

        let runs = scheduler.run_all(&tasks).await;
        assert!(runs.iter().all(|r| matches!(
            &r.result,
            Err(e) if e.kind == TaskErrorKind::SessionConstruction
        )));
        assert_eq!(counters.spawned.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_abort_batch() {
        let tasks = five_tasks();
        let model = ScriptedModel::new(&tasks).panic_on(&tasks[0]);
        let counters = Arc::new(Counters::default());
        let scheduler = scheduler(model, &counters, config(2, Duration::from_secs(10)));

        let runs = scheduler.run_all(&tasks).await;
        let err = runs[0].result.as_ref().unwrap_err();
        assert_eq!(err.kind, TaskErrorKind::Execution);
        assert_eq!(err.error_type, "panic");
        assert!(runs[1..].iter().all(|r| r.result.is_ok()));
    }

    #[tokio::test]
    async fn test_seeded_pools_are_reproducible() {
        let tasks = five_tasks();
        let counters = Arc::new(Counters::default());

        let first = ScriptedModel::new(&tasks);
        let first_pools = first.offered.clone();
        scheduler(first, &counters, config(5, Duration::from_secs(10)))
            .run_all(&tasks)
            .await;

        let second = ScriptedModel::new(&tasks);
        let second_pools = second.offered.clone();
        scheduler(second, &counters, config(1, Duration::from_secs(10)))
            .run_all(&tasks)
            .await;

        let first_pools = first_pools.lock().unwrap().clone();
        assert_eq!(first_pools.len(), 5);
        assert!(first_pools.values().all(|pool| pool.len() == 4));
        assert_eq!(first_pools, *second_pools.lock().unwrap());
    }
}
