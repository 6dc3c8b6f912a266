use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rusbench::{
    BenchConfig, Benchmark, Result, RunScorer,
    config::ModelProvider,
    report::write_json,
};

#[derive(Parser)]
#[command(name = "rusbench", version, about = "Tool-calling benchmark runner")]
struct Cli {
    /// JSON config file; flags below override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the task set against the configured model.
    Run {
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        tasks: Option<PathBuf>,
        #[arg(long)]
        concurrency: Option<usize>,
        #[arg(long)]
        pool_size: Option<usize>,
        /// Per-task timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,
        #[arg(long)]
        runs: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Replay golden steps instead of calling a model; every task must score full marks.
        #[arg(long)]
        dry_run: bool,
    },
    /// Re-score a saved run log.
    Score {
        log: PathBuf,
        #[arg(long)]
        tasks: Option<PathBuf>,
        /// Tool names excluded from scoring, one per line.
        #[arg(long)]
        skip_list: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rusbench=info")),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        error!(error = %e, kind = e.type_name(), "rusbench failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => BenchConfig::load(path)?,
        None => BenchConfig::default(),
    };

    match cli.command {
        Commands::Run {
            model,
            tasks,
            concurrency,
            pool_size,
            timeout,
            runs,
            seed,
            output_dir,
            dry_run,
        } => {
            if let Some(model) = model {
                config.model.model = model;
            }
            if let Some(tasks) = tasks {
                config.tasks_path = tasks;
            }
            if let Some(concurrency) = concurrency {
                config.concurrency = concurrency;
            }
            if let Some(pool_size) = pool_size {
                config.pool_size = pool_size;
            }
            if let Some(timeout) = timeout {
                config.per_task_timeout_secs = timeout;
            }
            if let Some(runs) = runs {
                config.runs = runs;
            }
            if seed.is_some() {
                config.seed = seed;
            }
            if let Some(output_dir) = output_dir {
                config.output_dir = output_dir;
            }
            if dry_run {
                config.model.provider = ModelProvider::Oracle;
            }

            let outcome = Benchmark::from_config(config)?.run().await?;
            info!(
                model = %outcome.model,
                runs = outcome.aggregate.runs,
                unordered_pct = format!("{:.2}", outcome.aggregate.overall.unordered_pct),
                structured_pct = format!("{:.2}", outcome.aggregate.overall.structured_pct),
                "benchmark finished"
            );
        }
        Commands::Score {
            log,
            tasks,
            skip_list,
            out,
        } => {
            if let Some(tasks) = tasks {
                config.tasks_path = tasks;
            }
            if skip_list.is_some() {
                config.skip_list_path = skip_list;
            }

            let report = RunScorer::from_config(&config)?.rescore(&log)?;
            let out = out.unwrap_or_else(|| log.with_extension("report.json"));
            write_json(&out, &report)?;
            info!(
                path = %out.display(),
                errored = report.summary.errored_tasks,
                unordered_pct = format!("{:.2}", report.summary.unordered_pct),
                structured_pct = format!("{:.2}", report.summary.structured_pct),
                "run log scored"
            );
        }
    }
    Ok(())
}
