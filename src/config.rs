use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, bench_error::BenchError},
    report::CategoryScheme,
    scheduler::SchedulerConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    /// Any OpenAI-compatible `/chat/completions` endpoint.
    OpenAi,
    /// Replays golden steps; used for dry runs.
    Oracle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: ModelProvider,
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key. Never stored in the config file.
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ModelProvider::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: 4096,
            temperature: 0.0,
        }
    }
}

impl ModelConfig {
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).map_err(|_| {
            let msg = format!("environment variable {} is not set", self.api_key_env);
            BenchError::Configuration(msg).into()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolHostConfig {
    /// Answer tool calls from the mock table in-process.
    #[default]
    InProcess,
    /// Spawn one tool-server process per task.
    Process {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

/// Benchmark settings, read from a JSON file and overridden from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub concurrency: usize,
    pub pool_size: usize,
    pub per_task_timeout_secs: u64,
    pub runs: usize,
    pub seed: Option<u64>,
    pub tasks_path: PathBuf,
    pub catalog_path: PathBuf,
    pub skip_list_path: Option<PathBuf>,
    pub mock_table_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub model: ModelConfig,
    pub tool_host: ToolHostConfig,
    pub categories: CategoryScheme,
}

impl Default for BenchConfig {
    fn default() -> Self {
        let scheduler = SchedulerConfig::default();
        Self {
            concurrency: scheduler.concurrency,
            pool_size: scheduler.pool_size,
            per_task_timeout_secs: scheduler.per_task_timeout.as_secs(),
            runs: 1,
            seed: scheduler.seed,
            tasks_path: PathBuf::from("data/tasks.json"),
            catalog_path: PathBuf::from("data/tools.json"),
            skip_list_path: None,
            mock_table_path: None,
            output_dir: PathBuf::from("output"),
            model: ModelConfig::default(),
            tool_host: ToolHostConfig::default(),
            categories: CategoryScheme::default(),
        }
    }
}

impl BenchConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(BenchError::Configuration("concurrency must be at least 1".into()).into());
        }
        if self.runs == 0 {
            return Err(BenchError::Configuration("runs must be at least 1".into()).into());
        }
        if self.per_task_timeout_secs == 0 {
            return Err(
                BenchError::Configuration("per_task_timeout_secs must be positive".into()).into(),
            );
        }
        Ok(())
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            concurrency: self.concurrency,
            pool_size: self.pool_size,
            per_task_timeout: Duration::from_secs(self.per_task_timeout_secs),
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"concurrency": 2, "model": {{"provider": "oracle"}},
                "tool_host": {{"kind": "process", "command": "python3", "args": ["tools.py"]}}}}"#
        )
        .unwrap();

        let config = BenchConfig::load(file.path()).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.per_task_timeout_secs, 360);
        assert_eq!(config.model.provider, ModelProvider::Oracle);
        assert_eq!(config.model.api_key_env, "OPENAI_API_KEY");
        assert_eq!(
            config.tool_host,
            ToolHostConfig::Process {
                command: "python3".into(),
                args: vec!["tools.py".into()]
            }
        );
        assert_eq!(config.scheduler().per_task_timeout, Duration::from_secs(360));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = BenchConfig {
            concurrency: 0,
            ..BenchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = BenchConfig {
            per_task_timeout_secs: 0,
            ..BenchConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
