use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, TaskError, bench_error::BenchError},
    scheduler::TaskRun,
    trace::RawResponse,
};

/// One line of the raw run log: either a response or the error that replaced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub index: usize,
    pub task_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<RawResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
}

impl RunRecord {
    pub fn from_run(run_id: &str, run: &TaskRun) -> Self {
        let (response, error) = match &run.result {
            Ok(response) => (Some(response.clone()), None),
            Err(error) => (None, Some(error.clone())),
        };
        Self {
            run_id: run_id.to_string(),
            index: run.index,
            task_id: run.task_id.clone(),
            started_at: run.started_at,
            response,
            error,
        }
    }

    pub fn into_run(self) -> Result<TaskRun> {
        let result = match (self.response, self.error) {
            (Some(response), None) => Ok(response),
            (None, Some(error)) => Err(error),
            _ => {
                return Err(BenchError::InvalidData(format!(
                    "run record for {} must hold exactly one of response or error",
                    self.task_id
                ))
                .into());
            }
        };
        Ok(TaskRun {
            index: self.index,
            task_id: self.task_id,
            started_at: self.started_at,
            result,
        })
    }
}

pub fn write_run_log(path: impl AsRef<Path>, run_id: &str, runs: &[TaskRun]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    for run in runs {
        serde_json::to_writer(&mut writer, &RunRecord::from_run(run_id, run))?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a JSON Lines run log back, ordered by original task index.
pub fn read_run_log(path: impl AsRef<Path>) -> Result<Vec<TaskRun>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut runs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: RunRecord = serde_json::from_str(&line)?;
        runs.push(record.into_run()?);
    }
    runs.sort_by_key(|r| r.index);
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::TaskErrorKind,
        trace::{RawToolCall, RequestEvent},
    };
    use std::time::Duration;

    #[test]
    fn log_preserves_responses_and_errors() {
        let mut response = RawResponse::new("a");
        response.events.push(RequestEvent::ToolCalls {
            turn: 0,
            calls: vec![RawToolCall {
                id: "1".into(),
                name: "A".into(),
                arguments: "{broken".into(),
            }],
        });
        let runs = vec![
            TaskRun {
                index: 1,
                task_id: "b".into(),
                started_at: Utc::now(),
                result: Err(TaskError::timeout("b", Duration::from_secs(1), Duration::from_secs(1))),
            },
            TaskRun {
                index: 0,
                task_id: "a".into(),
                started_at: Utc::now(),
                result: Ok(response.clone()),
            },
        ];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        write_run_log(&path, "run-1", &runs).unwrap();
        let restored = read_run_log(&path).unwrap();

        assert_eq!(restored.len(), 2);
        assert_eq!(restored[0].task_id, "a");
        assert_eq!(restored[0].result.as_ref().unwrap(), &response);
        assert_eq!(
            restored[1].result.as_ref().unwrap_err().kind,
            TaskErrorKind::Timeout
        );
    }

    #[test]
    fn record_with_neither_payload_is_invalid() {
        let record = RunRecord {
            run_id: "r".into(),
            index: 0,
            task_id: "x".into(),
            started_at: Utc::now(),
            response: None,
            error: None,
        };
        assert!(record.into_run().is_err());
    }
}
