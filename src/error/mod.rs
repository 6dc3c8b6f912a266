pub mod bench_error;
pub mod task_error;

use std::io;

use thiserror::Error as ThisError;

use crate::error::bench_error::BenchError;

pub use task_error::{TaskError, TaskErrorKind};

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serde_json error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("bench error: {0}")]
    BenchError(#[from] BenchError),
}

impl Error {
    /// Short, stable name of the error variant, recorded on task failures for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Error::Io(_) => "Io",
            Error::SerdeJsonError(_) => "SerdeJson",
            Error::Http(_) => "Http",
            Error::BenchError(e) => e.type_name(),
        }
    }

    /// True when the failure happened while assembling a session rather than running it.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Error::BenchError(BenchError::Configuration(_) | BenchError::ToolHost(_))
        )
    }
}

pub type Result<T> = core::result::Result<T, Error>;
