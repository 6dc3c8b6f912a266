pub mod bench;
pub mod config;
pub mod error;
pub mod model;
pub mod prompt;
pub mod report;
pub mod scheduler;
pub mod score;
pub mod session;
pub mod task;
pub mod tools;
pub mod trace;
pub mod utils;

pub use bench::{BenchOutcome, Benchmark, RunScorer};
pub use config::BenchConfig;
pub use error::{Error, Result};
