pub mod event;
pub mod extract;
pub mod log;

pub use event::{RawResponse, RawToolCall, RequestEvent, Usage};
pub use extract::{ExecutionTrace, extract_trace};
pub use log::{RunRecord, read_run_log, write_run_log};
