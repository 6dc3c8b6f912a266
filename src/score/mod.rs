pub mod args;
pub mod engine;
pub mod skip;

pub use args::{NormalizedArgs, canonical_string, decode_arguments, normalize_arguments};
pub use engine::{ScoreRecord, score, score_structured, score_unordered};
pub use skip::SkipSet;
