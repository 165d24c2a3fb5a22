//! Lifecycle observers that print group events as they happen.

mod jsonl;
mod text;

pub use jsonl::{new_run_id, JsonlReporter};
pub use text::TextReporter;
