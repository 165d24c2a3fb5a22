use thiserror::Error;

use super::scheduler::SchedulerError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("scheduler failed: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("config error: {0}")]
    Config(String),
    #[error("tree file error: {0}")]
    TreeFile(String),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// 0 and 1 are reserved for successful runs (with 1 meaning "some task failed").
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 11,
            Self::TreeFile(_) => 12,
            Self::Scheduler(e) => e.error_code() as i32,
            Self::Anyhow(_) => 50,
        }
    }
}
