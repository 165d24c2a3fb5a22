use thiserror::Error;

use crate::node::NodeId;

/// Process exit codes for scheduler errors, in the same table as
/// [`CliError::exit_code`](super::CliError::exit_code).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    /// The tree itself is unusable, e.g. two nodes share an id.
    InvalidTree = 12,
    InvalidOrder = 13,
    Aborted = 50,
}

/// Errors raised while planning or driving a run.
///
/// All of these are detected before or outside of individual units of work;
/// failures inside a unit are [`UnitFailure`](super::UnitFailure)s and never
/// abort the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error(
        "Invalid order: would cause setup or teardown of '{group}' to run {segments} times"
    )]
    InvalidOrder { group: NodeId, segments: usize },

    #[error("Duplicate node ID: {0}")]
    DuplicateNodeId(NodeId),

    #[error("Run aborted: queue runner dropped the terminal callback")]
    RunAborted,
}

impl SchedulerError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidOrder { .. } => ErrorCode::InvalidOrder,
            Self::DuplicateNodeId(_) => ErrorCode::InvalidTree,
            Self::RunAborted => ErrorCode::Aborted,
        }
    }
}
