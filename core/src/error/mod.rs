#[allow(clippy::module_inception)]
pub mod error;
pub mod scheduler;
pub mod sink;
pub mod unit;

pub use error::CliError;
pub use scheduler::{ErrorCode, SchedulerError};
pub use sink::{CollectedErrors, ErrorSink, TracingErrorSink};
pub use unit::{MultipleCompletion, UnitFailure};
