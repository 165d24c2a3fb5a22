//! Queue-running primitive
//!
//! Units of work are plain callbacks that receive the run's shared context and
//! a one-shot [`CompletionToken`]. A [`QueueRunner`] sequences them and reports
//! back through the handlers of a [`QueueRun`].

mod runner;
mod token;
mod unit;

pub use runner::{QueueRunner, SequentialQueueRunner};
pub use token::{CompletionToken, MultipleDoneHandler};
pub use unit::{ExceptionHandler, QueueRun, QueueableUnit};
