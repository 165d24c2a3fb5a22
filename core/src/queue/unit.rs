use std::fmt;
use std::sync::Arc;

use crate::context::SharedContext;
use crate::error::UnitFailure;

use super::token::{CompletionToken, MultipleDoneHandler};

/// Receives failures raised synchronously by queued units.
pub type ExceptionHandler = Arc<dyn Fn(UnitFailure) + Send + Sync>;

type UnitFn = Box<dyn FnOnce(SharedContext, CompletionToken) -> Result<(), UnitFailure> + Send>;

/// A single callback-style unit of work.
///
/// The unit must fire its [`CompletionToken`] exactly once, either before it
/// returns or later from any thread. Returning `Err` counts as finishing.
pub struct QueueableUnit {
    label: Option<String>,
    func: UnitFn,
}

impl QueueableUnit {
    pub fn new<F>(label: impl Into<Option<String>>, func: F) -> Self
    where
        F: FnOnce(SharedContext, CompletionToken) -> Result<(), UnitFailure> + Send + 'static,
    {
        Self {
            label: label.into(),
            func: Box::new(func),
        }
    }

    /// Unit that completes as soon as `func` returns successfully.
    pub fn immediate<F>(label: impl Into<Option<String>>, func: F) -> Self
    where
        F: FnOnce(&SharedContext) -> Result<(), UnitFailure> + Send + 'static,
    {
        Self::new(label, move |ctx, done| {
            func(&ctx)?;
            done.complete();
            Ok(())
        })
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn invoke(self, ctx: SharedContext, done: CompletionToken) -> Result<(), UnitFailure> {
        (self.func)(ctx, done)
    }
}

impl fmt::Debug for QueueableUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueableUnit")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// One submission to a [`QueueRunner`](super::QueueRunner).
pub struct QueueRun {
    pub units: Vec<QueueableUnit>,
    pub context: SharedContext,
    pub on_exception: ExceptionHandler,
    pub on_complete: Box<dyn FnOnce() + Send>,
    pub on_multiple_done: Option<MultipleDoneHandler>,
}

impl QueueRun {
    pub fn new<F>(units: Vec<QueueableUnit>, context: SharedContext, on_complete: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            units,
            context,
            on_exception: Arc::new(|failure: UnitFailure| {
                tracing::warn!(%failure, "unhandled unit failure");
            }),
            on_complete: Box::new(on_complete),
            on_multiple_done: None,
        }
    }

    pub fn on_exception(mut self, handler: ExceptionHandler) -> Self {
        self.on_exception = handler;
        self
    }

    pub fn on_multiple_done(mut self, handler: MultipleDoneHandler) -> Self {
        self.on_multiple_done = Some(handler);
        self
    }
}
