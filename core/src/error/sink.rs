use std::sync::Mutex;

use super::unit::UnitFailure;

/// Shared error-reporting target handed to every task.
///
/// Tasks use it for failures that cannot be attributed to their own result,
/// such as failures reported after the task already completed.
pub trait ErrorSink: Send + Sync {
    fn report(&self, failure: UnitFailure);
}

/// Logs reported failures and drops them.
#[derive(Debug, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, failure: UnitFailure) {
        tracing::error!(%failure, "failure reported outside of any task");
    }
}

/// Keeps reported failures for later inspection.
#[derive(Debug, Default)]
pub struct CollectedErrors {
    failures: Mutex<Vec<UnitFailure>>,
}

impl CollectedErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<UnitFailure> {
        match self.failures.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ErrorSink for CollectedErrors {
    fn report(&self, failure: UnitFailure) {
        let mut guard = match self.failures.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(failure);
    }
}
