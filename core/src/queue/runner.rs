use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::context::SharedContext;
use crate::error::UnitFailure;

use super::token::{CompletionToken, MultipleDoneHandler};
use super::unit::{ExceptionHandler, QueueRun, QueueableUnit};

/// Sequences callback-style units of work.
///
/// Implementations must invoke units in the supplied order (or document the
/// concurrency they allow), pass the run's context to every unit, route
/// synchronous failures to `on_exception`, report repeated completion through
/// `on_multiple_done`, and call `on_complete` exactly once after every unit
/// has finished.
pub trait QueueRunner: Send + Sync {
    fn run(&self, run: QueueRun);
}

/// Runs units one after another.
///
/// Synchronous completions are drained in a loop, so deep trees do not grow
/// the stack. When a unit completes later, the queue resumes on the thread
/// that fired its token.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialQueueRunner;

impl SequentialQueueRunner {
    pub fn new() -> Self {
        Self
    }
}

impl QueueRunner for SequentialQueueRunner {
    fn run(&self, run: QueueRun) {
        let QueueRun {
            units,
            context,
            on_exception,
            on_complete,
            on_multiple_done,
        } = run;

        let driver = Arc::new(QueueDriver {
            units: Mutex::new(units.into()),
            context,
            on_exception,
            on_complete: Mutex::new(Some(on_complete)),
            on_multiple_done,
        });
        driver.drain();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// The unit is executing on the draining thread.
    Running,
    /// The unit returned without completing; its token resumes the queue.
    Parked,
    Settled,
}

struct QueueDriver {
    units: Mutex<VecDeque<QueueableUnit>>,
    context: SharedContext,
    on_exception: ExceptionHandler,
    on_complete: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    on_multiple_done: Option<MultipleDoneHandler>,
}

impl QueueDriver {
    fn drain(self: Arc<Self>) {
        loop {
            let next = lock(&self.units).pop_front();
            let Some(unit) = next else {
                self.finish();
                return;
            };

            let label = unit.label().map(str::to_owned);
            let step = Arc::new(Mutex::new(Step::Running));
            let token = {
                let step = step.clone();
                let driver = self.clone();
                CompletionToken::new(label.clone(), self.on_multiple_done.clone(), move || {
                    let resume = {
                        let mut step = lock(&step);
                        let parked = *step == Step::Parked;
                        *step = Step::Settled;
                        parked
                    };
                    if resume {
                        driver.drain();
                    }
                })
            };

            let ctx = self.context.clone();
            let outcome = catch_unwind(AssertUnwindSafe(move || unit.invoke(ctx, token)));
            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(failure)) => Some(failure),
                Err(payload) => Some(UnitFailure::from_panic(payload)),
            };

            if let Some(failure) = failure {
                tracing::debug!(unit = label.as_deref().unwrap_or("-"), %failure, "unit failed");
                *lock(&step) = Step::Settled;
                (self.on_exception)(failure);
                continue;
            }

            let parked = {
                let mut step = lock(&step);
                if *step == Step::Running {
                    *step = Step::Parked;
                    true
                } else {
                    false
                }
            };
            if parked {
                return;
            }
        }
    }

    fn finish(&self) {
        let on_complete = lock(&self.on_complete).take();
        if let Some(on_complete) = on_complete {
            on_complete();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
