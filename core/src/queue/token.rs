use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::MultipleCompletion;

/// Receives completion-token violations.
pub type MultipleDoneHandler = Arc<dyn Fn(MultipleCompletion) + Send + Sync>;

type Continuation = Box<dyn FnOnce() + Send>;

/// One-shot completion token handed to every unit of work.
///
/// Clones share state: the first `complete` call on any clone fires the
/// continuation, every later call is a [`MultipleCompletion`] violation.
#[derive(Clone)]
pub struct CompletionToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    label: Option<String>,
    fired: AtomicBool,
    continuation: Mutex<Option<Continuation>>,
    on_multiple_done: Option<MultipleDoneHandler>,
}

impl CompletionToken {
    pub fn new<F>(
        label: Option<String>,
        on_multiple_done: Option<MultipleDoneHandler>,
        continuation: F,
    ) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            inner: Arc::new(TokenInner {
                label,
                fired: AtomicBool::new(false),
                continuation: Mutex::new(Some(Box::new(continuation))),
                on_multiple_done,
            }),
        }
    }

    /// Token whose continuation does nothing.
    pub fn detached(label: Option<String>) -> Self {
        Self::new(label, None, || {})
    }

    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    pub fn is_completed(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }

    /// Signal completion. Violations are delivered to the multiple-done handler.
    pub fn complete(&self) {
        let _ = self.try_complete();
    }

    /// Signal completion and observe a violation directly.
    ///
    /// The multiple-done handler is notified either way.
    pub fn try_complete(&self) -> Result<(), MultipleCompletion> {
        if self.inner.fired.swap(true, Ordering::AcqRel) {
            let violation = MultipleCompletion {
                unit: self.inner.label.clone(),
            };
            match &self.inner.on_multiple_done {
                Some(handler) => handler(violation.clone()),
                None => tracing::error!(%violation, "completion token fired twice"),
            }
            return Err(violation);
        }

        let continuation = match self.inner.continuation.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(continuation) = continuation {
            continuation();
        }
        Ok(())
    }
}

impl fmt::Debug for CompletionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionToken")
            .field("label", &self.inner.label)
            .field("fired", &self.is_completed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_fires_continuation_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let violations = Arc::new(Mutex::new(Vec::new()));

        let token = {
            let hits = hits.clone();
            let violations = violations.clone();
            CompletionToken::new(
                Some("unit-a".into()),
                Some(Arc::new(move |v: MultipleCompletion| {
                    violations.lock().unwrap().push(v);
                })),
                move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                },
            )
        };

        let clone = token.clone();
        assert!(token.try_complete().is_ok());
        assert!(clone.is_completed());

        let err = clone.try_complete().unwrap_err();
        assert_eq!(err.unit.as_deref(), Some("unit-a"));
        token.complete();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(violations.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_detached_token_still_detects_reuse() {
        let token = CompletionToken::detached(None);
        assert!(!token.is_completed());
        assert!(token.try_complete().is_ok());
        assert!(token.try_complete().is_err());
    }
}
