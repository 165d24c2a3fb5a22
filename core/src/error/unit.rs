use std::any::Any;

use serde::Serialize;
use thiserror::Error;

/// A completion token was fired more than once.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{} called its completion callback more than once", .unit.as_deref().unwrap_or("a unit of work"))]
pub struct MultipleCompletion {
    pub unit: Option<String>,
}

/// Failure raised synchronously by a unit of work, or reported against a node.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitFailure {
    #[error("{message}")]
    Error { message: String },

    #[error("panicked: {message}")]
    Panic { message: String },

    #[error(transparent)]
    MultipleCompletion(#[from] MultipleCompletion),
}

impl UnitFailure {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Convert a payload caught by `catch_unwind`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panic { message }
    }
}
