//! User callbacks attached to states and transitions.

use super::args::Variant;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a user callback.
///
/// Returning this from an entry, exit, behavior or action callback stops
/// processing of the current event at that point.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct CallbackError {
    message: String,
}

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for CallbackError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for CallbackError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

pub type CallbackResult = Result<(), CallbackError>;

/// Shared callback invoked with the event's argument vector.
pub type Callback = Arc<dyn Fn(&[Variant]) -> CallbackResult + Send + Sync>;

/// Wrap a closure as a [`Callback`].
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(&[Variant]) -> CallbackResult + Send + Sync + 'static,
{
    Arc::new(f)
}
