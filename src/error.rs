//! Crate-level error types.

use crate::checkpoint::CheckpointError;
use crate::dispatcher::DispatcherError;
use thiserror::Error;

/// Defects in a state-chart definition.
///
/// These are reported synchronously to whoever registered the offending
/// piece, and are never swallowed by the engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("State '{state}' is already registered")]
    DuplicateState { state: String },

    #[error("State '{state}' is not registered")]
    UnknownState { state: String },

    #[error("Event '{event}' is not registered")]
    UnknownEvent { event: String },

    #[error("Making '{parent}' the parent of '{child}' would create a cycle")]
    CycleDetected { child: String, parent: String },

    #[error("Self transition on '{source_state}' must target itself, not '{target}'")]
    InvalidSelfTransition { source_state: String, target: String },

    #[error("Internal transition on '{source_state}' cannot target '{target}'")]
    InvalidInternalTransition { source_state: String, target: String },

    #[error("Composite state '{state}' has no initial child")]
    MissingInitialChild { state: String },

    #[error("Initial child '{child}' is not a direct child of '{state}'")]
    InvalidInitialChild { state: String, child: String },

    #[error("Machine is already initialized; the chart can no longer change")]
    AlreadyInitialized,
}

/// Errors returned by the public machine surface.
#[derive(Debug, Error)]
pub enum HsmError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("State chart is invalid ({} defect(s)): {}", .0.len(), join(.0))]
    InvalidChart(Vec<ConfigurationError>),

    #[error(transparent)]
    Dispatcher(#[from] DispatcherError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("Machine is not bound to a dispatcher")]
    NotInitialized,

    #[error("Pending event queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("Machine core is busy processing an event on this thread")]
    Busy,
}

fn join(errors: &[ConfigurationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_chart_lists_every_defect() {
        let err = HsmError::InvalidChart(vec![
            ConfigurationError::MissingInitialChild {
                state: "Parent".into(),
            },
            ConfigurationError::UnknownState {
                state: "Ghost".into(),
            },
        ]);

        let text = err.to_string();
        assert!(text.contains("2 defect(s)"));
        assert!(text.contains("'Parent' has no initial child"));
        assert!(text.contains("'Ghost' is not registered"));
    }

    #[test]
    fn configuration_errors_convert_transparently() {
        let err: HsmError = ConfigurationError::AlreadyInitialized.into();
        assert_eq!(
            err.to_string(),
            ConfigurationError::AlreadyInitialized.to_string()
        );
    }
}
