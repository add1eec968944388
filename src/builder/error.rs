//! Build errors for machine, state and transition builders.

use crate::error::ConfigurationError;
use thiserror::Error;

/// Errors that can occur when building machines and transitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("Transition source state not specified. Call .from(state)")]
    MissingSourceState,

    #[error("Transition event not specified. Call .on(event)")]
    MissingEvent,

    #[error("Transition target not specified. Call .to(state), .internal() or .reenter()")]
    MissingTarget,

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
