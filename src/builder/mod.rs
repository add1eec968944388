//! Builder API for ergonomic machine construction.
//!
//! This module provides fluent builders and macros for declaring a chart
//! with minimal boilerplate. Builders only collect declarations; the
//! registration rules of [`Machine`](crate::engine::Machine) still apply
//! when [`MachineBuilder::build`] runs.

pub mod error;
pub mod machine;
pub mod macros;
pub mod state;
pub mod transition;

pub use error::BuildError;
pub use machine::MachineBuilder;
pub use state::StateBuilder;
pub use transition::TransitionBuilder;

use crate::core::{Event, Guard, State, Variant};
use crate::transition::Transition;

/// Create an unguarded external transition.
///
/// # Example
///
/// ```
/// use hsmcore::builder::simple_transition;
/// use hsmcore::state_enum;
///
/// state_enum! {
///     enum MyState {
///         Start,
///         End,
///     }
/// }
///
/// let transition = simple_transition(MyState::Start, MyState::End, "finish");
/// assert_eq!(transition.target, Some(MyState::End));
/// ```
pub fn simple_transition<S: State, E: Event>(from: S, to: S, event: E) -> Transition<S, E> {
    Transition::external(from, to, event)
}

/// Create an external transition with a guard predicate.
///
/// # Example
///
/// ```
/// use hsmcore::builder::guarded_transition;
/// use hsmcore::core::Variant;
/// use hsmcore::state_enum;
///
/// state_enum! {
///     enum MyState {
///         Start,
///         Middle,
///     }
/// }
///
/// let transition = guarded_transition(MyState::Start, MyState::Middle, "step", |args| {
///     args.first().and_then(Variant::as_i64).unwrap_or(0) > 0
/// });
/// assert!(transition.accepts(&[Variant::Int(1)]));
/// ```
pub fn guarded_transition<S, E, F>(from: S, to: S, event: E, guard: F) -> Transition<S, E>
where
    S: State,
    E: Event,
    F: Fn(&[Variant]) -> bool + Send + Sync + 'static,
{
    Transition::external(from, to, event).with_guard(Guard::new(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::state_enum! {
        enum TestState {
            Start,
            Middle,
        }
    }

    #[test]
    fn simple_transition_builds() {
        let transition = simple_transition(TestState::Start, TestState::Middle, "go");

        assert_eq!(transition.source, TestState::Start);
        assert_eq!(transition.target, Some(TestState::Middle));
        assert!(transition.accepts(&[]));
    }

    #[test]
    fn guarded_transition_respects_guard() {
        let transition = guarded_transition(TestState::Start, TestState::Middle, "go", |args| {
            args.iter().all(|a| a.as_bool() == Some(true))
        });

        assert!(transition.accepts(&[Variant::Bool(true)]));
        assert!(!transition.accepts(&[Variant::Bool(false)]));
    }
}
