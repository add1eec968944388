//! Builder for constructing transitions.

use crate::builder::error::BuildError;
use crate::core::{Callback, CallbackResult, Event, Guard, State, Variant};
use crate::transition::{Transition, TransitionKind};
use std::sync::Arc;

/// Builder for constructing transitions with a fluent API.
///
/// # Example
///
/// ```
/// use hsmcore::builder::TransitionBuilder;
/// use hsmcore::transition::TransitionKind;
/// use hsmcore::state_enum;
///
/// state_enum! {
///     enum Valve { Closed, Open }
/// }
///
/// let transition = TransitionBuilder::new()
///     .from(Valve::Closed)
///     .on("open")
///     .to(Valve::Open)
///     .when(|args| args.is_empty())
///     .build()
///     .unwrap();
///
/// assert_eq!(transition.kind, TransitionKind::External);
/// assert_eq!(transition.target, Some(Valve::Open));
/// ```
pub struct TransitionBuilder<S: State, E: Event> {
    source: Option<S>,
    event: Option<E>,
    target: Option<S>,
    kind: Option<TransitionKind>,
    guard: Option<Guard>,
    action: Option<Callback>,
}

impl<S: State, E: Event> TransitionBuilder<S, E> {
    pub fn new() -> Self {
        Self {
            source: None,
            event: None,
            target: None,
            kind: None,
            guard: None,
            action: None,
        }
    }

    /// Set the source state (required).
    pub fn from(mut self, state: S) -> Self {
        self.source = Some(state);
        self
    }

    /// Set the triggering event (required).
    pub fn on(mut self, event: E) -> Self {
        self.event = Some(event);
        self
    }

    /// Set the target state of an external transition.
    pub fn to(mut self, state: S) -> Self {
        self.target = Some(state);
        self.kind = Some(TransitionKind::External);
        self
    }

    /// Make this an internal transition: action only, no exit or entry.
    pub fn internal(mut self) -> Self {
        self.target = None;
        self.kind = Some(TransitionKind::Internal);
        self
    }

    /// Make this a self transition: exit and re-enter the source.
    pub fn reenter(mut self) -> Self {
        self.target = None;
        self.kind = Some(TransitionKind::SelfTransition);
        self
    }

    /// Add a guard (optional).
    pub fn guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a guard using a closure (optional).
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&[Variant]) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Set the action run between exits and entries (optional).
    pub fn action<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Variant]) -> CallbackResult + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(f));
        self
    }

    /// Build the transition.
    pub fn build(self) -> Result<Transition<S, E>, BuildError> {
        let source = self.source.ok_or(BuildError::MissingSourceState)?;
        let event = self.event.ok_or(BuildError::MissingEvent)?;
        let kind = self.kind.ok_or(BuildError::MissingTarget)?;

        let target = match kind {
            TransitionKind::External => self.target,
            TransitionKind::Internal => None,
            TransitionKind::SelfTransition => Some(source.clone()),
        };

        Ok(Transition {
            source,
            event,
            target,
            guard: self.guard,
            action: self.action,
            kind,
        })
    }
}

impl<S: State, E: Event> Default for TransitionBuilder<S, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::state_enum! {
        enum TestState {
            Idle,
            Busy,
        }
    }

    type Builder = TransitionBuilder<TestState, &'static str>;

    #[test]
    fn builder_requires_source() {
        let result = Builder::new().on("go").to(TestState::Busy).build();
        assert!(matches!(result, Err(BuildError::MissingSourceState)));
    }

    #[test]
    fn builder_requires_event() {
        let result = Builder::new().from(TestState::Idle).to(TestState::Busy).build();
        assert!(matches!(result, Err(BuildError::MissingEvent)));
    }

    #[test]
    fn builder_requires_target_or_kind() {
        let result = Builder::new().from(TestState::Idle).on("go").build();
        assert!(matches!(result, Err(BuildError::MissingTarget)));
    }

    #[test]
    fn reenter_targets_source() {
        let transition = Builder::new()
            .from(TestState::Busy)
            .on("retry")
            .reenter()
            .build()
            .unwrap();

        assert_eq!(transition.kind, TransitionKind::SelfTransition);
        assert_eq!(transition.target, Some(TestState::Busy));
    }

    #[test]
    fn internal_discards_earlier_target() {
        let transition = Builder::new()
            .from(TestState::Idle)
            .on("tick")
            .to(TestState::Busy)
            .internal()
            .action(|_| Ok(()))
            .build()
            .unwrap();

        assert_eq!(transition.kind, TransitionKind::Internal);
        assert_eq!(transition.target, None);
        assert!(transition.action.is_some());
        assert!(!transition.changes_state());
    }

    #[test]
    fn when_installs_guard() {
        let transition = Builder::new()
            .from(TestState::Idle)
            .on("go")
            .to(TestState::Busy)
            .when(|args| args.len() == 1)
            .build()
            .unwrap();

        assert!(transition.accepts(&[Variant::Unit]));
        assert!(!transition.accepts(&[]));
    }
}
