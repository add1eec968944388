//! Transitions and the table that indexes them.

mod table;

use crate::core::{Callback, Event, Guard, State, Variant};
use std::fmt;

pub use table::TransitionTable;

/// How a resolved transition is executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    /// Exit up to the transition domain, run the action, enter the target.
    #[default]
    External,
    /// Run the action only; no state is exited or entered.
    Internal,
    /// Exit and re-enter the source state itself.
    SelfTransition,
}

/// A candidate transition registered on a source state.
///
/// A transition without a target only runs its action ("ignore"
/// transition), whatever its kind.
pub struct Transition<S: State, E: Event> {
    pub source: S,
    pub event: E,
    pub target: Option<S>,
    pub guard: Option<Guard>,
    pub action: Option<Callback>,
    pub kind: TransitionKind,
}

impl<S: State, E: Event> Transition<S, E> {
    pub fn external(source: S, target: S, event: E) -> Self {
        Self {
            source,
            event,
            target: Some(target),
            guard: None,
            action: None,
            kind: TransitionKind::External,
        }
    }

    pub fn internal(source: S, event: E) -> Self {
        Self {
            source,
            event,
            target: None,
            guard: None,
            action: None,
            kind: TransitionKind::Internal,
        }
    }

    pub fn self_transition(state: S, event: E) -> Self {
        Self {
            target: Some(state.clone()),
            source: state,
            event,
            guard: None,
            action: None,
            kind: TransitionKind::SelfTransition,
        }
    }

    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_action(mut self, action: Callback) -> Self {
        self.action = Some(action);
        self
    }

    /// Check if the guard (if any) accepts these arguments (pure).
    pub fn accepts(&self, args: &[Variant]) -> bool {
        self.guard.as_ref().map_or(true, |g| g.check(args))
    }

    /// Whether executing this transition changes the active configuration.
    pub fn changes_state(&self) -> bool {
        self.target.is_some() && self.kind != TransitionKind::Internal
    }
}

impl<S: State, E: Event> Clone for Transition<S, E> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            event: self.event.clone(),
            target: self.target.clone(),
            guard: self.guard.clone(),
            action: self.action.clone(),
            kind: self.kind,
        }
    }
}

impl<S: State, E: Event> fmt::Debug for Transition<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("source", &self.source)
            .field("event", &self.event)
            .field("target", &self.target)
            .field("guarded", &self.guard.is_some())
            .field("kind", &self.kind)
            .finish()
    }
}
