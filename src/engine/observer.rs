//! Diagnostic hooks into event processing.
//!
//! Observers are called synchronously on the dispatcher thread. They see
//! what the engine did; they cannot change it.

use crate::core::{Args, CallbackError, Event, State};
use crate::transition::TransitionKind;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// A committed change of the active leaf.
#[derive(Clone, Debug)]
pub struct StateChange<S, E> {
    /// Leaf active before the event.
    pub from: Option<S>,
    /// Leaf active after the event.
    pub to: S,
    pub event: E,
    pub kind: TransitionKind,
    pub timestamp: DateTime<Utc>,
}

/// Why an event was dropped without effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscardReason {
    /// No active state or ancestor has a transition for the event.
    NoMatchingTransition,
    /// Candidates existed but every guard rejected the arguments.
    GuardRejectedAll,
}

#[derive(Clone, Debug)]
pub struct DiscardedEvent<S, E> {
    pub event: E,
    pub args: Args,
    pub active: Option<S>,
    pub reason: DiscardReason,
    pub timestamp: DateTime<Utc>,
}

/// Callback slot that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackPhase {
    Exit,
    Action,
    Entry,
    Behavior,
}

/// A user callback failed and processing of `event` stopped.
#[derive(Clone, Debug)]
pub struct CallbackFailure<S, E> {
    pub event: E,
    pub phase: CallbackPhase,
    /// State owning the callback; `None` for transition actions.
    pub state: Option<S>,
    pub error: CallbackError,
    /// Leaf reached by the last successful step.
    pub active: Option<S>,
    pub timestamp: DateTime<Utc>,
}

/// Receives processing notifications. Every method defaults to a no-op.
pub trait Observer<S: State, E: Event>: Send {
    fn on_state_changed(&mut self, _change: &StateChange<S, E>) {}

    fn on_event_discarded(&mut self, _discarded: &DiscardedEvent<S, E>) {}

    fn on_callback_failed(&mut self, _failure: &CallbackFailure<S, E>) {}
}

/// Observer that forwards every notification to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl<S: State, E: Event> Observer<S, E> for TracingObserver {
    fn on_state_changed(&mut self, change: &StateChange<S, E>) {
        info!(
            from = change.from.as_ref().map(|s| s.name()),
            to = change.to.name(),
            event = change.event.name(),
            kind = ?change.kind,
            "State changed"
        );
    }

    fn on_event_discarded(&mut self, discarded: &DiscardedEvent<S, E>) {
        debug!(
            event = discarded.event.name(),
            active = discarded.active.as_ref().map(|s| s.name()),
            reason = ?discarded.reason,
            "Event discarded"
        );
    }

    fn on_callback_failed(&mut self, failure: &CallbackFailure<S, E>) {
        warn!(
            event = failure.event.name(),
            phase = ?failure.phase,
            state = failure.state.as_ref().map(|s| s.name()),
            error = %failure.error,
            "Callback failed"
        );
    }
}
