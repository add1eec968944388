//! Lookup table from (state, event) to candidate transitions.

use super::{Transition, TransitionKind};
use crate::core::{Event, State};
use crate::error::ConfigurationError;
use crate::graph::{StateGraph, StateIdx};
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Transitions grouped by the state they are registered on.
///
/// Lookups return only the transitions registered directly on a state.
/// Walking up the hierarchy is the event processor's job.
pub struct TransitionTable<S: State, E: Event> {
    events: HashSet<E>,
    entries: HashMap<(StateIdx, E), Vec<Transition<S, E>>>,
    count: usize,
    frozen: bool,
}

impl<S: State, E: Event> Default for TransitionTable<S, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State, E: Event> TransitionTable<S, E> {
    pub fn new() -> Self {
        Self {
            events: HashSet::new(),
            entries: HashMap::new(),
            count: 0,
            frozen: false,
        }
    }

    /// Make `event` usable in transitions. Registering twice is a no-op.
    pub fn register_event(&mut self, event: E) -> Result<(), ConfigurationError> {
        self.ensure_mutable()?;
        self.events.insert(event);
        Ok(())
    }

    pub fn is_event_registered(&self, event: &E) -> bool {
        self.events.contains(event)
    }

    /// Append a transition after validating it against `graph`.
    pub fn add_transition(
        &mut self,
        graph: &StateGraph<S>,
        transition: Transition<S, E>,
    ) -> Result<(), ConfigurationError> {
        self.ensure_mutable()?;
        let source = graph.resolve(&transition.source)?;
        if let Some(target) = &transition.target {
            graph.resolve(target)?;
        }
        if !self.events.contains(&transition.event) {
            return Err(ConfigurationError::UnknownEvent {
                event: transition.event.name().to_string(),
            });
        }

        match (transition.kind, &transition.target) {
            (TransitionKind::SelfTransition, target) if target.as_ref() != Some(&transition.source) => {
                return Err(ConfigurationError::InvalidSelfTransition {
                    source_state: transition.source.name().to_string(),
                    target: target_name(target),
                });
            }
            (TransitionKind::Internal, Some(target)) if *target != transition.source => {
                return Err(ConfigurationError::InvalidInternalTransition {
                    source_state: transition.source.name().to_string(),
                    target: target.name().to_string(),
                });
            }
            _ => {}
        }

        trace!(
            source = transition.source.name(),
            event = transition.event.name(),
            target = transition.target.as_ref().map(|t| t.name()),
            kind = ?transition.kind,
            "Transition added"
        );
        self.entries
            .entry((source, transition.event.clone()))
            .or_default()
            .push(transition);
        self.count += 1;
        Ok(())
    }

    /// Transitions registered directly on `state` for `event`, in registration order.
    pub fn candidates_for(
        &self,
        graph: &StateGraph<S>,
        state: &S,
        event: &E,
    ) -> &[Transition<S, E>] {
        graph
            .index_of(state)
            .map_or(&[], |idx| self.candidates_at(idx, event))
    }

    pub(crate) fn candidates_at(&self, state: StateIdx, event: &E) -> &[Transition<S, E>] {
        // HashMap lookups with a tuple key need an owned key.
        self.entries
            .get(&(state, event.clone()))
            .map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }

    fn ensure_mutable(&self) -> Result<(), ConfigurationError> {
        if self.frozen {
            Err(ConfigurationError::AlreadyInitialized)
        } else {
            Ok(())
        }
    }
}

fn target_name<S: State>(target: &Option<S>) -> String {
    target
        .as_ref()
        .map_or_else(|| "<none>".to_string(), |t| t.name().to_string())
}
