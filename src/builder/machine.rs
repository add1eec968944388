//! Builder for constructing whole machines.

use crate::builder::error::BuildError;
use crate::builder::state::StateBuilder;
use crate::builder::transition::TransitionBuilder;
use crate::core::{Event, State};
use crate::engine::{Machine, MachineConfig};
use crate::transition::Transition;

/// Builder for a [`Machine`] and its whole chart.
///
/// States may be listed in any order; parents are linked after every state
/// is registered. Events used by transitions are registered automatically.
pub struct MachineBuilder<S: State, E: Event> {
    initial: Option<S>,
    config: MachineConfig,
    states: Vec<StateBuilder<S>>,
    events: Vec<E>,
    transitions: Vec<Transition<S, E>>,
}

impl<S: State, E: Event> MachineBuilder<S, E> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            initial: None,
            config: MachineConfig::default(),
            states: Vec::new(),
            events: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = Some(capacity);
        self
    }

    /// Add a state without callbacks.
    pub fn simple_state(self, state: S) -> Self {
        self.state(StateBuilder::new(state))
    }

    pub fn state(mut self, state: StateBuilder<S>) -> Self {
        self.states.push(state);
        self
    }

    /// Register an event that no transition uses yet.
    pub fn event(mut self, event: E) -> Self {
        self.events.push(event);
        self
    }

    /// Add a transition using a builder.
    /// Returns an error if the builder fails validation.
    pub fn transition(mut self, builder: TransitionBuilder<S, E>) -> Result<Self, BuildError> {
        let transition = builder.build()?;
        self.transitions.push(transition);
        Ok(self)
    }

    /// Add a pre-built transition.
    pub fn add_transition(mut self, transition: Transition<S, E>) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Add multiple transitions at once.
    pub fn transitions(mut self, transitions: Vec<Transition<S, E>>) -> Self {
        self.transitions.extend(transitions);
        self
    }

    /// Register everything on a fresh machine.
    ///
    /// The machine still has to be initialized with a dispatcher; whole-chart
    /// validation happens there.
    pub fn build(self) -> Result<Machine<S, E>, BuildError> {
        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;
        let mut machine = Machine::with_config(initial, self.config);

        for state in &self.states {
            machine.register_state(state.id.clone(), state.behavior.clone())?;
        }

        for state in self.states {
            if let Some(parent) = &state.parent {
                machine.register_substate(parent, &state.id)?;
            }
            if let Some(child) = &state.initial {
                machine.set_initial_child(&state.id, child)?;
            }
            machine.set_history(&state.id, state.history)?;
            if let Some(on_entry) = state.on_entry {
                machine.set_entry_callback(&state.id, on_entry)?;
            }
            if let Some(on_exit) = state.on_exit {
                machine.set_exit_callback(&state.id, on_exit)?;
            }
        }

        let used = self.transitions.iter().map(|t| t.event.clone());
        for event in self.events.into_iter().chain(used.collect::<Vec<_>>()) {
            machine.register_event(event)?;
        }

        for transition in self.transitions {
            machine.add_transition(transition)?;
        }

        Ok(machine)
    }
}

impl<S: State, E: Event> Default for MachineBuilder<S, E> {
    fn default() -> Self {
        Self::new()
    }
}
