//! The public machine facade.

use super::config::MachineConfig;
use super::observer::{Observer, TracingObserver};
use super::processor::{drain, Core, Resolution};
use super::queue::{Binding, EventSender, PendingEvent, Shared};
use crate::checkpoint::Snapshot;
use crate::core::{Args, Callback, Event, Guard, HistoryPolicy, State, Variant};
use crate::dispatcher::{lock, Dispatcher};
use crate::error::{ConfigurationError, HsmError};
use crate::graph::{validate, StateGraph};
use crate::transition::Transition;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use stillwater::validation::Validation;
use tracing::{debug, info};

/// A hierarchical state machine bound to one dispatcher.
///
/// Lifecycle: construct, register the chart, [`initialize`](Self::initialize)
/// with a dispatcher, fire events, drop. The chart is frozen by
/// `initialize`; every later structural change fails with
/// [`ConfigurationError::AlreadyInitialized`].
///
/// # Example
///
/// ```rust
/// use hsmcore::dispatcher::ManualDispatcher;
/// use hsmcore::engine::Machine;
/// use hsmcore::state_enum;
/// use std::sync::Arc;
///
/// state_enum! {
///     enum Lamp { Off, On }
/// }
///
/// let mut machine: Machine<Lamp, &'static str> = Machine::new(Lamp::Off);
/// machine.register_state(Lamp::Off, None).unwrap();
/// machine.register_state(Lamp::On, None).unwrap();
/// machine.register_event("switch").unwrap();
/// machine.register_transition(Lamp::Off, Lamp::On, "switch", None, None).unwrap();
/// machine.register_transition(Lamp::On, Lamp::Off, "switch", None, None).unwrap();
///
/// let dispatcher = Arc::new(ManualDispatcher::new());
/// machine.initialize(dispatcher.clone()).unwrap();
///
/// machine.fire("switch").unwrap();
/// dispatcher.dispatch_pending();
/// assert_eq!(machine.active_state(), Some(Lamp::On));
/// ```
pub struct Machine<S: State, E: Event> {
    shared: Arc<Shared<S, E>>,
    core: Arc<Mutex<Core<S, E>>>,
    initial: S,
    initialized: AtomicBool,
}

impl<S: State, E: Event> Machine<S, E> {
    pub fn new(initial: S) -> Self {
        Self::with_config(initial, MachineConfig::default())
    }

    pub fn with_config(initial: S, config: MachineConfig) -> Self {
        Self {
            shared: Arc::new(Shared::new(config.queue_capacity)),
            core: Arc::new(Mutex::new(Core::new(config.name))),
            initial,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn initial_state(&self) -> &S {
        &self.initial
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Validate the chart, settle the starting configuration and bind to
    /// `dispatcher`.
    ///
    /// The starting configuration is entered silently: no entry or behavior
    /// callback runs for it. Every chart defect is reported at once through
    /// [`HsmError::InvalidChart`].
    pub fn initialize(&mut self, dispatcher: Arc<dyn Dispatcher>) -> Result<(), HsmError> {
        if self.is_initialized() {
            return Err(ConfigurationError::AlreadyInitialized.into());
        }

        let mut core = lock(&self.core);
        if let Validation::Failure(errors) = validate(&core.graph, &self.initial) {
            return Err(HsmError::InvalidChart(errors.iter().cloned().collect()));
        }

        core.establish(&self.initial)?;
        dispatcher.start()?;
        let handler = {
            let core = Arc::downgrade(&self.core);
            let shared = Arc::downgrade(&self.shared);
            dispatcher.register_handler(
                self.shared.id,
                Arc::new(move || {
                    if let (Some(core), Some(shared)) = (core.upgrade(), shared.upgrade()) {
                        drain(&core, &shared);
                    }
                }),
            )?
        };

        core.graph.freeze();
        core.table.freeze();
        self.shared.publish_active(core.active_path());
        info!(
            machine = %core.name,
            states = core.graph.len(),
            transitions = core.table.len(),
            %handler,
            "Machine initialized"
        );
        drop(core);

        self.shared.bind(Binding {
            dispatcher,
            handler,
        });
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    /// Register a state, optionally with its behavior callback.
    pub fn register_state(
        &mut self,
        state: S,
        behavior: Option<Callback>,
    ) -> Result<(), ConfigurationError> {
        self.configure(|core| {
            core.graph.add_state(state.clone())?;
            if let Some(behavior) = behavior {
                core.graph.set_behavior_callback(&state, behavior)?;
            }
            Ok(())
        })
    }

    /// Make `child` a substate of `parent`. Both must be registered.
    pub fn register_substate(&mut self, parent: &S, child: &S) -> Result<(), ConfigurationError> {
        self.configure(|core| core.graph.set_parent(child, parent))
    }

    pub fn register_event(&mut self, event: E) -> Result<(), ConfigurationError> {
        self.configure(|core| core.table.register_event(event))
    }

    /// Register an external transition.
    pub fn register_transition(
        &mut self,
        source: S,
        target: S,
        event: E,
        guard: Option<Guard>,
        action: Option<Callback>,
    ) -> Result<(), ConfigurationError> {
        self.add_transition(with_extras(
            Transition::external(source, target, event),
            guard,
            action,
        ))
    }

    /// Register a transition that only runs `action`.
    pub fn register_internal_transition(
        &mut self,
        state: S,
        event: E,
        guard: Option<Guard>,
        action: Option<Callback>,
    ) -> Result<(), ConfigurationError> {
        self.add_transition(with_extras(Transition::internal(state, event), guard, action))
    }

    /// Register a transition that exits and re-enters `state`.
    pub fn register_self_transition(
        &mut self,
        state: S,
        event: E,
        guard: Option<Guard>,
        action: Option<Callback>,
    ) -> Result<(), ConfigurationError> {
        self.add_transition(with_extras(
            Transition::self_transition(state, event),
            guard,
            action,
        ))
    }

    pub fn add_transition(&mut self, transition: Transition<S, E>) -> Result<(), ConfigurationError> {
        self.configure(|core| {
            let Core { graph, table, .. } = core;
            table.add_transition(graph, transition)
        })
    }

    pub fn set_entry_callback(&mut self, state: &S, callback: Callback) -> Result<(), ConfigurationError> {
        self.configure(|core| core.graph.set_entry_callback(state, callback))
    }

    pub fn set_exit_callback(&mut self, state: &S, callback: Callback) -> Result<(), ConfigurationError> {
        self.configure(|core| core.graph.set_exit_callback(state, callback))
    }

    pub fn set_behavior_callback(
        &mut self,
        state: &S,
        callback: Callback,
    ) -> Result<(), ConfigurationError> {
        self.configure(|core| core.graph.set_behavior_callback(state, callback))
    }

    pub fn set_initial_child(&mut self, state: &S, child: &S) -> Result<(), ConfigurationError> {
        self.configure(|core| core.graph.set_initial_child(state, child))
    }

    pub fn set_history(&mut self, state: &S, policy: HistoryPolicy) -> Result<(), ConfigurationError> {
        self.configure(|core| core.graph.set_history_policy(state, policy))
    }

    /// Install the observer, replacing any earlier one.
    pub fn set_observer(&self, observer: impl Observer<S, E> + 'static) -> Result<(), HsmError> {
        self.with_core(|core| core.observer = Some(Box::new(observer)))
    }

    /// Shorthand for installing a [`TracingObserver`].
    pub fn enable_tracing(&self) -> Result<(), HsmError> {
        self.set_observer(TracingObserver)
    }

    pub fn fire(&self, event: E) -> Result<(), HsmError> {
        self.fire_with(event, Args::new())
    }

    /// Enqueue `event` with arguments. Never waits for processing.
    pub fn fire_with(&self, event: E, args: Args) -> Result<(), HsmError> {
        self.shared.push(PendingEvent { event, args }, false)
    }

    /// Drop every pending event, then enqueue this one.
    pub fn fire_clearing(&self, event: E, args: Args) -> Result<(), HsmError> {
        self.shared.push(PendingEvent { event, args }, true)
    }

    /// Handle for firing from callbacks and other threads.
    pub fn sender(&self) -> EventSender<S, E> {
        EventSender {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Active leaf as of the last fully processed event.
    pub fn active_state(&self) -> Option<S> {
        self.shared.active_leaf()
    }

    /// Active path from the top-level state down to the leaf.
    pub fn active_states(&self) -> Vec<S> {
        self.shared.active()
    }

    pub fn is_state_active(&self, state: &S) -> bool {
        self.shared.active().contains(state)
    }

    /// Whether `event` with `args` would currently resolve to a transition.
    ///
    /// Runs guards but no other callback.
    pub fn is_transition_possible(&self, event: &E, args: &[Variant]) -> Result<bool, HsmError> {
        self.with_core(|core| matches!(core.resolve(event, args), Resolution::Found { .. }))
    }

    pub fn pending_events(&self) -> usize {
        self.shared.pending_len()
    }

    /// Drop every queued event. Returns how many were dropped.
    pub fn clear_pending_events(&self) -> usize {
        let dropped = self.shared.clear();
        debug!(dropped, "Pending events cleared");
        dropped
    }

    /// Capture the active configuration and history records.
    pub fn snapshot(&self) -> Result<Snapshot<S>, HsmError> {
        self.with_core(|core| core.snapshot())
    }

    /// Adopt a snapshot as the starting configuration.
    ///
    /// Only valid before `initialize`; the restored configuration is
    /// entered silently.
    pub fn restore(&mut self, snapshot: &Snapshot<S>) -> Result<(), HsmError> {
        if self.is_initialized() {
            return Err(ConfigurationError::AlreadyInitialized.into());
        }
        lock(&self.core).restore(snapshot)?;
        Ok(())
    }

    /// Read-only view of the chart.
    pub fn inspect_graph<T>(&self, f: impl FnOnce(&StateGraph<S>) -> T) -> Result<T, HsmError> {
        self.with_core(|core| f(&core.graph))
    }

    /// Unbind from the dispatcher. Later `fire` calls fail with
    /// [`HsmError::NotInitialized`]; the chart stays frozen.
    pub fn shutdown(&self) {
        if let Some(binding) = self.shared.unbind() {
            binding.dispatcher.unregister_handler(binding.handler);
            debug!(handler = %binding.handler, "Machine unbound from dispatcher");
        }
    }

    fn configure<T>(
        &mut self,
        f: impl FnOnce(&mut Core<S, E>) -> Result<T, ConfigurationError>,
    ) -> Result<T, ConfigurationError> {
        if self.is_initialized() {
            return Err(ConfigurationError::AlreadyInitialized);
        }
        f(&mut lock(&self.core))
    }

    /// Lock the core, refusing when called from inside one of its callbacks.
    fn with_core<T>(&self, f: impl FnOnce(&mut Core<S, E>) -> T) -> Result<T, HsmError> {
        if self.shared.draining_on_current_thread() {
            return Err(HsmError::Busy);
        }
        Ok(f(&mut lock(&self.core)))
    }
}

fn with_extras<S: State, E: Event>(
    mut transition: Transition<S, E>,
    guard: Option<Guard>,
    action: Option<Callback>,
) -> Transition<S, E> {
    transition.guard = guard;
    transition.action = action;
    transition
}

impl<S: State, E: Event> Drop for Machine<S, E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<S: State, E: Event> fmt::Debug for Machine<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("id", &self.shared.id)
            .field("initial", &self.initial)
            .field("initialized", &self.is_initialized())
            .field("active", &self.shared.active())
            .finish()
    }
}
