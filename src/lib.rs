//! hsmcore: a hierarchical state machine engine.
//!
//! States nest into a tree, transitions are looked up from the active leaf
//! towards the top of the tree, and every event runs to completion before
//! the next one is looked at. Event delivery is decoupled from threading:
//! a machine is bound to a [`Dispatcher`](dispatcher::Dispatcher) that owns
//! the thread on which all state changes and callbacks happen, while events
//! may be fired from anywhere.
//!
//! # Core Concepts
//!
//! - **State graph**: the tree of states with their entry, exit and behavior callbacks
//! - **Transitions**: external, internal and self transitions with guards and actions
//! - **History**: shallow or deep re-entry of composite states
//! - **Dispatchers**: the platform seam that pumps a machine's event queue
//!
//! # Example
//!
//! ```rust
//! use hsmcore::builder::{MachineBuilder, StateBuilder, TransitionBuilder};
//! use hsmcore::core::{CallbackResult, Variant};
//! use hsmcore::dispatcher::ManualDispatcher;
//! use hsmcore::{event_enum, state_enum};
//! use std::sync::{Arc, Mutex};
//!
//! state_enum! {
//!     enum Switch { Off, On }
//! }
//!
//! event_enum! {
//!     enum Toggle { Flip }
//! }
//!
//! let entered = Arc::new(Mutex::new(Vec::new()));
//! let log = |name: &'static str| {
//!     let entered = Arc::clone(&entered);
//!     move |_: &[Variant]| -> CallbackResult {
//!         entered.lock().unwrap().push(name);
//!         Ok(())
//!     }
//! };
//!
//! let mut machine = MachineBuilder::new()
//!     .initial(Switch::Off)
//!     .state(StateBuilder::new(Switch::Off).on_entry(log("Off")))
//!     .state(StateBuilder::new(Switch::On).on_entry(log("On")))
//!     .transition(TransitionBuilder::new().from(Switch::Off).on(Toggle::Flip).to(Switch::On))?
//!     .transition(TransitionBuilder::new().from(Switch::On).on(Toggle::Flip).to(Switch::Off))?
//!     .build()?;
//!
//! let dispatcher = Arc::new(ManualDispatcher::new());
//! machine.initialize(dispatcher.clone())?;
//!
//! machine.fire(Toggle::Flip)?;
//! machine.fire(Toggle::Flip)?;
//! dispatcher.dispatch_pending();
//!
//! assert_eq!(*entered.lock().unwrap(), vec!["On", "Off"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod checkpoint;
pub mod core;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod graph;
pub mod logging;
pub mod transition;

// Re-export commonly used types
pub use crate::core::{Args, Callback, CallbackError, Event, Guard, HistoryPolicy, State, Variant};
pub use dispatcher::{Dispatcher, ManualDispatcher, ThreadDispatcher};
pub use engine::{EventSender, Machine, MachineConfig, Observer};
pub use error::{ConfigurationError, HsmError};
