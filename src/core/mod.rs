//! Core vocabulary of the engine.
//!
//! This module contains the building blocks every other module speaks in:
//! - State and event identifiers via the `State` and `Event` traits
//! - Event argument vectors (`Variant`, `Args`)
//! - Guard predicates and user callbacks
//! - History policies and records
//!
//! Nothing in here touches threads or dispatchers.

mod args;
mod callback;
mod event;
mod guard;
mod history;
mod state;

pub use args::{Args, Variant};
pub use callback::{callback, Callback, CallbackError, CallbackResult};
pub use event::Event;
pub use guard::Guard;
pub use history::{HistoryPolicy, HistoryRecords};
pub use state::State;
