//! The event processing engine.
//!
//! A [`Machine`] owns the chart and its active configuration. Events are
//! fired from any thread into a FIFO queue; the bound dispatcher later runs
//! the machine's drain on its own thread, which processes queued events one
//! at a time, each to completion.
//!
//! Firing from inside a callback only enqueues. The running drain picks the
//! new event up after the current one has finished.

mod config;
mod machine;
mod observer;
mod processor;
mod queue;

pub use config::MachineConfig;
pub use machine::Machine;
pub use observer::{
    CallbackFailure, CallbackPhase, DiscardReason, DiscardedEvent, Observer, StateChange,
    TracingObserver,
};
pub use queue::{EventSender, PendingEvent};
