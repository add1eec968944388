//! Dispatcher contract between the engine and its host platform.
//!
//! A dispatcher owns the thread on which a machine processes events. The
//! engine registers one wake-up handler per machine; firing an event asks
//! the dispatcher to run that handler "soon" on its own thread, and the
//! handler drains the machine's queue. Dispatchers never touch the queue
//! themselves.
//!
//! Two platform-neutral backends ship with the crate:
//! - [`ThreadDispatcher`]: a dedicated worker thread
//! - [`ManualDispatcher`]: pumped explicitly by the caller, for super-loops and tests
//!
//! Bindings for other event loops implement [`Dispatcher`] the same way.

mod manual;
mod registry;
mod thread;

use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub use manual::ManualDispatcher;
pub use registry::HandlerRegistry;
pub use thread::ThreadDispatcher;

/// Identifier of a handler registered with a dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler#{}", self.0)
    }
}

/// Zero-argument wake-up callback bound to a dispatcher.
pub type Handler = Arc<dyn Fn() + Send + Sync>;

/// Errors surfaced by dispatchers to whoever starts or binds them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatcherError {
    #[error("Owner {owner} already has a handler registered")]
    AlreadyRegistered { owner: Uuid },

    #[error("Failed to create dispatcher resources: {0}")]
    Spawn(String),

    #[error("Dispatcher has been stopped")]
    Stopped,
}

/// Contract every dispatcher backend fulfils.
///
/// All methods may be called from any thread. Handlers are only ever
/// invoked on the dispatcher's own thread.
pub trait Dispatcher: Send + Sync {
    /// Start dispatching. Calling it again on a running dispatcher succeeds.
    fn start(&self) -> Result<(), DispatcherError>;

    /// Bind `handler` on behalf of `owner`.
    ///
    /// Fails with [`DispatcherError::AlreadyRegistered`] if `owner` already
    /// holds a binding.
    fn register_handler(&self, owner: Uuid, handler: Handler) -> Result<HandlerId, DispatcherError>;

    /// Remove a binding. Unknown ids are ignored.
    fn unregister_handler(&self, id: HandlerId);

    /// Request that the handler bound to `id` runs on the dispatcher thread.
    ///
    /// Never blocks on handler execution.
    fn emit_event(&self, id: HandlerId);

    /// Stop dispatching.
    ///
    /// When a dispatch iteration is in flight on another thread, this waits
    /// for it to finish before releasing anything the iteration may use.
    fn stop(&self);
}

pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

pub(crate) fn wait<'a, T>(
    condvar: &std::sync::Condvar,
    guard: std::sync::MutexGuard<'a, T>,
) -> std::sync::MutexGuard<'a, T> {
    condvar
        .wait(guard)
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_id_displays_raw_value() {
        assert_eq!(HandlerId::new(7).to_string(), "handler#7");
        assert_eq!(HandlerId::new(7).as_u64(), 7);
    }

    #[test]
    fn already_registered_names_owner() {
        let owner = Uuid::nil();
        let err = DispatcherError::AlreadyRegistered { owner };
        assert!(err.to_string().contains(&owner.to_string()));
    }
}
