//! Dispatcher backed by a dedicated worker thread.

use super::{lock, wait, Dispatcher, DispatcherError, Handler, HandlerId, HandlerRegistry};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, trace, warn};
use uuid::Uuid;

#[derive(Default)]
struct LoopState {
    signalled: bool,
    stop: bool,
    iteration_running: bool,
}

#[derive(Default)]
struct LoopShared {
    registry: HandlerRegistry,
    state: Mutex<LoopState>,
    wake: Condvar,
    done: Condvar,
}

/// Runs handlers on a worker thread it owns.
///
/// # Example
///
/// ```rust
/// use hsmcore::dispatcher::{Dispatcher, ThreadDispatcher};
/// use std::sync::mpsc;
/// use std::sync::Arc;
/// use uuid::Uuid;
///
/// let dispatcher = ThreadDispatcher::new();
/// dispatcher.start().unwrap();
///
/// let (tx, rx) = mpsc::channel();
/// let tx = std::sync::Mutex::new(tx);
/// let id = dispatcher
///     .register_handler(Uuid::new_v4(), Arc::new(move || {
///         tx.lock().unwrap().send(()).unwrap();
///     }))
///     .unwrap();
///
/// dispatcher.emit_event(id);
/// rx.recv().unwrap();
/// dispatcher.stop();
/// ```
pub struct ThreadDispatcher {
    name: String,
    shared: Arc<LoopShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: Mutex<Option<ThreadId>>,
}

impl Default for ThreadDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadDispatcher {
    pub fn new() -> Self {
        Self::with_name("hsm-dispatcher")
    }

    /// Create a dispatcher whose worker thread carries `name`.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared: Arc::new(LoopShared::default()),
            worker: Mutex::new(None),
            worker_id: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.worker).is_some() && !lock(&self.shared.state).stop
    }

    fn on_worker_thread(&self) -> bool {
        *lock(&self.worker_id) == Some(thread::current().id())
    }
}

fn run_loop(shared: Arc<LoopShared>) {
    debug!("Dispatcher loop started");
    loop {
        {
            let mut state = lock(&shared.state);
            while !state.signalled && !state.stop {
                state = wait(&shared.wake, state);
            }
            if state.stop {
                break;
            }
            state.signalled = false;
            state.iteration_running = true;
        }

        let handlers = shared.registry.take_pending();
        trace!(count = handlers.len(), "Dispatching handlers");
        for handler in handlers {
            if lock(&shared.state).stop {
                break;
            }
            handler();
        }

        lock(&shared.state).iteration_running = false;
        shared.done.notify_all();
    }
    debug!("Dispatcher loop stopped");
}

impl Dispatcher for ThreadDispatcher {
    fn start(&self) -> Result<(), DispatcherError> {
        let mut worker = lock(&self.worker);
        if lock(&self.shared.state).stop {
            return Err(DispatcherError::Stopped);
        }
        if worker.is_some() {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || run_loop(shared))
            .map_err(|e| DispatcherError::Spawn(e.to_string()))?;
        *lock(&self.worker_id) = Some(handle.thread().id());
        *worker = Some(handle);
        debug!(name = %self.name, "Dispatcher started");
        Ok(())
    }

    fn register_handler(&self, owner: Uuid, handler: Handler) -> Result<HandlerId, DispatcherError> {
        self.shared.registry.register(owner, handler)
    }

    fn unregister_handler(&self, id: HandlerId) {
        self.shared.registry.unregister(id);
    }

    fn emit_event(&self, id: HandlerId) {
        if !self.shared.registry.mark_pending(id) {
            return;
        }
        let mut state = lock(&self.shared.state);
        if state.stop {
            return;
        }
        state.signalled = true;
        self.shared.wake.notify_one();
    }

    fn stop(&self) {
        {
            let mut state = lock(&self.shared.state);
            state.stop = true;
            self.shared.wake.notify_all();
        }

        let on_worker = self.on_worker_thread();
        if !on_worker {
            // The in-flight iteration may still be using handlers; wait for
            // it before anything gets released.
            let mut state = lock(&self.shared.state);
            while state.iteration_running {
                state = wait(&self.shared.done, state);
            }
        }

        let handle = lock(&self.worker).take();
        if let Some(handle) = handle {
            if on_worker {
                debug!("Dispatcher stopped from its own thread; worker detached");
            } else if handle.join().is_err() {
                warn!(name = %self.name, "Dispatcher worker panicked");
            }
        }
    }
}

impl Drop for ThreadDispatcher {
    fn drop(&mut self) {
        self.stop();
        self.shared.registry.clear();
    }
}
