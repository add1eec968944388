//! Dispatcher pumped explicitly by its owner.
//!
//! Suits cooperative super-loops on targets without threads, and tests that
//! want to decide exactly when queued events get processed.

use super::{lock, wait, Dispatcher, DispatcherError, Handler, HandlerId, HandlerRegistry};
use std::sync::{Condvar, Mutex};
use std::thread::{self, ThreadId};
use tracing::trace;
use uuid::Uuid;

#[derive(Default)]
struct PumpState {
    started: bool,
    stop: bool,
    depth: usize,
    pumping_thread: Option<ThreadId>,
}

/// Runs emitted handlers whenever [`ManualDispatcher::dispatch_pending`] is called.
///
/// The thread calling `dispatch_pending` is the dispatcher thread.
#[derive(Default)]
pub struct ManualDispatcher {
    registry: HandlerRegistry,
    state: Mutex<PumpState>,
    done: Condvar,
}

impl ManualDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run emitted handlers until none are pending. Returns how many ran.
    ///
    /// Handlers emitted while pumping run in the same call. Does nothing
    /// before `start` or after `stop`.
    pub fn dispatch_pending(&self) -> usize {
        {
            let mut state = lock(&self.state);
            if !state.started || state.stop {
                return 0;
            }
            state.depth += 1;
            state.pumping_thread = Some(thread::current().id());
        }

        let mut ran = 0;
        loop {
            let handlers = self.registry.take_pending();
            if handlers.is_empty() {
                break;
            }
            for handler in handlers {
                if lock(&self.state).stop {
                    break;
                }
                handler();
                ran += 1;
            }
            if lock(&self.state).stop {
                break;
            }
        }
        trace!(ran, "Manual dispatch finished");

        let mut state = lock(&self.state);
        state.depth -= 1;
        if state.depth == 0 {
            state.pumping_thread = None;
            self.done.notify_all();
        }
        ran
    }

    pub fn has_pending(&self) -> bool {
        self.registry.has_pending()
    }

    pub fn handler_count(&self) -> usize {
        self.registry.len()
    }
}

impl Dispatcher for ManualDispatcher {
    fn start(&self) -> Result<(), DispatcherError> {
        let mut state = lock(&self.state);
        if state.stop {
            return Err(DispatcherError::Stopped);
        }
        state.started = true;
        Ok(())
    }

    fn register_handler(&self, owner: Uuid, handler: Handler) -> Result<HandlerId, DispatcherError> {
        self.registry.register(owner, handler)
    }

    fn unregister_handler(&self, id: HandlerId) {
        self.registry.unregister(id);
    }

    fn emit_event(&self, id: HandlerId) {
        self.registry.mark_pending(id);
    }

    fn stop(&self) {
        let mut state = lock(&self.state);
        state.stop = true;
        if state.pumping_thread == Some(thread::current().id()) {
            return;
        }
        while state.depth > 0 {
            state = wait(&self.done, state);
        }
    }
}

impl Drop for ManualDispatcher {
    fn drop(&mut self) {
        self.stop();
        self.registry.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter_handler(calls: &Arc<AtomicUsize>) -> Handler {
        let calls = Arc::clone(calls);
        Arc::new(move || {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn nothing_runs_before_start() {
        let dispatcher = ManualDispatcher::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let id = dispatcher
            .register_handler(Uuid::new_v4(), counter_handler(&calls))
            .unwrap();

        dispatcher.emit_event(id);
        assert_eq!(dispatcher.dispatch_pending(), 0);

        dispatcher.start().unwrap();
        assert_eq!(dispatcher.dispatch_pending(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn repeated_emits_coalesce() {
        let dispatcher = ManualDispatcher::new();
        dispatcher.start().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let id = dispatcher
            .register_handler(Uuid::new_v4(), counter_handler(&calls))
            .unwrap();

        dispatcher.emit_event(id);
        dispatcher.emit_event(id);
        dispatcher.emit_event(id);

        assert_eq!(dispatcher.dispatch_pending(), 1);
        assert!(!dispatcher.has_pending());
    }

    #[test]
    fn handlers_emitted_while_pumping_run_in_same_call() {
        let dispatcher = Arc::new(ManualDispatcher::new());
        dispatcher.start().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<HandlerId>>> = Arc::new(Mutex::new(None));

        let id = {
            let weak = Arc::downgrade(&dispatcher);
            let calls = Arc::clone(&calls);
            let slot = Arc::clone(&slot);
            dispatcher
                .register_handler(
                    Uuid::new_v4(),
                    Arc::new(move || {
                        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                            if let (Some(d), Some(id)) = (weak.upgrade(), *lock(&slot)) {
                                d.emit_event(id);
                            }
                        }
                    }),
                )
                .unwrap()
        };
        *lock(&slot) = Some(id);

        dispatcher.emit_event(id);
        assert_eq!(dispatcher.dispatch_pending(), 2);
    }

    #[test]
    fn stopped_dispatcher_refuses_work() {
        let dispatcher = ManualDispatcher::new();
        dispatcher.start().unwrap();
        dispatcher.stop();

        assert_eq!(dispatcher.start(), Err(DispatcherError::Stopped));
        assert_eq!(dispatcher.dispatch_pending(), 0);
    }
}
