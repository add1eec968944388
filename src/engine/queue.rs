//! Pending event queue and the state shared with firing threads.

use crate::core::{Args, Event, State};
use crate::dispatcher::{lock, Dispatcher, HandlerId};
use crate::error::HsmError;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, ThreadId};
use tracing::trace;
use uuid::Uuid;

/// An event waiting to be processed.
#[derive(Clone, Debug)]
pub struct PendingEvent<E> {
    pub event: E,
    pub args: Args,
}

pub(crate) struct Binding {
    pub(crate) dispatcher: Arc<dyn Dispatcher>,
    pub(crate) handler: HandlerId,
}

/// Everything that firing threads and the dispatcher thread both touch.
pub(crate) struct Shared<S, E> {
    pub(crate) id: Uuid,
    queue: Mutex<VecDeque<PendingEvent<E>>>,
    capacity: Option<usize>,
    binding: Mutex<Option<Binding>>,
    draining: AtomicBool,
    drain_thread: Mutex<Option<ThreadId>>,
    active: RwLock<Vec<S>>,
}

impl<S: State, E: Event> Shared<S, E> {
    pub(crate) fn new(capacity: Option<usize>) -> Self {
        Self {
            id: Uuid::new_v4(),
            queue: Mutex::new(VecDeque::new()),
            capacity,
            binding: Mutex::new(None),
            draining: AtomicBool::new(false),
            drain_thread: Mutex::new(None),
            active: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn bind(&self, binding: Binding) {
        *lock(&self.binding) = Some(binding);
    }

    pub(crate) fn unbind(&self) -> Option<Binding> {
        lock(&self.binding).take()
    }

    pub(crate) fn is_bound(&self) -> bool {
        lock(&self.binding).is_some()
    }

    /// Enqueue and wake the dispatcher. Never waits for processing.
    pub(crate) fn push(&self, pending: PendingEvent<E>, clear_first: bool) -> Result<(), HsmError> {
        let (dispatcher, handler) = {
            let binding = lock(&self.binding);
            let binding = binding.as_ref().ok_or(HsmError::NotInitialized)?;
            (Arc::clone(&binding.dispatcher), binding.handler)
        };

        {
            let mut queue = lock(&self.queue);
            if clear_first {
                queue.clear();
            }
            if let Some(capacity) = self.capacity {
                if queue.len() >= capacity {
                    return Err(HsmError::QueueFull { capacity });
                }
            }
            trace!(event = pending.event.name(), queued = queue.len() + 1, "Event queued");
            queue.push_back(pending);
        }

        dispatcher.emit_event(handler);
        Ok(())
    }

    pub(crate) fn pop(&self) -> Option<PendingEvent<E>> {
        lock(&self.queue).pop_front()
    }

    pub(crate) fn pending_len(&self) -> usize {
        lock(&self.queue).len()
    }

    pub(crate) fn clear(&self) -> usize {
        let mut queue = lock(&self.queue);
        let dropped = queue.len();
        queue.clear();
        dropped
    }

    /// Claim the drain. Returns `false` if a drain is already running.
    pub(crate) fn begin_drain(&self) -> bool {
        if self.draining.swap(true, Ordering::AcqRel) {
            return false;
        }
        *lock(&self.drain_thread) = Some(thread::current().id());
        true
    }

    pub(crate) fn end_drain(&self) {
        *lock(&self.drain_thread) = None;
        self.draining.store(false, Ordering::Release);
    }

    /// Whether the calling thread is inside a drain, i.e. inside a callback.
    pub(crate) fn draining_on_current_thread(&self) -> bool {
        *lock(&self.drain_thread) == Some(thread::current().id())
    }

    pub(crate) fn publish_active(&self, path: Vec<S>) {
        *self.active.write().unwrap_or_else(std::sync::PoisonError::into_inner) = path;
    }

    pub(crate) fn active(&self) -> Vec<S> {
        self.active
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn active_leaf(&self) -> Option<S> {
        self.active
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .last()
            .cloned()
    }
}

/// Cloneable handle for firing events from any thread or callback.
///
/// # Example
///
/// ```rust
/// use hsmcore::engine::Machine;
/// use hsmcore::{state_enum, HsmError};
///
/// state_enum! {
///     enum Lamp { Off, On }
/// }
///
/// let machine: Machine<Lamp, &'static str> = Machine::new(Lamp::Off);
/// let sender = machine.sender();
///
/// // Not bound to a dispatcher yet.
/// assert!(matches!(sender.fire("switch"), Err(HsmError::NotInitialized)));
/// ```
pub struct EventSender<S, E> {
    pub(crate) shared: Arc<Shared<S, E>>,
}

impl<S, E> Clone for EventSender<S, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: State, E: Event> EventSender<S, E> {
    pub fn fire(&self, event: E) -> Result<(), HsmError> {
        self.fire_with(event, Args::new())
    }

    pub fn fire_with(&self, event: E, args: Args) -> Result<(), HsmError> {
        self.shared.push(PendingEvent { event, args }, false)
    }

    /// Drop every pending event, then enqueue this one.
    pub fn fire_clearing(&self, event: E, args: Args) -> Result<(), HsmError> {
        self.shared.push(PendingEvent { event, args }, true)
    }

    pub fn is_bound(&self) -> bool {
        self.shared.is_bound()
    }

    pub fn active_state(&self) -> Option<S> {
        self.shared.active_leaf()
    }
}

impl<S, E> fmt::Debug for EventSender<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSender")
            .field("machine", &self.shared.id)
            .finish()
    }
}
