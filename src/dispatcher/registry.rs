//! Handler bookkeeping shared by dispatcher backends.

use super::{lock, DispatcherError, Handler, HandlerId};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tracing::{debug, trace};
use uuid::Uuid;

struct Binding {
    owner: Uuid,
    handler: Handler,
}

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    bindings: HashMap<HandlerId, Binding>,
    pending: VecDeque<HandlerId>,
}

/// Registered handlers plus the ids emitted since the last dispatch.
///
/// An id is queued at most once until it is taken, so a burst of emits
/// results in a single handler call that drains everything.
#[derive(Default)]
pub struct HandlerRegistry {
    state: Mutex<RegistryState>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, owner: Uuid, handler: Handler) -> Result<HandlerId, DispatcherError> {
        let mut state = lock(&self.state);
        if state.bindings.values().any(|b| b.owner == owner) {
            return Err(DispatcherError::AlreadyRegistered { owner });
        }

        state.next_id += 1;
        let id = HandlerId::new(state.next_id);
        state.bindings.insert(id, Binding { owner, handler });
        debug!(%id, %owner, "Handler registered");
        Ok(id)
    }

    pub fn unregister(&self, id: HandlerId) {
        let mut state = lock(&self.state);
        if state.bindings.remove(&id).is_some() {
            state.pending.retain(|p| *p != id);
            debug!(%id, "Handler unregistered");
        }
    }

    /// Queue `id` for the next dispatch. Returns `false` for unknown ids.
    pub fn mark_pending(&self, id: HandlerId) -> bool {
        let mut state = lock(&self.state);
        if !state.bindings.contains_key(&id) {
            trace!(%id, "Emit for unknown handler ignored");
            return false;
        }
        if !state.pending.contains(&id) {
            state.pending.push_back(id);
        }
        true
    }

    /// Take every pending handler, in emission order.
    ///
    /// Handlers are cloned out so they run without the registry locked.
    pub fn take_pending(&self) -> Vec<Handler> {
        let mut state = lock(&self.state);
        let ids: Vec<HandlerId> = state.pending.drain(..).collect();
        ids.iter()
            .filter_map(|id| state.bindings.get(id).map(|b| b.handler.clone()))
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        !lock(&self.state).pending.is_empty()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every binding and pending emission.
    pub fn clear(&self) {
        let mut state = lock(&self.state);
        state.pending.clear();
        // Handlers may own the last reference to arbitrary user state; drop
        // them after releasing the lock.
        let bindings = std::mem::take(&mut state.bindings);
        drop(state);
        drop(bindings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_handler(counter: &Arc<AtomicUsize>) -> Handler {
        let counter = Arc::clone(counter);
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn same_owner_cannot_register_twice() {
        let registry = HandlerRegistry::new();
        let owner = Uuid::new_v4();
        let counter = Arc::new(AtomicUsize::new(0));

        registry.register(owner, counting_handler(&counter)).unwrap();
        assert_eq!(
            registry.register(owner, counting_handler(&counter)),
            Err(DispatcherError::AlreadyRegistered { owner })
        );
        assert!(registry
            .register(Uuid::new_v4(), counting_handler(&counter))
            .is_ok());
    }

    #[test]
    fn pending_ids_are_deduplicated() {
        let registry = HandlerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let id = registry
            .register(Uuid::new_v4(), counting_handler(&counter))
            .unwrap();

        assert!(registry.mark_pending(id));
        assert!(registry.mark_pending(id));

        let handlers = registry.take_pending();
        assert_eq!(handlers.len(), 1);
        handlers.iter().for_each(|h| h());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!registry.has_pending());
    }

    #[test]
    fn unregister_is_idempotent_and_drops_pending() {
        let registry = HandlerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let id = registry
            .register(Uuid::new_v4(), counting_handler(&counter))
            .unwrap();
        registry.mark_pending(id);

        registry.unregister(id);
        registry.unregister(id);

        assert!(registry.is_empty());
        assert!(!registry.mark_pending(id));
        assert!(registry.take_pending().is_empty());
    }
}
