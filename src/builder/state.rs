//! Builder for declaring a state together with its callbacks.

use crate::core::{Callback, CallbackResult, HistoryPolicy, State, Variant};
use std::sync::Arc;

/// Everything the chart needs to know about one state.
pub struct StateBuilder<S: State> {
    pub(crate) id: S,
    pub(crate) parent: Option<S>,
    pub(crate) initial: Option<S>,
    pub(crate) history: HistoryPolicy,
    pub(crate) on_entry: Option<Callback>,
    pub(crate) on_exit: Option<Callback>,
    pub(crate) behavior: Option<Callback>,
}

impl<S: State> StateBuilder<S> {
    pub fn new(id: S) -> Self {
        Self {
            id,
            parent: None,
            initial: None,
            history: HistoryPolicy::None,
            on_entry: None,
            on_exit: None,
            behavior: None,
        }
    }

    /// Nest this state under `parent`.
    pub fn parent(mut self, parent: S) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Child entered when this state is entered without history.
    pub fn initial(mut self, child: S) -> Self {
        self.initial = Some(child);
        self
    }

    pub fn history(mut self, policy: HistoryPolicy) -> Self {
        self.history = policy;
        self
    }

    pub fn on_entry<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Variant]) -> CallbackResult + Send + Sync + 'static,
    {
        self.on_entry = Some(Arc::new(f));
        self
    }

    pub fn on_exit<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Variant]) -> CallbackResult + Send + Sync + 'static,
    {
        self.on_exit = Some(Arc::new(f));
        self
    }

    /// Callback run last, once the state has become the active leaf.
    pub fn behavior<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Variant]) -> CallbackResult + Send + Sync + 'static,
    {
        self.behavior = Some(Arc::new(f));
        self
    }

    pub fn id(&self) -> &S {
        &self.id
    }
}
