//! The state graph: a flat arena of state records.
//!
//! States are stored densely and addressed by [`StateIdx`]; parent and
//! child relations are indices into the same arena. Top-level states have
//! no parent and hang off the implicit machine root.
//!
//! The graph is mutable while the machine is being set up and frozen once
//! the machine is initialized.

mod validation;

use crate::core::{Callback, HistoryPolicy, State};
use crate::error::ConfigurationError;
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

pub use validation::validate;

/// Index of a state record in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateIdx(usize);

impl StateIdx {
    pub fn index(self) -> usize {
        self.0
    }
}

pub(crate) struct StateNode<S> {
    pub(crate) id: S,
    pub(crate) parent: Option<StateIdx>,
    pub(crate) children: Vec<StateIdx>,
    pub(crate) initial: Option<StateIdx>,
    pub(crate) history: HistoryPolicy,
    pub(crate) on_entry: Option<Callback>,
    pub(crate) on_exit: Option<Callback>,
    pub(crate) behavior: Option<Callback>,
}

impl<S> StateNode<S> {
    fn new(id: S) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            initial: None,
            history: HistoryPolicy::None,
            on_entry: None,
            on_exit: None,
            behavior: None,
        }
    }
}

/// Tree of registered states.
pub struct StateGraph<S: State> {
    nodes: Vec<StateNode<S>>,
    index: HashMap<S, StateIdx>,
    frozen: bool,
}

impl<S: State> Default for StateGraph<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StateGraph<S> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            frozen: false,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, state: &S) -> bool {
        self.index.contains_key(state)
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Reject all further structural changes.
    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Register a new top-level state.
    pub fn add_state(&mut self, state: S) -> Result<StateIdx, ConfigurationError> {
        self.ensure_mutable()?;
        if self.index.contains_key(&state) {
            return Err(ConfigurationError::DuplicateState {
                state: state.name().to_string(),
            });
        }

        let idx = StateIdx(self.nodes.len());
        trace!(state = state.name(), "State added");
        self.index.insert(state.clone(), idx);
        self.nodes.push(StateNode::new(state));
        Ok(idx)
    }

    /// Make `parent` the parent of `child`, moving `child` if it already had one.
    ///
    /// Fails without touching the graph if the move would create a cycle.
    pub fn set_parent(&mut self, child: &S, parent: &S) -> Result<(), ConfigurationError> {
        self.ensure_mutable()?;
        let child_idx = self.resolve(child)?;
        let parent_idx = self.resolve(parent)?;

        if self.is_ancestor_or_self(child_idx, parent_idx) {
            return Err(ConfigurationError::CycleDetected {
                child: child.name().to_string(),
                parent: parent.name().to_string(),
            });
        }

        if let Some(old) = self.nodes[child_idx.0].parent {
            self.nodes[old.0].children.retain(|c| *c != child_idx);
        }
        self.nodes[child_idx.0].parent = Some(parent_idx);
        self.nodes[parent_idx.0].children.push(child_idx);
        trace!(child = child.name(), parent = parent.name(), "Parent set");
        Ok(())
    }

    pub fn set_initial_child(&mut self, state: &S, child: &S) -> Result<(), ConfigurationError> {
        self.ensure_mutable()?;
        let state_idx = self.resolve(state)?;
        let child_idx = self.resolve(child)?;
        self.nodes[state_idx.0].initial = Some(child_idx);
        Ok(())
    }

    pub fn set_history_policy(
        &mut self,
        state: &S,
        policy: HistoryPolicy,
    ) -> Result<(), ConfigurationError> {
        self.node_mut(state)?.history = policy;
        Ok(())
    }

    pub fn set_entry_callback(
        &mut self,
        state: &S,
        callback: Callback,
    ) -> Result<(), ConfigurationError> {
        self.node_mut(state)?.on_entry = Some(callback);
        Ok(())
    }

    pub fn set_exit_callback(
        &mut self,
        state: &S,
        callback: Callback,
    ) -> Result<(), ConfigurationError> {
        self.node_mut(state)?.on_exit = Some(callback);
        Ok(())
    }

    pub fn set_behavior_callback(
        &mut self,
        state: &S,
        callback: Callback,
    ) -> Result<(), ConfigurationError> {
        self.node_mut(state)?.behavior = Some(callback);
        Ok(())
    }

    /// States from `state` up to its top-level ancestor, leaf first.
    pub fn ancestors(&self, state: &S) -> Result<Vec<&S>, ConfigurationError> {
        let idx = self.resolve(state)?;
        Ok(self
            .ancestors_of(idx)
            .into_iter()
            .map(|i| &self.nodes[i.0].id)
            .collect())
    }

    /// Deepest state that is an ancestor-or-self of both `a` and `b`.
    ///
    /// `None` means the two only share the implicit machine root.
    pub fn lowest_common_ancestor(&self, a: &S, b: &S) -> Result<Option<&S>, ConfigurationError> {
        let a = self.resolve(a)?;
        let b = self.resolve(b)?;
        Ok(self.lca(a, b).map(|i| &self.nodes[i.0].id))
    }

    pub fn parent(&self, state: &S) -> Result<Option<&S>, ConfigurationError> {
        let idx = self.resolve(state)?;
        Ok(self.nodes[idx.0].parent.map(|p| &self.nodes[p.0].id))
    }

    pub fn children(&self, state: &S) -> Result<Vec<&S>, ConfigurationError> {
        let idx = self.resolve(state)?;
        Ok(self.nodes[idx.0]
            .children
            .iter()
            .map(|c| &self.nodes[c.0].id)
            .collect())
    }

    pub fn initial_child(&self, state: &S) -> Result<Option<&S>, ConfigurationError> {
        let idx = self.resolve(state)?;
        Ok(self.nodes[idx.0].initial.map(|c| &self.nodes[c.0].id))
    }

    pub fn history_policy(&self, state: &S) -> Result<HistoryPolicy, ConfigurationError> {
        let idx = self.resolve(state)?;
        Ok(self.nodes[idx.0].history)
    }

    pub fn is_composite(&self, state: &S) -> Result<bool, ConfigurationError> {
        let idx = self.resolve(state)?;
        Ok(self.has_children(idx))
    }

    /// Registered states in registration order.
    pub fn states(&self) -> impl Iterator<Item = &S> + '_ {
        self.nodes.iter().map(|n| &n.id)
    }

    pub fn index_of(&self, state: &S) -> Option<StateIdx> {
        self.index.get(state).copied()
    }

    pub(crate) fn resolve(&self, state: &S) -> Result<StateIdx, ConfigurationError> {
        self.index_of(state)
            .ok_or_else(|| ConfigurationError::UnknownState {
                state: state.name().to_string(),
            })
    }

    pub(crate) fn node(&self, idx: StateIdx) -> &StateNode<S> {
        &self.nodes[idx.0]
    }

    pub(crate) fn id(&self, idx: StateIdx) -> &S {
        &self.nodes[idx.0].id
    }

    pub(crate) fn parent_of(&self, idx: StateIdx) -> Option<StateIdx> {
        self.nodes[idx.0].parent
    }

    pub(crate) fn has_children(&self, idx: StateIdx) -> bool {
        !self.nodes[idx.0].children.is_empty()
    }

    pub(crate) fn ancestors_of(&self, idx: StateIdx) -> Vec<StateIdx> {
        let mut path = vec![idx];
        let mut current = idx;
        while let Some(parent) = self.nodes[current.0].parent {
            path.push(parent);
            current = parent;
        }
        path
    }

    pub(crate) fn is_ancestor_or_self(&self, ancestor: StateIdx, idx: StateIdx) -> bool {
        let mut current = Some(idx);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.nodes[c.0].parent;
        }
        false
    }

    pub(crate) fn lca(&self, a: StateIdx, b: StateIdx) -> Option<StateIdx> {
        let a_path = self.ancestors_of(a);
        let mut current = Some(b);
        while let Some(c) = current {
            if a_path.contains(&c) {
                return Some(c);
            }
            current = self.nodes[c.0].parent;
        }
        None
    }

    fn node_mut(&mut self, state: &S) -> Result<&mut StateNode<S>, ConfigurationError> {
        self.ensure_mutable()?;
        let idx = self.resolve(state)?;
        Ok(&mut self.nodes[idx.0])
    }

    fn ensure_mutable(&self) -> Result<(), ConfigurationError> {
        if self.frozen {
            Err(ConfigurationError::AlreadyInitialized)
        } else {
            Ok(())
        }
    }
}

impl<S: State> fmt::Debug for StateGraph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateGraph")
            .field("states", &self.nodes.iter().map(|n| &n.id).collect::<Vec<_>>())
            .field("frozen", &self.frozen)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::callback;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum TestState {
        Root,
        A,
        A1,
        A2,
        B,
        B1,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Root => "Root",
                Self::A => "A",
                Self::A1 => "A1",
                Self::A2 => "A2",
                Self::B => "B",
                Self::B1 => "B1",
            }
        }
    }

    use TestState::*;

    fn sample() -> StateGraph<TestState> {
        let mut graph = StateGraph::new();
        for s in [Root, A, A1, A2, B, B1] {
            graph.add_state(s).unwrap();
        }
        graph.set_parent(&A, &Root).unwrap();
        graph.set_parent(&B, &Root).unwrap();
        graph.set_parent(&A1, &A).unwrap();
        graph.set_parent(&A2, &A).unwrap();
        graph.set_parent(&B1, &B).unwrap();
        graph
    }

    #[test]
    fn duplicate_state_is_rejected() {
        let mut graph = StateGraph::new();
        graph.add_state(A).unwrap();

        let err = graph.add_state(A).unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateState { state: "A".into() });
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn set_parent_requires_known_states() {
        let mut graph = StateGraph::new();
        graph.add_state(A).unwrap();

        assert!(matches!(
            graph.set_parent(&A, &B),
            Err(ConfigurationError::UnknownState { .. })
        ));
        assert!(matches!(
            graph.set_parent(&B, &A),
            Err(ConfigurationError::UnknownState { .. })
        ));
    }

    #[test]
    fn cycles_are_rejected_and_graph_unchanged() {
        let mut graph = sample();

        let err = graph.set_parent(&Root, &A1).unwrap_err();
        assert!(matches!(err, ConfigurationError::CycleDetected { .. }));
        assert_eq!(graph.parent(&Root).unwrap(), None);
        assert_eq!(graph.parent(&A1).unwrap(), Some(&A));

        assert!(matches!(
            graph.set_parent(&B, &B),
            Err(ConfigurationError::CycleDetected { .. })
        ));
    }

    #[test]
    fn reparenting_moves_child() {
        let mut graph = sample();
        graph.set_parent(&A2, &B).unwrap();

        assert_eq!(graph.children(&A).unwrap(), vec![&A1]);
        assert_eq!(graph.children(&B).unwrap(), vec![&B1, &A2]);
        assert_eq!(graph.parent(&A2).unwrap(), Some(&B));
    }

    #[test]
    fn ancestors_are_leaf_first() {
        let graph = sample();
        assert_eq!(graph.ancestors(&A1).unwrap(), vec![&A1, &A, &Root]);
        assert_eq!(graph.ancestors(&Root).unwrap(), vec![&Root]);
    }

    #[test]
    fn lowest_common_ancestor_finds_deepest_shared_state() {
        let graph = sample();

        assert_eq!(graph.lowest_common_ancestor(&A1, &A2).unwrap(), Some(&A));
        assert_eq!(graph.lowest_common_ancestor(&A1, &B1).unwrap(), Some(&Root));
        assert_eq!(graph.lowest_common_ancestor(&A1, &A).unwrap(), Some(&A));
        assert_eq!(graph.lowest_common_ancestor(&A1, &A1).unwrap(), Some(&A1));
    }

    #[test]
    fn lowest_common_ancestor_of_separate_top_levels_is_none() {
        let mut graph = StateGraph::new();
        graph.add_state(A).unwrap();
        graph.add_state(B).unwrap();

        assert_eq!(graph.lowest_common_ancestor(&A, &B).unwrap(), None);
    }

    #[test]
    fn frozen_graph_rejects_mutation() {
        let mut graph = sample();
        graph.freeze();

        assert_eq!(
            graph.add_state(B1),
            Err(ConfigurationError::AlreadyInitialized)
        );
        assert_eq!(
            graph.set_parent(&A2, &B),
            Err(ConfigurationError::AlreadyInitialized)
        );
        assert_eq!(
            graph.set_entry_callback(&A, callback(|_| Ok(()))),
            Err(ConfigurationError::AlreadyInitialized)
        );
    }

    #[test]
    fn setters_reject_unknown_states() {
        let mut graph = StateGraph::new();
        graph.add_state(A).unwrap();

        assert!(graph.set_history_policy(&B, HistoryPolicy::Deep).is_err());
        assert!(graph.set_initial_child(&A, &B).is_err());
        assert!(graph.set_behavior_callback(&B, callback(|_| Ok(()))).is_err());
    }

    #[test]
    fn composite_detection_follows_children() {
        let graph = sample();
        assert!(graph.is_composite(&A).unwrap());
        assert!(!graph.is_composite(&A1).unwrap());
    }
}
