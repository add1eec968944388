//! Event resolution and execution.
//!
//! The processor owns the chart and the active configuration. It only ever
//! runs on the dispatcher thread, one event at a time.

use super::observer::{
    CallbackFailure, CallbackPhase, DiscardReason, DiscardedEvent, Observer, StateChange,
};
use super::queue::{PendingEvent, Shared};
use crate::checkpoint::{CheckpointError, HistoryEntry, Snapshot};
use crate::core::{Callback, CallbackError, Event, HistoryPolicy, HistoryRecords, State, Variant};
use crate::dispatcher::lock;
use crate::error::ConfigurationError;
use crate::graph::{StateGraph, StateIdx};
use crate::transition::{Transition, TransitionKind, TransitionTable};
use chrono::Utc;
use std::sync::Mutex;
use tracing::{debug, debug_span, trace, warn};

pub(crate) enum Resolution<S: State, E: Event> {
    Found {
        owner: StateIdx,
        target: Option<StateIdx>,
        transition: Transition<S, E>,
    },
    Discarded(DiscardReason),
}

struct StepFailure {
    phase: CallbackPhase,
    state: Option<StateIdx>,
    error: CallbackError,
}

type Step<T = ()> = Result<T, StepFailure>;

pub(crate) struct Core<S: State, E: Event> {
    pub(crate) name: String,
    pub(crate) graph: StateGraph<S>,
    pub(crate) table: TransitionTable<S, E>,
    pub(crate) leaf: Option<StateIdx>,
    initial: Option<StateIdx>,
    pub(crate) history: HistoryRecords<StateIdx>,
    pub(crate) observer: Option<Box<dyn Observer<S, E>>>,
}

impl<S: State, E: Event> Core<S, E> {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            graph: StateGraph::new(),
            table: TransitionTable::new(),
            leaf: None,
            initial: None,
            history: HistoryRecords::new(),
            observer: None,
        }
    }

    /// Active path from the top-level state down to the leaf.
    pub(crate) fn active_path(&self) -> Vec<S> {
        let Some(leaf) = self.leaf else {
            return Vec::new();
        };
        self.graph
            .ancestors_of(leaf)
            .into_iter()
            .rev()
            .map(|idx| self.graph.id(idx).clone())
            .collect()
    }

    /// Settle the starting configuration without running callbacks.
    ///
    /// Starts from a restored leaf when there is one, otherwise from
    /// `initial`, and follows initial children down to a leaf.
    pub(crate) fn establish(&mut self, initial: &S) -> Result<(), ConfigurationError> {
        let initial = self.graph.resolve(initial)?;
        self.initial = Some(initial);
        let leaf = self.settle(self.leaf.unwrap_or(initial));
        self.leaf = Some(leaf);
        debug!(leaf = self.graph.id(leaf).name(), "Starting configuration established");
        Ok(())
    }

    fn settle(&self, mut current: StateIdx) -> StateIdx {
        while let Some(next) = self.next_default_step(current) {
            current = next;
        }
        current
    }

    /// Fall back to the starting configuration after a failure exited
    /// every state. Entered silently, like `establish`.
    fn reestablish(&mut self) {
        let Some(initial) = self.initial else {
            return;
        };
        let leaf = self.settle(initial);
        self.leaf = Some(leaf);
        warn!(
            leaf = self.graph.id(leaf).name(),
            "No state left active; starting configuration re-established"
        );
    }

    pub(crate) fn snapshot(&self) -> Snapshot<S> {
        let history = self
            .history
            .iter()
            .map(|(composite, descendant)| HistoryEntry {
                composite: self.graph.id(composite).clone(),
                descendant: self.graph.id(descendant).clone(),
            })
            .collect();
        Snapshot::new(self.name.clone(), self.active_path(), history)
    }

    /// Adopt the configuration and history stored in `snapshot`.
    pub(crate) fn restore(&mut self, snapshot: &Snapshot<S>) -> Result<(), CheckpointError> {
        snapshot.validate_against(&self.graph)?;

        let mut history = HistoryRecords::new();
        for entry in &snapshot.history {
            if let (Some(composite), Some(descendant)) = (
                self.graph.index_of(&entry.composite),
                self.graph.index_of(&entry.descendant),
            ) {
                history.record(composite, descendant);
            }
        }
        self.history = history;
        self.leaf = snapshot.leaf().and_then(|leaf| self.graph.index_of(leaf));
        debug!(
            snapshot = %snapshot.id,
            leaf = snapshot.leaf().map(|s| s.name()),
            "Snapshot restored"
        );
        Ok(())
    }

    fn next_default_step(&self, state: StateIdx) -> Option<StateIdx> {
        if !self.graph.has_children(state) {
            return None;
        }
        self.graph.node(state).initial
    }

    /// Find the transition `event` would take, walking from the leaf to the top.
    pub(crate) fn resolve(&self, event: &E, args: &[Variant]) -> Resolution<S, E> {
        let Some(leaf) = self.leaf else {
            return Resolution::Discarded(DiscardReason::NoMatchingTransition);
        };

        let mut saw_candidate = false;
        for owner in self.graph.ancestors_of(leaf) {
            for candidate in self.table.candidates_at(owner, event) {
                saw_candidate = true;
                if !candidate.accepts(args) {
                    trace!(
                        state = self.graph.id(owner).name(),
                        event = event.name(),
                        "Guard rejected candidate"
                    );
                    continue;
                }
                let target = candidate
                    .target
                    .as_ref()
                    .and_then(|t| self.graph.index_of(t));
                return Resolution::Found {
                    owner,
                    target,
                    transition: candidate.clone(),
                };
            }
        }

        Resolution::Discarded(if saw_candidate {
            DiscardReason::GuardRejectedAll
        } else {
            DiscardReason::NoMatchingTransition
        })
    }

    /// Process one event to completion.
    pub(crate) fn process(&mut self, pending: PendingEvent<E>) {
        let span = debug_span!("process_event", machine = %self.name, event = pending.event.name());
        let _enter = span.enter();

        match self.resolve(&pending.event, &pending.args) {
            Resolution::Discarded(reason) => {
                debug!(?reason, "Event discarded");
                let discarded = DiscardedEvent {
                    active: self.leaf.map(|l| self.graph.id(l).clone()),
                    event: pending.event,
                    args: pending.args,
                    reason,
                    timestamp: Utc::now(),
                };
                if let Some(observer) = self.observer.as_mut() {
                    observer.on_event_discarded(&discarded);
                }
            }
            Resolution::Found {
                owner,
                target,
                transition,
            } => {
                let from = self.leaf;
                match self.execute(owner, target, &transition, &pending.args) {
                    Ok(()) => self.report_change(from, &transition, pending.event),
                    Err(failure) => {
                        if self.leaf.is_none() {
                            self.reestablish();
                        }
                        self.report_failure(failure, pending.event)
                    }
                }
            }
        }
    }

    fn report_change(&mut self, from: Option<StateIdx>, transition: &Transition<S, E>, event: E) {
        if !transition.changes_state() {
            return;
        }
        let Some(leaf) = self.leaf else {
            return;
        };
        let change = StateChange {
            from: from.map(|f| self.graph.id(f).clone()),
            to: self.graph.id(leaf).clone(),
            event,
            kind: transition.kind,
            timestamp: Utc::now(),
        };
        debug!(to = change.to.name(), "Transition committed");
        if let Some(observer) = self.observer.as_mut() {
            observer.on_state_changed(&change);
        }
    }

    fn report_failure(&mut self, failure: StepFailure, event: E) {
        let report = CallbackFailure {
            event,
            phase: failure.phase,
            state: failure.state.map(|s| self.graph.id(s).clone()),
            error: failure.error,
            active: self.leaf.map(|l| self.graph.id(l).clone()),
            timestamp: Utc::now(),
        };
        warn!(
            phase = ?report.phase,
            state = report.state.as_ref().map(|s| s.name()),
            error = %report.error,
            "Callback failed; event processing stopped"
        );
        if let Some(observer) = self.observer.as_mut() {
            observer.on_callback_failed(&report);
        }
    }

    fn execute(
        &mut self,
        owner: StateIdx,
        target: Option<StateIdx>,
        transition: &Transition<S, E>,
        args: &[Variant],
    ) -> Step {
        let target = match (transition.kind, target) {
            (TransitionKind::Internal, _) | (_, None) => {
                trace!("Running internal action");
                return run(transition.action.as_ref(), args, CallbackPhase::Action, None);
            }
            (_, Some(target)) => target,
        };

        let domain = self.transition_domain(owner, target, transition.kind);
        let resumed = self.leaf;
        self.exit_to(domain, args)?;
        run(transition.action.as_ref(), args, CallbackPhase::Action, None)?;
        self.enter_from(domain, target, args)?;
        let leaf = match (transition.kind, resumed) {
            (TransitionKind::SelfTransition, Some(resumed)) => self.reenter(target, resumed, args)?,
            _ => self.descend(target, args)?,
        };
        let behavior = self.graph.node(leaf).behavior.clone();
        run(behavior.as_ref(), args, CallbackPhase::Behavior, Some(leaf))
    }

    /// State whose subtree contains the whole transition and is not exited.
    ///
    /// For external transitions this is the lowest common ancestor of owner
    /// and target, which is the owner itself when the target lies inside it.
    /// `None` is the implicit machine root.
    fn transition_domain(
        &self,
        owner: StateIdx,
        target: StateIdx,
        kind: TransitionKind,
    ) -> Option<StateIdx> {
        if kind == TransitionKind::SelfTransition {
            return self.graph.parent_of(owner);
        }
        self.graph.lca(owner, target)
    }

    fn exit_to(&mut self, domain: Option<StateIdx>, args: &[Variant]) -> Step {
        let Some(leaf) = self.leaf else {
            return Ok(());
        };
        let path: Vec<StateIdx> = self
            .graph
            .ancestors_of(leaf)
            .into_iter()
            .take_while(|s| Some(*s) != domain)
            .collect();

        let mut exited_child: Option<StateIdx> = None;
        for state in path {
            let on_exit = self.graph.node(state).on_exit.clone();
            run(on_exit.as_ref(), args, CallbackPhase::Exit, Some(state))?;

            if self.graph.node(state).history.is_enabled() {
                if let Some(child) = exited_child {
                    let remembered = match self.graph.node(state).history {
                        HistoryPolicy::Deep => leaf,
                        _ => child,
                    };
                    self.history.record(state, remembered);
                    trace!(
                        state = self.graph.id(state).name(),
                        remembered = self.graph.id(remembered).name(),
                        "History recorded"
                    );
                }
            }

            self.leaf = self.graph.parent_of(state);
            trace!(state = self.graph.id(state).name(), "Exited");
            exited_child = Some(state);
        }
        Ok(())
    }

    fn enter_from(&mut self, domain: Option<StateIdx>, target: StateIdx, args: &[Variant]) -> Step {
        let mut path: Vec<StateIdx> = self
            .graph
            .ancestors_of(target)
            .into_iter()
            .take_while(|s| Some(*s) != domain)
            .collect();
        path.reverse();
        for state in path {
            self.enter(state, args)?;
        }
        Ok(())
    }

    /// Enter back down from `owner` to the leaf that was active before a
    /// self transition on `owner`.
    fn reenter(&mut self, owner: StateIdx, resumed: StateIdx, args: &[Variant]) -> Step<StateIdx> {
        let ancestors = self.graph.ancestors_of(resumed);
        if !ancestors.contains(&owner) {
            return self.descend(owner, args);
        }
        let mut path: Vec<StateIdx> = ancestors.into_iter().take_while(|s| *s != owner).collect();
        path.reverse();
        for state in path {
            self.enter(state, args)?;
        }
        Ok(resumed)
    }

    /// Descend from `state` to a leaf through history or initial children.
    fn descend(&mut self, state: StateIdx, args: &[Variant]) -> Step<StateIdx> {
        let mut current = state;
        while self.graph.has_children(current) {
            let path: Vec<StateIdx> = match self.history.get(current) {
                Some(remembered) => {
                    let mut path: Vec<StateIdx> = self
                        .graph
                        .ancestors_of(remembered)
                        .into_iter()
                        .take_while(|s| *s != current)
                        .collect();
                    path.reverse();
                    path
                }
                None => match self.next_default_step(current) {
                    Some(initial) => vec![initial],
                    None => break,
                },
            };

            for step in &path {
                self.enter(*step, args)?;
            }
            match path.last() {
                Some(last) => current = *last,
                None => break,
            }
        }
        Ok(current)
    }

    fn enter(&mut self, state: StateIdx, args: &[Variant]) -> Step {
        let on_entry = self.graph.node(state).on_entry.clone();
        run(on_entry.as_ref(), args, CallbackPhase::Entry, Some(state))?;
        self.leaf = Some(state);
        trace!(state = self.graph.id(state).name(), "Entered");
        Ok(())
    }
}

fn run(
    callback: Option<&Callback>,
    args: &[Variant],
    phase: CallbackPhase,
    state: Option<StateIdx>,
) -> Step {
    match callback {
        Some(cb) => cb(args).map_err(|error| StepFailure {
            phase,
            state,
            error,
        }),
        None => Ok(()),
    }
}

/// Drain the queue of the machine owning `core` and `shared`.
///
/// Reentrant calls (a callback somehow triggering a nested drain) return
/// immediately; their events are picked up by the running drain.
pub(crate) fn drain<S: State, E: Event>(core: &Mutex<Core<S, E>>, shared: &Shared<S, E>) {
    loop {
        if !shared.begin_drain() {
            return;
        }
        {
            let mut core = lock(core);
            while shared.is_bound() {
                let Some(pending) = shared.pop() else {
                    break;
                };
                core.process(pending);
                shared.publish_active(core.active_path());
            }
        }
        shared.end_drain();

        // An event pushed between the last pop and `end_drain` has had its
        // wake-up swallowed by the claim above.
        if shared.pending_len() == 0 || !shared.is_bound() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::callback;

    crate::state_enum! {
        enum Tree {
            Root,
            Left,
            LeftLeaf,
            Right,
            RightLeaf,
            Alone,
        }
    }

    use Tree::*;

    /// Root(Left(LeftLeaf) | Right(RightLeaf)) and Alone.
    fn core() -> Core<Tree, &'static str> {
        let mut core = Core::new("test".into());
        for s in [Root, Left, LeftLeaf, Right, RightLeaf, Alone] {
            core.graph.add_state(s).unwrap();
        }
        for (child, parent) in [(Left, Root), (Right, Root), (LeftLeaf, Left), (RightLeaf, Right)] {
            core.graph.set_parent(&child, &parent).unwrap();
        }
        core.graph.set_initial_child(&Root, &Left).unwrap();
        core.graph.set_initial_child(&Left, &LeftLeaf).unwrap();
        core.graph.set_initial_child(&Right, &RightLeaf).unwrap();
        core.table.register_event("go").unwrap();
        core
    }

    fn idx(core: &Core<Tree, &'static str>, state: Tree) -> StateIdx {
        core.graph.index_of(&state).unwrap()
    }

    #[test]
    fn establish_descends_through_initial_children() {
        let mut core = core();
        core.establish(&Root).unwrap();
        assert_eq!(core.active_path(), vec![Root, Left, LeftLeaf]);
    }

    #[test]
    fn domain_of_cousins_is_their_common_ancestor() {
        let core = core();
        let domain = core.transition_domain(
            idx(&core, LeftLeaf),
            idx(&core, RightLeaf),
            TransitionKind::External,
        );
        assert_eq!(domain, Some(idx(&core, Root)));
    }

    #[test]
    fn domain_is_owner_when_target_is_inside_it() {
        let core = core();
        let domain = core.transition_domain(
            idx(&core, Left),
            idx(&core, LeftLeaf),
            TransitionKind::External,
        );
        assert_eq!(domain, Some(idx(&core, Left)));
    }

    #[test]
    fn domain_of_unrelated_top_levels_is_machine_root() {
        let core = core();
        let domain =
            core.transition_domain(idx(&core, LeftLeaf), idx(&core, Alone), TransitionKind::External);
        assert_eq!(domain, None);
    }

    #[test]
    fn self_transition_domain_is_owner_parent() {
        let core = core();
        let domain =
            core.transition_domain(idx(&core, Left), idx(&core, Left), TransitionKind::SelfTransition);
        assert_eq!(domain, Some(idx(&core, Root)));
    }

    #[test]
    fn resolution_bubbles_to_ancestors() {
        let mut core = core();
        let graph = &core.graph;
        core.table
            .add_transition(graph, Transition::external(Root, Alone, "go"))
            .unwrap();
        core.establish(&Root).unwrap();

        match core.resolve(&"go", &[]) {
            Resolution::Found { owner, target, .. } => {
                assert_eq!(owner, idx(&core, Root));
                assert_eq!(target, Some(idx(&core, Alone)));
            }
            Resolution::Discarded(reason) => panic!("discarded: {:?}", reason),
        }
    }

    #[test]
    fn resolution_without_active_state_discards() {
        let core = core();
        assert!(matches!(
            core.resolve(&"go", &[]),
            Resolution::Discarded(DiscardReason::NoMatchingTransition)
        ));
    }

    #[test]
    fn failed_exit_keeps_leaf_and_reports_phase() {
        let mut core = core();
        core.graph
            .set_exit_callback(&LeftLeaf, callback(|_| Err("jammed".into())))
            .unwrap();
        let graph = &core.graph;
        core.table
            .add_transition(graph, Transition::external(LeftLeaf, RightLeaf, "go"))
            .unwrap();
        core.establish(&Root).unwrap();

        let left_leaf = idx(&core, LeftLeaf);
        let right_leaf = idx(&core, RightLeaf);
        let transition = Transition::external(LeftLeaf, RightLeaf, "go");
        let failure = core
            .execute(left_leaf, Some(right_leaf), &transition, &[])
            .unwrap_err();

        assert_eq!(failure.phase, CallbackPhase::Exit);
        assert_eq!(failure.state, Some(left_leaf));
        assert_eq!(core.leaf, Some(left_leaf));
    }

    #[test]
    fn deep_history_is_recorded_on_exit() {
        let mut core = core();
        core.graph
            .set_history_policy(&Root, HistoryPolicy::Deep)
            .unwrap();
        core.graph
            .set_history_policy(&Left, HistoryPolicy::Shallow)
            .unwrap();
        core.establish(&Root).unwrap();

        let transition = Transition::external(Root, Alone, "go");
        let (root, alone) = (idx(&core, Root), idx(&core, Alone));
        assert!(core.execute(root, Some(alone), &transition, &[]).is_ok());

        assert_eq!(core.history.get(root), Some(idx(&core, LeftLeaf)));
        assert_eq!(core.history.get(idx(&core, Left)), Some(idx(&core, LeftLeaf)));
        assert_eq!(core.active_path(), vec![Alone]);
    }

    #[test]
    fn failure_after_exiting_everything_falls_back_to_start() {
        let mut core = core();
        core.establish(&Alone).unwrap();
        let transition = Transition::external(Alone, Root, "go")
            .with_action(callback(|_| Err("short circuit".into())));
        let graph = &core.graph;
        core.table.add_transition(graph, transition).unwrap();

        core.process(PendingEvent {
            event: "go",
            args: Vec::new(),
        });

        assert_eq!(core.active_path(), vec![Alone]);
        assert!(matches!(core.resolve(&"go", &[]), Resolution::Found { .. }));
    }

    #[test]
    fn self_transition_on_ancestor_keeps_leaf() {
        let mut core = core();
        core.establish(&Root).unwrap();
        core.leaf = Some(idx(&core, RightLeaf));

        let root = idx(&core, Root);
        let transition = Transition::self_transition(Root, "go");
        assert!(core.execute(root, Some(root), &transition, &[]).is_ok());

        assert_eq!(core.active_path(), vec![Root, Right, RightLeaf]);
    }
}
