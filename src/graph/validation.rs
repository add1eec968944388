//! Whole-chart validation run before a machine is initialized.
//!
//! Every check contributes a `Validation`, and all of them are combined so
//! the caller sees every defect of the chart in one pass instead of fixing
//! them one at a time.

use super::StateGraph;
use crate::core::State;
use crate::error::ConfigurationError;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<ConfigurationError>>;

/// Validate the graph as a chart whose initial state is `initial`.
pub fn validate<S: State>(graph: &StateGraph<S>, initial: &S) -> Check {
    let mut checks: Vec<Check> = Vec::new();

    checks.push(if graph.contains(initial) {
        Validation::success(())
    } else {
        Validation::fail(ConfigurationError::UnknownState {
            state: initial.name().to_string(),
        })
    });

    for idx in (0..graph.len()).map(super::StateIdx) {
        checks.push(check_initial_child(graph, idx));
    }

    Validation::all_vec(checks).map(|_| ())
}

fn check_initial_child<S: State>(graph: &StateGraph<S>, idx: super::StateIdx) -> Check {
    let node = graph.node(idx);
    match node.initial {
        None if graph.has_children(idx) => Validation::fail(ConfigurationError::MissingInitialChild {
            state: node.id.name().to_string(),
        }),
        Some(child) if graph.parent_of(child) != Some(idx) => {
            Validation::fail(ConfigurationError::InvalidInitialChild {
                state: node.id.name().to_string(),
                child: graph.id(child).name().to_string(),
            })
        }
        _ => Validation::success(()),
    }
}
