//! Core State trait for state identifiers.
//!
//! States are plain, application-defined identifiers (usually fieldless
//! enums). The engine never stores behavior on the identifier itself;
//! callbacks live in the state graph, keyed by the identifier.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Trait for state identifiers.
///
/// # Required Traits
///
/// - `Clone` + `Eq` + `Hash`: identifiers key the graph's lookup table
/// - `Debug`: identifiers show up in diagnostics
/// - `Serialize` + `Deserialize`: identifiers are written into checkpoints
/// - `Send` + `Sync`: the machine is driven from a dispatcher thread
///
/// # Example
///
/// ```rust
/// use hsmcore::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum Lamp {
///     Off,
///     On,
/// }
///
/// impl State for Lamp {
///     fn name(&self) -> &str {
///         match self {
///             Self::Off => "Off",
///             Self::On => "On",
///         }
///     }
/// }
///
/// assert_eq!(Lamp::On.name(), "On");
/// ```
pub trait State:
    Clone + Eq + Hash + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static
{
    /// Get the state's name for display/logging.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum TestState {
        Idle,
        Running,
        Stopped,
    }

    impl State for TestState {
        fn name(&self) -> &str {
            match self {
                Self::Idle => "Idle",
                Self::Running => "Running",
                Self::Stopped => "Stopped",
            }
        }
    }

    #[test]
    fn state_name_returns_correct_value() {
        assert_eq!(TestState::Idle.name(), "Idle");
        assert_eq!(TestState::Running.name(), "Running");
        assert_eq!(TestState::Stopped.name(), "Stopped");
    }

    #[test]
    fn states_can_key_hash_sets() {
        let set: HashSet<TestState> = [TestState::Idle, TestState::Idle, TestState::Running]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn state_serialization_roundtrip() {
        let json = serde_json::to_string(&TestState::Running).unwrap();
        let back: TestState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TestState::Running);
    }
}
