//! Snapshots of a machine's active configuration and history.
//!
//! A snapshot carries only data: the active path and the history records.
//! Callbacks, guards and the chart itself are code and are rebuilt by the
//! program that restores the snapshot.

use crate::core::State;
use crate::graph::StateGraph;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use uuid::Uuid;

pub mod error;

pub use error::CheckpointError;

/// Version identifier for the snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// One remembered history entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct HistoryEntry<S: State> {
    /// Composite state that owns the record
    pub composite: S,

    /// Remembered child (shallow) or leaf (deep)
    pub descendant: S,
}

/// Serializable snapshot of a machine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Snapshot<S: State> {
    /// Snapshot format version
    pub version: u32,

    /// Unique snapshot identifier
    pub id: Uuid,

    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,

    /// Name of the machine it was taken from
    pub machine: String,

    /// Active states from the top-level state down to the leaf
    pub active: Vec<S>,

    /// History records at the time of the snapshot
    pub history: Vec<HistoryEntry<S>>,
}

impl<S: State> Snapshot<S> {
    pub fn new(machine: impl Into<String>, active: Vec<S>, history: Vec<HistoryEntry<S>>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            machine: machine.into(),
            active,
            history,
        }
    }

    /// Active leaf, if the snapshot has one.
    pub fn leaf(&self) -> Option<&S> {
        self.active.last()
    }

    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, CheckpointError> {
        bincode::serialize(self).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let snapshot: Self = bincode::deserialize(bytes)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()?;
        Ok(snapshot)
    }

    fn check_version(&self) -> Result<(), CheckpointError> {
        if self.version == SNAPSHOT_VERSION {
            Ok(())
        } else {
            Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            })
        }
    }

    /// Check the snapshot against a chart, reporting every mismatch at once.
    pub fn validate_against(&self, graph: &StateGraph<S>) -> Result<(), CheckpointError> {
        let mut checks: Vec<Validation<(), NonEmptyVec<String>>> = Vec::new();
        checks.push(self.check_active_path(graph));
        for entry in &self.history {
            checks.push(check_history_entry(graph, entry));
        }

        match Validation::all_vec(checks) {
            Validation::Success(_) => Ok(()),
            Validation::Failure(errors) => Err(CheckpointError::ValidationFailed(
                errors.iter().cloned().collect::<Vec<_>>().join("; "),
            )),
        }
    }

    fn check_active_path(&self, graph: &StateGraph<S>) -> Validation<(), NonEmptyVec<String>> {
        if self.active.is_empty() {
            return Validation::fail("active path is empty".to_string());
        }

        let mut parent: Option<&S> = None;
        for state in &self.active {
            match graph.parent(state) {
                Err(_) => return Validation::fail(format!("unknown state '{}'", state.name())),
                Ok(actual) if actual != parent => {
                    return Validation::fail(format!(
                        "'{}' is not a child of '{}'",
                        state.name(),
                        parent.map_or("<root>", |p| p.name())
                    ));
                }
                Ok(_) => parent = Some(state),
            }
        }
        Validation::success(())
    }
}

fn check_history_entry<S: State>(
    graph: &StateGraph<S>,
    entry: &HistoryEntry<S>,
) -> Validation<(), NonEmptyVec<String>> {
    match graph.ancestors(&entry.descendant) {
        Err(_) => Validation::fail(format!(
            "unknown history state '{}'",
            entry.descendant.name()
        )),
        Ok(ancestors) if ancestors.iter().skip(1).any(|a| **a == entry.composite) => {
            Validation::success(())
        }
        Ok(_) => Validation::fail(format!(
            "'{}' is not a descendant of '{}'",
            entry.descendant.name(),
            entry.composite.name()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum Door {
        Closed,
        Locked,
        Unlocked,
        Open,
    }

    impl State for Door {
        fn name(&self) -> &str {
            match self {
                Self::Closed => "Closed",
                Self::Locked => "Locked",
                Self::Unlocked => "Unlocked",
                Self::Open => "Open",
            }
        }
    }

    fn chart() -> StateGraph<Door> {
        let mut graph = StateGraph::new();
        for s in [Door::Closed, Door::Locked, Door::Unlocked, Door::Open] {
            graph.add_state(s).unwrap();
        }
        graph.set_parent(&Door::Locked, &Door::Closed).unwrap();
        graph.set_parent(&Door::Unlocked, &Door::Closed).unwrap();
        graph
    }

    fn snapshot() -> Snapshot<Door> {
        Snapshot::new(
            "door",
            vec![Door::Closed, Door::Locked],
            vec![HistoryEntry {
                composite: Door::Closed,
                descendant: Door::Locked,
            }],
        )
    }

    #[test]
    fn json_preserves_everything() {
        let original = snapshot();
        let restored = Snapshot::<Door>::from_json(&original.to_json().unwrap()).unwrap();

        assert_eq!(restored.id, original.id);
        assert_eq!(restored.timestamp, original.timestamp);
        assert_eq!(restored.active, original.active);
        assert_eq!(restored.history, original.history);
        assert_eq!(restored.leaf(), Some(&Door::Locked));
    }

    #[test]
    fn binary_preserves_active_path() {
        let original = snapshot();
        let restored = Snapshot::<Door>::from_binary(&original.to_binary().unwrap()).unwrap();
        assert_eq!(restored.active, original.active);
        assert_eq!(restored.machine, "door");
    }

    #[test]
    fn newer_versions_are_rejected() {
        let mut future = snapshot();
        future.version = SNAPSHOT_VERSION + 1;
        let json = serde_json::to_string(&future).unwrap();

        assert!(matches!(
            Snapshot::<Door>::from_json(&json),
            Err(CheckpointError::UnsupportedVersion { found, supported })
                if found == SNAPSHOT_VERSION + 1 && supported == SNAPSHOT_VERSION
        ));
    }

    #[test]
    fn garbage_fails_to_deserialize() {
        assert!(matches!(
            Snapshot::<Door>::from_json("not json"),
            Err(CheckpointError::DeserializationFailed(_))
        ));
        assert!(matches!(
            Snapshot::<Door>::from_binary(&[1, 2, 3]),
            Err(CheckpointError::DeserializationFailed(_))
        ));
    }

    #[test]
    fn matching_snapshot_validates() {
        assert!(snapshot().validate_against(&chart()).is_ok());
    }

    #[test]
    fn broken_path_and_history_are_all_reported() {
        let broken = Snapshot::new(
            "door",
            vec![Door::Open, Door::Locked],
            vec![HistoryEntry {
                composite: Door::Open,
                descendant: Door::Unlocked,
            }],
        );

        match broken.validate_against(&chart()) {
            Err(CheckpointError::ValidationFailed(message)) => {
                assert!(message.contains("'Locked' is not a child of 'Open'"));
                assert!(message.contains("'Unlocked' is not a descendant of 'Open'"));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn empty_path_is_invalid() {
        let empty = Snapshot::<Door>::new("door", Vec::new(), Vec::new());
        assert!(matches!(
            empty.validate_against(&chart()),
            Err(CheckpointError::ValidationFailed(_))
        ));
    }
}
