//! Machine configuration.

use serde::{Deserialize, Serialize};

/// Tunables for a [`Machine`](super::Machine).
///
/// # Example
///
/// ```rust
/// use hsmcore::engine::MachineConfig;
///
/// let config = MachineConfig::from_json(r#"{ "name": "door", "queue_capacity": 16 }"#).unwrap();
/// assert_eq!(config.name, "door");
/// assert_eq!(config.queue_capacity, Some(16));
///
/// let defaults = MachineConfig::from_json("{}").unwrap();
/// assert_eq!(defaults, MachineConfig::default());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Name attached to every log span of the machine.
    pub name: String,

    /// Maximum number of pending events; `None` is unbounded.
    pub queue_capacity: Option<usize>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            name: "hsm".to_string(),
            queue_capacity: None,
        }
    }
}

impl MachineConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_methods_set_fields() {
        let config = MachineConfig::new("pump").with_queue_capacity(4);
        assert_eq!(config.name, "pump");
        assert_eq!(config.queue_capacity, Some(4));
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(MachineConfig::from_json(r#"{ "queue_capacity": "many" }"#).is_err());
    }
}
