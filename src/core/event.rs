//! Event identifiers.

use std::fmt::Debug;
use std::hash::Hash;

/// Trait for event identifiers that trigger transitions.
///
/// Events carry no payload themselves; per-firing data travels in the
/// argument vector passed to [`Machine::fire_with`](crate::engine::Machine::fire_with).
pub trait Event: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Get the event's name for display/logging.
    fn name(&self) -> &str;
}

impl Event for &'static str {
    fn name(&self) -> &str {
        self
    }
}
