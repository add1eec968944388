//! Guard predicates for transition control.
//!
//! Guards are pure functions that decide whether a candidate transition
//! applies to a fired event, based on the event's argument vector.

use super::args::Variant;
use std::fmt;
use std::sync::Arc;

/// A guard predicate that controls whether a transition is allowed.
///
/// Guards must be pure - no side effects, deterministic results.
/// They are evaluated on the dispatcher thread, in registration order,
/// until one candidate accepts.
///
/// # Example
///
/// ```rust
/// use hsmcore::core::{Guard, Variant};
///
/// let above_limit = Guard::new(|args: &[Variant]| {
///     args.first().and_then(Variant::as_i64).is_some_and(|v| v > 10)
/// });
///
/// assert!(above_limit.check(&[Variant::Int(11)]));
/// assert!(!above_limit.check(&[Variant::Int(3)]));
/// assert!(!above_limit.check(&[]));
/// ```
#[derive(Clone)]
pub struct Guard {
    predicate: Arc<dyn Fn(&[Variant]) -> bool + Send + Sync>,
}

impl Guard {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be pure (deterministic, no side effects) and
    /// thread-safe (Send + Sync).
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&[Variant]) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// Check if the guard accepts this argument vector.
    pub fn check(&self, args: &[Variant]) -> bool {
        (self.predicate)(args)
    }

    /// Guard accepting only when `self` rejects.
    pub fn negate(self) -> Self {
        Guard::new(move |args| !self.check(args))
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_allows_matching_args() {
        let guard = Guard::new(|args: &[Variant]| matches!(args.first(), Some(Variant::Bool(true))));

        assert!(guard.check(&[Variant::Bool(true)]));
        assert!(!guard.check(&[Variant::Bool(false)]));
        assert!(!guard.check(&[]));
    }

    #[test]
    fn guard_is_deterministic() {
        let args = vec![Variant::Int(5)];
        let guard = Guard::new(|args: &[Variant]| args.len() == 1);

        assert_eq!(guard.check(&args), guard.check(&args));
    }

    #[test]
    fn negated_guard_flips_result() {
        let guard = Guard::new(|args: &[Variant]| args.is_empty()).negate();

        assert!(!guard.check(&[]));
        assert!(guard.check(&[Variant::Unit]));
    }

    #[test]
    fn cloned_guard_shares_predicate() {
        let guard = Guard::new(|args: &[Variant]| args.iter().any(|a| a.as_str() == Some("go")));
        let copy = guard.clone();

        assert!(copy.check(&[Variant::from("go")]));
        assert!(guard.check(&[Variant::from("go")]));
    }
}
