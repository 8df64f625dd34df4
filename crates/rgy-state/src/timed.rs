//! # Timed Transition Map
//!
//! A piecewise-constant function of time: an ordered list of
//! `(instant, value)` pairs whose first instant is
//! [`Timestamp::start_of_time()`]. The value at any instant is the value of
//! the greatest key at or before it.
//!
//! Each use site chooses a [`TransitionRule`]. Token validity uses
//! [`GraphTransitions`], which consults the value type's
//! [`TransitionGraph`]. TLD phase schedules and fee schedules use the
//! permissive [`AnyTransition`].
//!
//! ## Invariant
//!
//! Every adjacent pair satisfies the rule, and no entry follows a terminal
//! value. This is checked on construction, including deserialization, never
//! on lookup. A map that fails validation indicates corrupted persisted data.

use std::fmt;
use std::marker::PhantomData;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use rgy_core::Timestamp;

use crate::error::StateError;

/// Decides which adjacent value pairs a map may contain.
pub trait TransitionRule<V> {
    /// Whether `to` may directly follow `from`.
    fn can_transition(from: &V, to: &V) -> bool;

    /// Whether nothing may follow `value`.
    fn is_terminal(_value: &V) -> bool {
        false
    }
}

/// Accepts every transition. Used for schedules whose values are data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnyTransition;

impl<V> TransitionRule<V> for AnyTransition {
    fn can_transition(_from: &V, _to: &V) -> bool {
        true
    }
}

/// A value type with a fixed successor graph.
pub trait TransitionGraph: Sized + PartialEq + 'static {
    /// The states reachable in one step. Empty for terminal states.
    fn valid_transitions(&self) -> &'static [Self];
}

/// Validates transitions against the value type's [`TransitionGraph`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphTransitions;

impl<V: TransitionGraph> TransitionRule<V> for GraphTransitions {
    fn can_transition(from: &V, to: &V) -> bool {
        from.valid_transitions().contains(to)
    }

    fn is_terminal(value: &V) -> bool {
        value.valid_transitions().is_empty()
    }
}

/// A time-versioned value with construction-time transition validation.
pub struct TimedTransitionMap<V, R = AnyTransition> {
    entries: Vec<(Timestamp, V)>,
    _rule: PhantomData<fn() -> R>,
}

impl<V, R> TimedTransitionMap<V, R>
where
    V: fmt::Display,
    R: TransitionRule<V>,
{
    /// Build a map from its entries.
    ///
    /// # Errors
    ///
    /// - [`StateError::MissingStartOfTime`] if the map is empty or its first
    ///   key is not `start_of_time()`.
    /// - [`StateError::UnsortedOrDuplicateKey`] if keys are not strictly
    ///   increasing.
    /// - [`StateError::InvalidTransition`] if a value follows a terminal
    ///   value or an adjacent pair violates the rule.
    pub fn new(entries: Vec<(Timestamp, V)>) -> Result<Self, StateError> {
        match entries.first() {
            Some((first, _)) if *first == Timestamp::start_of_time() => {}
            Some((first, _)) => {
                return Err(StateError::MissingStartOfTime { first: Some(*first) })
            }
            None => return Err(StateError::MissingStartOfTime { first: None }),
        }
        for pair in entries.windows(2) {
            let (prev_at, prev) = &pair[0];
            let (next_at, next) = &pair[1];
            if next_at <= prev_at {
                return Err(StateError::UnsortedOrDuplicateKey {
                    previous: *prev_at,
                    key: *next_at,
                });
            }
            if R::is_terminal(prev) {
                return Err(StateError::InvalidTransition {
                    from: prev.to_string(),
                    to: None,
                });
            }
            if !R::can_transition(prev, next) {
                return Err(StateError::InvalidTransition {
                    from: prev.to_string(),
                    to: Some(next.to_string()),
                });
            }
        }
        Ok(Self {
            entries,
            _rule: PhantomData,
        })
    }

    /// A map holding one value for all time.
    pub fn constant(value: V) -> Self {
        Self {
            entries: vec![(Timestamp::start_of_time(), value)],
            _rule: PhantomData,
        }
    }
}

impl<V, R> TimedTransitionMap<V, R> {
    /// The value in effect at `at`: the value of the greatest key `<= at`.
    ///
    /// Instants before `start_of_time()` see the first value.
    pub fn value_at(&self, at: Timestamp) -> &V {
        let idx = self.entries.partition_point(|(key, _)| *key <= at);
        &self.entries[idx.saturating_sub(1)].1
    }

    /// The first change strictly after `at`, if any.
    pub fn next_transition_after(&self, at: Timestamp) -> Option<(Timestamp, &V)> {
        let idx = self.entries.partition_point(|(key, _)| *key <= at);
        self.entries.get(idx).map(|(key, value)| (*key, value))
    }

    /// Iterate the entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (Timestamp, &V)> {
        self.entries.iter().map(|(key, value)| (*key, value))
    }

    /// Number of entries (at least one).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; a valid map has a start-of-time entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone, R> Clone for TimedTransitionMap<V, R> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            _rule: PhantomData,
        }
    }
}

impl<V: fmt::Debug, R> fmt::Debug for TimedTransitionMap<V, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter().map(|(k, v)| (k, v))).finish()
    }
}

impl<V: PartialEq, R> PartialEq for TimedTransitionMap<V, R> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<V: Eq, R> Eq for TimedTransitionMap<V, R> {}

impl<V: Serialize, R> Serialize for TimedTransitionMap<V, R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}

impl<'de, V, R> Deserialize<'de> for TimedTransitionMap<V, R>
where
    V: Deserialize<'de> + fmt::Display,
    R: TransitionRule<V>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<(Timestamp, V)>::deserialize(deserializer)?;
        Self::new(entries).map_err(serde::de::Error::custom)
    }
}
