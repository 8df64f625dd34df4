//! # State Error Types
//!
//! Errors raised when a time-versioned map or a transfer record violates its
//! invariants. These indicate corrupted persisted data or a programming
//! error in a caller, never a recoverable business rejection.

use thiserror::Error;

use rgy_core::Timestamp;

/// A state invariant was violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The first key of a timed map is not `start_of_time()`.
    #[error("timed map must begin at START_OF_TIME, first key was {}", describe_first(.first))]
    MissingStartOfTime {
        /// The first key found, if the map was non-empty.
        first: Option<Timestamp>,
    },

    /// Keys of a timed map are not strictly increasing.
    #[error("timed map keys must be strictly increasing: {key} follows {previous}")]
    UnsortedOrDuplicateKey {
        /// The preceding key.
        previous: Timestamp,
        /// The offending key.
        key: Timestamp,
    },

    /// An adjacent pair violates the transition rule, or a value follows a
    /// terminal value (`to` is `None`).
    #[error("{}", describe_transition(.from, .to.as_deref()))]
    InvalidTransition {
        /// The earlier value.
        from: String,
        /// The later value, absent when `from` is terminal.
        to: Option<String>,
    },

    /// Transfer data is inconsistent.
    #[error("transfer invariant violated: {0}")]
    TransferInvariant(String),
}

fn describe_first(first: &Option<Timestamp>) -> String {
    first.map_or_else(|| "absent (empty map)".to_string(), |t| t.to_string())
}

fn describe_transition(from: &str, to: Option<&str>) -> String {
    match to {
        Some(to) => format!("cannot transition from {from} to {to}"),
        None => format!("cannot transition from {from}."),
    }
}
