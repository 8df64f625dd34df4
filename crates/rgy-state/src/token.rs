//! # Allocation Token Validity
//!
//! Tokens (promotions, reserved-name unlocks) have a validity lifecycle
//! expressed as a [`TimedTransitionMap`] over [`TokenStatus`]:
//!
//! ```text
//! NotStarted ──▶ Valid ──▶ Ended
//!     │            │
//!     └────────────┴──▶ Cancelled
//! ```
//!
//! `Ended` and `Cancelled` are terminal. A schedule that skips `Valid`
//! (`NotStarted → Ended`), repeats a state, or continues after a terminal
//! state is rejected when the token is built or loaded.

use serde::{Deserialize, Serialize};

use rgy_core::{EntityKey, Timestamp};

use crate::error::StateError;
use crate::timed::{GraphTransitions, TimedTransitionMap, TransitionGraph};

/// Validity status of a token at an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenStatus {
    /// Not yet usable.
    NotStarted,
    /// Usable.
    Valid,
    /// Validity window has closed (terminal).
    Ended,
    /// Withdrawn by the registry (terminal).
    Cancelled,
}

impl TokenStatus {
    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Valid => "VALID",
            Self::Ended => "ENDED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

impl TransitionGraph for TokenStatus {
    fn valid_transitions(&self) -> &'static [Self] {
        match self {
            Self::NotStarted => &[Self::Valid, Self::Cancelled],
            Self::Valid => &[Self::Ended, Self::Cancelled],
            Self::Ended | Self::Cancelled => &[],
        }
    }
}

impl std::fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token status over time, validated against the token graph.
pub type TokenStatusMap = TimedTransitionMap<TokenStatus, GraphTransitions>;

/// A registry-issued allocation token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationToken {
    /// The token string presented by the registrar.
    pub token: String,
    /// Validity schedule.
    pub status_transitions: TokenStatusMap,
    /// Resource that consumed the token, if it was single-use and redeemed.
    pub redemption: Option<EntityKey>,
}

impl AllocationToken {
    /// Build a token that is valid between `starts` and `ends`.
    pub fn valid_between(
        token: impl Into<String>,
        starts: Timestamp,
        ends: Timestamp,
    ) -> Result<Self, StateError> {
        let mut entries = Vec::with_capacity(3);
        if starts > Timestamp::start_of_time() {
            entries.push((Timestamp::start_of_time(), TokenStatus::NotStarted));
        }
        entries.push((starts, TokenStatus::Valid));
        if !ends.is_end_of_time() {
            entries.push((ends, TokenStatus::Ended));
        }
        Ok(Self {
            token: token.into(),
            status_transitions: TokenStatusMap::new(entries)?,
            redemption: None,
        })
    }

    /// Status at `at`.
    pub fn status_at(&self, at: Timestamp) -> TokenStatus {
        *self.status_transitions.value_at(at)
    }

    /// Whether the token can be used at `at`.
    pub fn is_valid_at(&self, at: Timestamp) -> bool {
        self.redemption.is_none() && self.status_at(at) == TokenStatus::Valid
    }
}
