//! # TLD Schedules
//!
//! Launch phases and fees change over a TLD's life at configured instants.
//! Both are plain data schedules, so their maps accept any transition; they
//! only rely on the floor lookup of [`TimedTransitionMap`].

use serde::{Deserialize, Serialize};

use rgy_core::Money;

use crate::timed::TimedTransitionMap;

/// Launch phase of a TLD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TldState {
    /// Delegated but not open to any registration.
    Predelegation,
    /// Trademark holders only.
    Sunrise,
    /// Open to everyone.
    GeneralAvailability,
}

impl TldState {
    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Predelegation => "PREDELEGATION",
            Self::Sunrise => "SUNRISE",
            Self::GeneralAvailability => "GENERAL_AVAILABILITY",
        }
    }

    /// Whether ordinary creates are accepted in this phase.
    pub fn accepts_general_registrations(&self) -> bool {
        matches!(self, Self::GeneralAvailability)
    }
}

impl std::fmt::Display for TldState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Launch phases over time.
pub type TldStateSchedule = TimedTransitionMap<TldState>;

/// Per-year price over time.
pub type FeeSchedule = TimedTransitionMap<Money>;
