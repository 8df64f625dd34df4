//! # Billing Error Types

use thiserror::Error;

use rgy_core::EntityKey;

use crate::grace::GracePeriodStatus;

/// Errors building or checking billing records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// The grace period has no charge to void.
    #[error("grace period {kind} has no billing event to cancel")]
    GracePeriodNotBillable {
        /// Kind of the grace period.
        kind: GracePeriodStatus,
    },

    /// A grace period constructor was used with the wrong kind.
    #[error("grace period kind {kind} not allowed here: expected {expected}")]
    GracePeriodKindMismatch {
        /// The kind supplied.
        kind: GracePeriodStatus,
        /// What the constructor accepts.
        expected: String,
    },

    /// A cancellation does not line up with the event it voids.
    #[error("cancellation {cancellation} is inconsistent: {reason}")]
    CancellationMismatch {
        /// The cancellation checked.
        cancellation: EntityKey,
        /// What is wrong.
        reason: String,
    },
}
