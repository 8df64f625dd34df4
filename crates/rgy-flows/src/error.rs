//! # Flow Error Types
//!
//! Business-rule rejections raised by operations, the transient
//! [`FlowError::Contention`] raised by the store, and wrapped lower-layer
//! errors. The protocol layer maps each rejection to a result code.

use chrono::NaiveDate;
use thiserror::Error;

use rgy_billing::BillingError;
use rgy_core::{ClientId, CoreError, EntityKey};
use rgy_state::{GuardedOperation, StateError, StatusValue, TldState, TokenStatus, TransferStatus};

use crate::resource::ResourceKind;

/// Errors returned by registry operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// A transfer is already pending on the resource.
    #[error("a transfer is already pending on {resource}")]
    TransferAlreadyPending {
        /// Resource name.
        resource: String,
    },

    /// No transfer is pending any more; observe the projection instead.
    #[error("transfer on {resource} is not pending (status: {})", describe_transfer(.status))]
    TransferAlreadyResolved {
        /// Resource name.
        resource: String,
        /// Status of the latest attempt, if there ever was one.
        status: Option<TransferStatus>,
    },

    /// A status on the resource blocks the operation.
    #[error("status {status} on {resource} prohibits {operation}")]
    ResourceStatusProhibitsOperation {
        /// Resource name.
        resource: String,
        /// The blocked operation.
        operation: &'static str,
        /// The blocking status.
        status: StatusValue,
    },

    /// The resource changed since it was read. Retry the whole transaction.
    #[error("{resource} was modified concurrently (expected revision {expected}, found {found})")]
    Contention {
        /// Resource name.
        resource: String,
        /// Revision the operation was computed from.
        expected: u64,
        /// Revision found at commit.
        found: u64,
    },

    /// No live resource has the name.
    #[error("{kind} {name} does not exist")]
    ResourceDoesNotExist {
        /// Kind searched.
        kind: ResourceKind,
        /// Name searched.
        name: String,
    },

    /// A live resource already has the name.
    #[error("{kind} {name} already exists")]
    ResourceAlreadyExists {
        /// Kind of the resource.
        kind: ResourceKind,
        /// Conflicting name.
        name: String,
    },

    /// The acting registrar does not sponsor the resource.
    #[error("{client} does not sponsor {resource}")]
    ResourceNotOwned {
        /// Resource name.
        resource: String,
        /// Acting registrar.
        client: ClientId,
    },

    /// The acting registrar is not the party allowed to resolve the transfer.
    #[error("{client} is not authorized to act on the transfer of {resource}")]
    NotAuthorizedForTransferAction {
        /// Resource name.
        resource: String,
        /// Acting registrar.
        client: ClientId,
    },

    /// The requesting registrar already sponsors the resource.
    #[error("{client} already sponsors {resource}")]
    ObjectAlreadySponsored {
        /// Resource name.
        resource: String,
        /// Requesting registrar.
        client: ClientId,
    },

    /// A status to add is already present.
    #[error("{resource} already has status {status}")]
    StatusValueAlreadyPresent {
        /// Resource name.
        resource: String,
        /// The status.
        status: StatusValue,
    },

    /// A status to remove is not present.
    #[error("{resource} does not have status {status}")]
    StatusValueNotPresent {
        /// Resource name.
        resource: String,
        /// The status.
        status: StatusValue,
    },

    /// The status cannot be changed by this kind of actor.
    #[error("status {status} cannot be set by this operation")]
    StatusNotSettable {
        /// The status.
        status: StatusValue,
    },

    /// A status update that adds and removes nothing.
    #[error("status update on {resource} changes nothing")]
    EmptyStatusUpdate {
        /// Resource name.
        resource: String,
    },

    /// The registrar's view of the expiration date is stale.
    #[error("current expiration date of {resource} is {actual}, not {supplied}")]
    CurrentExpirationDateMismatch {
        /// Resource name.
        resource: String,
        /// Date supplied with the command.
        supplied: NaiveDate,
        /// Date on the resource.
        actual: NaiveDate,
    },

    /// The new expiration would exceed the registration ceiling.
    #[error("renewing {resource} would exceed {max_years} registration years")]
    ExceedsMaxRegistrationYears {
        /// Resource name.
        resource: String,
        /// Configured ceiling.
        max_years: u32,
    },

    /// Restore requires an open redemption window.
    #[error("{resource} is not in its redemption period")]
    DomainNotInRedemption {
        /// Resource name.
        resource: String,
    },

    /// The TLD has no configuration.
    #[error("TLD {tld:?} is not configured")]
    UnknownTld {
        /// TLD searched.
        tld: String,
    },

    /// The TLD does not accept registrations in its current phase.
    #[error("TLD {tld} does not accept registrations during {state}")]
    RegistrationsNotOpen {
        /// The TLD.
        tld: String,
        /// Its phase.
        state: TldState,
    },

    /// The period is outside the accepted range.
    #[error("invalid period of {years} years")]
    InvalidPeriod {
        /// Requested years.
        years: u32,
    },

    /// A domain name without a TLD label.
    #[error("invalid domain name {name:?}")]
    InvalidDomainName {
        /// The name.
        name: String,
    },

    /// The allocation token is unknown to the registry.
    #[error("allocation token {token:?} does not exist")]
    UnknownAllocationToken {
        /// The token string.
        token: String,
    },

    /// The allocation token cannot be used now.
    #[error("allocation token {token:?} is not usable (status {status}, redeemed: {redeemed})")]
    AllocationTokenNotValid {
        /// The token string.
        token: String,
        /// Status at the time of use.
        status: TokenStatus,
        /// Whether it was already consumed.
        redeemed: bool,
    },

    /// The operation does not apply to this kind of resource.
    #[error("{operation} is not supported for {kind} resources")]
    UnsupportedResourceKind {
        /// Kind of the resource.
        kind: ResourceKind,
        /// Operation attempted.
        operation: &'static str,
    },

    /// A referenced billing event or poll message is missing from the store.
    #[error("entity {key} not found")]
    EntityNotFound {
        /// The missing key.
        key: EntityKey,
    },

    /// A persisted state invariant does not hold.
    #[error(transparent)]
    State(#[from] StateError),

    /// A billing record could not be built.
    #[error(transparent)]
    Billing(#[from] BillingError),

    /// A core value could not be built.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl FlowError {
    /// Whether the caller should retry the whole transaction.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Contention { .. })
    }

    pub(crate) fn prohibited(resource: &str, operation: GuardedOperation, status: StatusValue) -> Self {
        Self::ResourceStatusProhibitsOperation {
            resource: resource.to_string(),
            operation: operation.as_str(),
            status,
        }
    }
}

fn describe_transfer(status: &Option<TransferStatus>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}
