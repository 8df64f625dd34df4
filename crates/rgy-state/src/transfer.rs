//! # Transfer Lifecycle
//!
//! A transfer attempt moves sponsorship of a domain or contact from the
//! losing registrar to the gaining registrar:
//!
//! ```text
//!            ┌──▶ ClientApproved
//!            ├──▶ ClientRejected
//! Pending ───┼──▶ ClientCancelled
//!            ├──▶ ServerApproved   (automatic, once the pending window lapses)
//!            └──▶ ServerCancelled  (implicit, e.g. the resource was deleted)
//! ```
//!
//! Every right-hand state is terminal for the attempt. A new request starts
//! from fresh [`TransferData`].
//!
//! While pending, the data also records the keys of the server-approve
//! entities: billing events and poll messages pre-built at request time that
//! take effect only if the transfer resolves automatically. Any explicit
//! resolution deletes them.

use std::collections::BTreeSet;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use rgy_core::{ClientId, EntityKey, Timestamp};

use crate::error::StateError;
use crate::timed::TransitionGraph;

/// Status of the latest transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransferStatus {
    /// Awaiting approval, rejection, cancellation or automatic approval.
    Pending,
    /// Approved by the losing registrar.
    ClientApproved,
    /// Cancelled by the gaining registrar.
    ClientCancelled,
    /// Rejected by the losing registrar.
    ClientRejected,
    /// Approved automatically when the pending window lapsed.
    ServerApproved,
    /// Cancelled by the registry.
    ServerCancelled,
}

impl TransferStatus {
    /// The protocol name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ClientApproved => "clientApproved",
            Self::ClientCancelled => "clientCancelled",
            Self::ClientRejected => "clientRejected",
            Self::ServerApproved => "serverApproved",
            Self::ServerCancelled => "serverCancelled",
        }
    }

    /// Whether the attempt has ended.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether sponsorship moved to the gaining registrar.
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::ClientApproved | Self::ServerApproved)
    }
}

impl TransitionGraph for TransferStatus {
    fn valid_transitions(&self) -> &'static [Self] {
        match self {
            Self::Pending => &[
                Self::ClientApproved,
                Self::ClientCancelled,
                Self::ClientRejected,
                Self::ServerApproved,
                Self::ServerCancelled,
            ],
            _ => &[],
        }
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of the latest transfer attempt on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferData {
    /// Current status of the attempt.
    pub status: TransferStatus,
    /// Registrar requesting sponsorship.
    pub gaining_client_id: ClientId,
    /// Registrar sponsoring at request time.
    pub losing_client_id: ClientId,
    /// When the request was made.
    pub transfer_request_time: Timestamp,
    /// While pending: when automatic approval takes effect. Once resolved:
    /// when the resolution took effect.
    pub pending_transfer_expiration_time: Timestamp,
    /// Years added to the registration on approval. Zero for contacts.
    pub transfer_period_years: u32,
    /// Registration expiration the domain carries after server approval.
    pub transferred_registration_expiration_time: Option<Timestamp>,
    /// Every entity pre-built for automatic approval.
    pub server_approve_entity_keys: BTreeSet<EntityKey>,
    /// The transfer `OneTime` billing event among them, if any.
    pub server_approve_billing_event: Option<EntityKey>,
    /// The gaining registrar's `Recurring` auto-renew event, if any.
    pub server_approve_autorenew_event: Option<EntityKey>,
    /// The gaining registrar's autorenew poll message, if any.
    pub server_approve_autorenew_poll_message: Option<EntityKey>,
}

impl TransferData {
    /// Whether the attempt is still pending in storage.
    pub fn is_pending(&self) -> bool {
        self.status == TransferStatus::Pending
    }

    /// Whether the attempt is pending and its window has not lapsed at `now`.
    pub fn is_pending_at(&self, now: Timestamp) -> bool {
        self.is_pending() && now < self.pending_transfer_expiration_time
    }

    /// Check the pending-state invariants.
    ///
    /// A pending attempt expires exactly `automatic_transfer_length` after
    /// the request and has at least one server-approve entity.
    pub fn check_invariants(&self, automatic_transfer_length: Duration) -> Result<(), StateError> {
        if !self.is_pending() {
            return Ok(());
        }
        let expected = self.transfer_request_time.plus(automatic_transfer_length);
        if self.pending_transfer_expiration_time != expected {
            return Err(StateError::TransferInvariant(format!(
                "pending transfer expires at {} but was requested at {} with automatic length {}s",
                self.pending_transfer_expiration_time,
                self.transfer_request_time,
                automatic_transfer_length.num_seconds()
            )));
        }
        if self.server_approve_entity_keys.is_empty() {
            return Err(StateError::TransferInvariant(
                "pending transfer has no server-approve entities".to_string(),
            ));
        }
        Ok(())
    }

    /// The data after resolving the attempt with `status` at `at`.
    ///
    /// Parties and request time are kept; the server-approve keys are
    /// cleared because they no longer describe a possible future.
    pub fn resolved(&self, status: TransferStatus, at: Timestamp) -> Result<Self, StateError> {
        if !self.status.valid_transitions().contains(&status) {
            return Err(StateError::InvalidTransition {
                from: self.status.to_string(),
                to: if self.status.is_terminal() {
                    None
                } else {
                    Some(status.to_string())
                },
            });
        }
        Ok(Self {
            status,
            pending_transfer_expiration_time: at,
            server_approve_entity_keys: BTreeSet::new(),
            server_approve_billing_event: None,
            server_approve_autorenew_event: None,
            server_approve_autorenew_poll_message: None,
            ..self.clone()
        })
    }
}
