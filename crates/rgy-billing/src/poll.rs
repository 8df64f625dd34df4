//! # Poll Messages
//!
//! Asynchronous notifications queued for registrars. A message becomes
//! visible once its `event_time` has passed, which lets flows enqueue
//! notices about future outcomes (automatic transfer approval, purge after
//! redemption) at the moment they are decided.

use serde::{Deserialize, Serialize};

use rgy_core::{ClientId, EntityKey, Timestamp};
use rgy_state::TransferStatus;

/// Transfer details attached to a transfer notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResponse {
    /// Name of the transferred resource.
    pub resource_name: String,
    /// Outcome described by the notice.
    pub status: TransferStatus,
    /// Registrar requesting sponsorship.
    pub gaining_client_id: ClientId,
    /// Registrar losing sponsorship.
    pub losing_client_id: ClientId,
    /// When the transfer was requested.
    pub transfer_request_time: Timestamp,
    /// When the outcome takes or took effect.
    pub pending_transfer_expiration_time: Timestamp,
    /// Expiration after approval, for domains.
    pub extended_registration_expiration_time: Option<Timestamp>,
}

/// A notice delivered once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneTimePoll {
    /// Key of this message.
    pub key: EntityKey,
    /// Recipient.
    pub client_id: ClientId,
    /// When the message becomes visible.
    pub event_time: Timestamp,
    /// Human-readable text.
    pub message: String,
    /// History entry that produced this message.
    pub parent: EntityKey,
    /// Transfer details, for transfer notices.
    pub transfer_response: Option<TransferResponse>,
}

/// A yearly "your domain auto-renewed" notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutorenewPoll {
    /// Key of this message.
    pub key: EntityKey,
    /// Recipient.
    pub client_id: ClientId,
    /// Name of the renewed domain.
    pub target_id: String,
    /// The first anniversary.
    pub event_time: Timestamp,
    /// No anniversary at or after this instant produces a notice.
    pub autorenew_end_time: Timestamp,
    /// History entry that produced this message.
    pub parent: EntityKey,
}

/// Any poll message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PollMessage {
    /// Delivered once.
    OneTime(OneTimePoll),
    /// Delivered on each anniversary.
    Autorenew(AutorenewPoll),
}

impl PollMessage {
    /// One-time notice to `client_id` visible from `event_time`.
    pub fn notice(
        client_id: &ClientId,
        event_time: Timestamp,
        message: impl Into<String>,
        parent: EntityKey,
        transfer_response: Option<TransferResponse>,
    ) -> Self {
        Self::OneTime(OneTimePoll {
            key: EntityKey::new(),
            client_id: client_id.clone(),
            event_time,
            message: message.into(),
            parent,
            transfer_response,
        })
    }

    /// Open-ended autorenew notice series starting at `first_anniversary`.
    pub fn autorenew(
        client_id: &ClientId,
        target_id: &str,
        first_anniversary: Timestamp,
        parent: EntityKey,
    ) -> Self {
        Self::Autorenew(AutorenewPoll {
            key: EntityKey::new(),
            client_id: client_id.clone(),
            target_id: target_id.to_string(),
            event_time: first_anniversary,
            autorenew_end_time: Timestamp::end_of_time(),
            parent,
        })
    }

    /// Key of the message.
    pub fn key(&self) -> EntityKey {
        match self {
            Self::OneTime(m) => m.key,
            Self::Autorenew(m) => m.key,
        }
    }

    /// Recipient.
    pub fn client_id(&self) -> &ClientId {
        match self {
            Self::OneTime(m) => &m.client_id,
            Self::Autorenew(m) => &m.client_id,
        }
    }

    /// When the (first) notice becomes visible.
    pub fn event_time(&self) -> Timestamp {
        match self {
            Self::OneTime(m) => m.event_time,
            Self::Autorenew(m) => m.event_time,
        }
    }

    /// Whether a notice is visible to the recipient at `now`.
    pub fn is_visible_at(&self, now: Timestamp) -> bool {
        match self {
            Self::OneTime(m) => m.event_time <= now,
            Self::Autorenew(m) => m.event_time <= now && m.event_time < m.autorenew_end_time,
        }
    }

    /// Transfer details, for transfer notices.
    pub fn transfer_response(&self) -> Option<&TransferResponse> {
        match self {
            Self::OneTime(m) => m.transfer_response.as_ref(),
            Self::Autorenew(_) => None,
        }
    }
}
