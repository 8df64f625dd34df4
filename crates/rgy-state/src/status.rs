//! # Resource Status Values
//!
//! The status catalogue of registry resources and which operations each
//! status blocks. Statuses fall into three groups:
//!
//! - **Client-settable** (`client*`): applied by the sponsoring registrar.
//! - **Server-settable** (`server*`): applied by the registry as superuser.
//!   Adding one to a domain is billed immediately and is never refunded.
//! - **Derived** (`pending*`, `ok`, `inactive`, `linked`): set only by the
//!   registry core itself as a consequence of an operation.

use serde::{Deserialize, Serialize};

/// A status value on a domain, contact or host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusValue {
    /// Registrar forbids deletion.
    ClientDeleteProhibited,
    /// Registrar removed the domain from the zone.
    ClientHold,
    /// Registrar forbids renewal.
    ClientRenewProhibited,
    /// Registrar forbids transfer.
    ClientTransferProhibited,
    /// Registrar forbids updates.
    ClientUpdateProhibited,
    /// No nameservers delegated.
    Inactive,
    /// Referenced by another resource.
    Linked,
    /// No other status applies.
    Ok,
    /// Deleted, awaiting redemption expiry and purge.
    PendingDelete,
    /// A transfer request awaits resolution.
    PendingTransfer,
    /// Registry forbids deletion.
    ServerDeleteProhibited,
    /// Registry removed the domain from the zone.
    ServerHold,
    /// Registry forbids renewal.
    ServerRenewProhibited,
    /// Registry forbids transfer.
    ServerTransferProhibited,
    /// Registry forbids updates, including transfer.
    ServerUpdateProhibited,
}

impl StatusValue {
    /// Every status, in protocol order.
    pub const ALL: [StatusValue; 15] = [
        Self::ClientDeleteProhibited,
        Self::ClientHold,
        Self::ClientRenewProhibited,
        Self::ClientTransferProhibited,
        Self::ClientUpdateProhibited,
        Self::Inactive,
        Self::Linked,
        Self::Ok,
        Self::PendingDelete,
        Self::PendingTransfer,
        Self::ServerDeleteProhibited,
        Self::ServerHold,
        Self::ServerRenewProhibited,
        Self::ServerTransferProhibited,
        Self::ServerUpdateProhibited,
    ];

    /// The protocol name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientDeleteProhibited => "clientDeleteProhibited",
            Self::ClientHold => "clientHold",
            Self::ClientRenewProhibited => "clientRenewProhibited",
            Self::ClientTransferProhibited => "clientTransferProhibited",
            Self::ClientUpdateProhibited => "clientUpdateProhibited",
            Self::Inactive => "inactive",
            Self::Linked => "linked",
            Self::Ok => "ok",
            Self::PendingDelete => "pendingDelete",
            Self::PendingTransfer => "pendingTransfer",
            Self::ServerDeleteProhibited => "serverDeleteProhibited",
            Self::ServerHold => "serverHold",
            Self::ServerRenewProhibited => "serverRenewProhibited",
            Self::ServerTransferProhibited => "serverTransferProhibited",
            Self::ServerUpdateProhibited => "serverUpdateProhibited",
        }
    }

    /// Parse a protocol name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Whether a registrar may add or remove this status.
    pub fn is_client_settable(&self) -> bool {
        matches!(
            self,
            Self::ClientDeleteProhibited
                | Self::ClientHold
                | Self::ClientRenewProhibited
                | Self::ClientTransferProhibited
                | Self::ClientUpdateProhibited
        )
    }

    /// Whether the registry may add or remove this status as superuser.
    pub fn is_server_settable(&self) -> bool {
        matches!(
            self,
            Self::ServerDeleteProhibited
                | Self::ServerHold
                | Self::ServerRenewProhibited
                | Self::ServerTransferProhibited
                | Self::ServerUpdateProhibited
        )
    }
}

impl std::fmt::Display for StatusValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registrar-initiated operation subject to status prohibitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardedOperation {
    /// Delete the resource.
    Delete,
    /// Renew a domain.
    Renew,
    /// Request a transfer.
    Transfer,
    /// Change client statuses.
    Update,
}

impl GuardedOperation {
    /// Statuses whose presence blocks this operation.
    pub fn prohibited_by(&self) -> &'static [StatusValue] {
        match self {
            Self::Delete => &[
                StatusValue::ClientDeleteProhibited,
                StatusValue::ServerDeleteProhibited,
                StatusValue::PendingDelete,
            ],
            Self::Renew => &[
                StatusValue::ClientRenewProhibited,
                StatusValue::ServerRenewProhibited,
                StatusValue::PendingDelete,
                StatusValue::PendingTransfer,
            ],
            Self::Transfer => &[
                StatusValue::ClientTransferProhibited,
                StatusValue::ServerTransferProhibited,
                StatusValue::ServerUpdateProhibited,
                StatusValue::PendingDelete,
            ],
            Self::Update => &[
                StatusValue::ClientUpdateProhibited,
                StatusValue::ServerUpdateProhibited,
                StatusValue::PendingDelete,
            ],
        }
    }

    /// The canonical operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Renew => "renew",
            Self::Transfer => "transfer",
            Self::Update => "update",
        }
    }
}

impl std::fmt::Display for GuardedOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for status in StatusValue::ALL {
            assert_eq!(StatusValue::from_name(status.as_str()), Some(status));
        }
        assert_eq!(StatusValue::from_name("bogus"), None);
    }

    #[test]
    fn settable_groups_are_disjoint() {
        for status in StatusValue::ALL {
            assert!(!(status.is_client_settable() && status.is_server_settable()));
        }
        assert!(!StatusValue::PendingTransfer.is_client_settable());
        assert!(!StatusValue::PendingTransfer.is_server_settable());
    }

    #[test]
    fn transfer_blocked_by_server_update_and_pending_delete() {
        let blocked = GuardedOperation::Transfer.prohibited_by();
        assert!(blocked.contains(&StatusValue::ServerUpdateProhibited));
        assert!(blocked.contains(&StatusValue::PendingDelete));
        assert!(!blocked.contains(&StatusValue::ClientHold));
    }

    #[test]
    fn serde_uses_protocol_names() {
        let json = serde_json::to_string(&StatusValue::ServerHold).unwrap();
        assert_eq!(json, "\"serverHold\"");
    }
}
