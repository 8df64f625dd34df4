//! # History Entries
//!
//! One entry per committed mutation. Billing events and poll messages
//! produced by the mutation name the entry as their parent.

use serde::{Deserialize, Serialize};

use rgy_core::{ClientId, EntityKey, Timestamp};

/// What a mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryType {
    /// Resource created.
    Create,
    /// Domain renewed.
    Renew,
    /// Delete requested (immediate or into redemption).
    Delete,
    /// Domain restored out of redemption.
    Restore,
    /// Transfer requested.
    TransferRequest,
    /// Transfer approved by the losing registrar.
    TransferApprove,
    /// Transfer rejected by the losing registrar.
    TransferReject,
    /// Transfer cancelled by the gaining registrar.
    TransferCancel,
    /// Client statuses changed.
    Update,
    /// Server statuses changed by the registry.
    ServerStatusUpdate,
}

impl HistoryType {
    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Renew => "RENEW",
            Self::Delete => "DELETE",
            Self::Restore => "RESTORE",
            Self::TransferRequest => "TRANSFER_REQUEST",
            Self::TransferApprove => "TRANSFER_APPROVE",
            Self::TransferReject => "TRANSFER_REJECT",
            Self::TransferCancel => "TRANSFER_CANCEL",
            Self::Update => "UPDATE",
            Self::ServerStatusUpdate => "SERVER_STATUS_UPDATE",
        }
    }
}

impl std::fmt::Display for HistoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Key of this entry.
    pub key: EntityKey,
    /// Mutated resource.
    pub resource_key: EntityKey,
    /// What happened.
    pub history_type: HistoryType,
    /// Registrar that acted, or the sponsor for registry actions.
    pub client_id: ClientId,
    /// When the mutation happened.
    pub modification_time: Timestamp,
    /// Years purchased, zero when not applicable.
    pub period_years: u32,
    /// Whether the registry acted as superuser.
    pub by_superuser: bool,
}

impl HistoryEntry {
    /// A new entry with a fresh key.
    pub fn new(
        resource_key: EntityKey,
        history_type: HistoryType,
        client_id: &ClientId,
        modification_time: Timestamp,
    ) -> Self {
        Self {
            key: EntityKey::new(),
            resource_key,
            history_type,
            client_id: client_id.clone(),
            modification_time,
            period_years: 0,
            by_superuser: false,
        }
    }

    /// Record the purchased period.
    pub fn with_period(mut self, years: u32) -> Self {
        self.period_years = years;
        self
    }

    /// Mark as a registry action.
    pub fn by_superuser(mut self) -> Self {
        self.by_superuser = true;
        self
    }
}
