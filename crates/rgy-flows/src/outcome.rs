//! # Operation Outcomes
//!
//! An operation never touches storage. It returns the updated resource and
//! a list of [`EntityChange`]s for the store to apply atomically, together
//! with the [`Precondition`] the change was computed under.

use rgy_billing::{BillingEvent, Cancellation, HistoryEntry, OneTime, PollMessage, Recurring};
use rgy_core::{EntityKey, Timestamp};
use rgy_state::AllocationToken;

use crate::resolver::Precondition;
use crate::resource::Resource;

/// A storable side entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// A billing event.
    Billing(BillingEvent),
    /// A poll message.
    Poll(PollMessage),
    /// A history entry.
    History(HistoryEntry),
    /// An allocation token, saved after redemption.
    Token(AllocationToken),
}

impl From<BillingEvent> for Entity {
    fn from(event: BillingEvent) -> Self {
        Self::Billing(event)
    }
}

impl From<OneTime> for Entity {
    fn from(event: OneTime) -> Self {
        Self::Billing(BillingEvent::OneTime(event))
    }
}

impl From<Recurring> for Entity {
    fn from(event: Recurring) -> Self {
        Self::Billing(BillingEvent::Recurring(event))
    }
}

impl From<Cancellation> for Entity {
    fn from(event: Cancellation) -> Self {
        Self::Billing(BillingEvent::Cancellation(event))
    }
}

impl From<PollMessage> for Entity {
    fn from(message: PollMessage) -> Self {
        Self::Poll(message)
    }
}

impl From<HistoryEntry> for Entity {
    fn from(entry: HistoryEntry) -> Self {
        Self::History(entry)
    }
}

impl From<AllocationToken> for Entity {
    fn from(token: AllocationToken) -> Self {
        Self::Token(token)
    }
}

/// One change to a side entity.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityChange {
    /// Insert or replace.
    Save(Entity),
    /// Remove a billing event or poll message.
    Delete(EntityKey),
    /// Move the end of a `Recurring` event or autorenew poll message.
    SetRecurrenceEnd {
        /// The recurrence.
        key: EntityKey,
        /// New end, exclusive.
        end: Timestamp,
    },
}

/// Everything an operation decided.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowOutcome {
    /// The resource as it should be stored.
    pub resource: Resource,
    /// Revision the outcome was computed from. `None` for creates.
    pub precondition: Option<Precondition>,
    /// Side effects, applied in order.
    pub changes: Vec<EntityChange>,
}

impl FlowOutcome {
    /// An outcome with no side effects yet.
    pub fn new(resource: Resource, precondition: Option<Precondition>) -> Self {
        Self {
            resource,
            precondition,
            changes: Vec::new(),
        }
    }

    /// Queue a save.
    pub fn save(&mut self, entity: impl Into<Entity>) {
        self.changes.push(EntityChange::Save(entity.into()));
    }

    /// Queue a delete.
    pub fn delete(&mut self, key: EntityKey) {
        self.changes.push(EntityChange::Delete(key));
    }

    /// Queue a recurrence end change.
    pub fn set_recurrence_end(&mut self, key: EntityKey, end: Timestamp) {
        self.changes.push(EntityChange::SetRecurrenceEnd { key, end });
    }

    /// Saved billing events.
    pub fn billing_events(&self) -> impl Iterator<Item = &BillingEvent> {
        self.changes.iter().filter_map(|change| match change {
            EntityChange::Save(Entity::Billing(event)) => Some(event),
            _ => None,
        })
    }

    /// Saved poll messages.
    pub fn poll_messages(&self) -> impl Iterator<Item = &PollMessage> {
        self.changes.iter().filter_map(|change| match change {
            EntityChange::Save(Entity::Poll(message)) => Some(message),
            _ => None,
        })
    }

    /// Saved history entries.
    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.changes.iter().filter_map(|change| match change {
            EntityChange::Save(Entity::History(entry)) => Some(entry),
            _ => None,
        })
    }

    /// Deleted keys.
    pub fn deleted_keys(&self) -> impl Iterator<Item = EntityKey> + '_ {
        self.changes.iter().filter_map(|change| match change {
            EntityChange::Delete(key) => Some(*key),
            _ => None,
        })
    }

    /// Recurrence end changes.
    pub fn recurrence_ends(&self) -> impl Iterator<Item = (EntityKey, Timestamp)> + '_ {
        self.changes.iter().filter_map(|change| match change {
            EntityChange::SetRecurrenceEnd { key, end } => Some((*key, *end)),
            _ => None,
        })
    }
}
