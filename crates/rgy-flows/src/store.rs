//! # In-Memory Transactional Store
//!
//! Holds resources and their side entities behind one `parking_lot`
//! lock, so a commit is atomic with respect to every reader. Resources are
//! indexed by key and, through a foreign-key index, by `(kind, name)`; a name
//! may map to several keys over time, and [`InMemoryStore::load_by_name`]
//! picks the one whose validity interval contains the requested instant.
//!
//! [`InMemoryStore::commit`] is optimistic: an outcome carries the revision
//! it was computed from, and a commit against any other revision fails with
//! [`FlowError::Contention`] without applying anything.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use rgy_billing::{BillingEvent, HistoryEntry, PollMessage};
use rgy_core::{ClientId, EntityKey, Timestamp};
use rgy_state::AllocationToken;

use crate::error::FlowError;
use crate::outcome::{Entity, EntityChange, FlowOutcome};
use crate::resource::{Resource, ResourceKind};

#[derive(Debug, Default)]
struct StoreData {
    resources: HashMap<EntityKey, Resource>,
    names: HashMap<(ResourceKind, String), Vec<EntityKey>>,
    billing: HashMap<EntityKey, BillingEvent>,
    polls: HashMap<EntityKey, PollMessage>,
    history: Vec<HistoryEntry>,
    tokens: HashMap<String, AllocationToken>,
}

impl StoreData {
    fn live_by_name(&self, kind: ResourceKind, name: &str, at: Timestamp) -> Option<&Resource> {
        self.names
            .get(&(kind, name.to_string()))?
            .iter()
            .filter_map(|key| self.resources.get(key))
            .find(|resource| resource.base().exists_at(at))
    }

    fn check_precondition(&self, outcome: &FlowOutcome) -> Result<(), FlowError> {
        let resource = &outcome.resource;
        match outcome.precondition {
            Some(precondition) => {
                let stored = self
                    .resources
                    .get(&precondition.key)
                    .ok_or(FlowError::EntityNotFound {
                        key: precondition.key,
                    })?;
                let found = stored.base().revision;
                if found != precondition.revision {
                    return Err(FlowError::Contention {
                        resource: resource.name().to_string(),
                        expected: precondition.revision,
                        found,
                    });
                }
            }
            None => {
                let at = resource.base().creation_time;
                if let Some(existing) = self.live_by_name(resource.kind(), resource.name(), at) {
                    return Err(FlowError::Contention {
                        resource: resource.name().to_string(),
                        expected: 0,
                        found: existing.base().revision,
                    });
                }
            }
        }
        Ok(())
    }

    fn check_targets(&self, changes: &[EntityChange]) -> Result<(), FlowError> {
        for change in changes {
            let missing = match change {
                EntityChange::Save(Entity::Token(token)) => {
                    let already_redeemed = self
                        .tokens
                        .get(&token.token)
                        .is_some_and(|stored| stored.redemption.is_some());
                    if token.redemption.is_some() && already_redeemed {
                        return Err(FlowError::Contention {
                            resource: token.token.clone(),
                            expected: 0,
                            found: 1,
                        });
                    }
                    None
                }
                EntityChange::Save(_) => None,
                EntityChange::Delete(key) => {
                    (!self.billing.contains_key(key) && !self.polls.contains_key(key)).then_some(*key)
                }
                EntityChange::SetRecurrenceEnd { key, .. } => {
                    let recurring = matches!(self.billing.get(key), Some(BillingEvent::Recurring(_)))
                        || matches!(self.polls.get(key), Some(PollMessage::Autorenew(_)));
                    (!recurring).then_some(*key)
                }
            };
            if let Some(key) = missing {
                return Err(FlowError::EntityNotFound { key });
            }
        }
        Ok(())
    }

    fn apply(&mut self, change: EntityChange) {
        match change {
            EntityChange::Save(Entity::Billing(event)) => {
                self.billing.insert(event.key(), event);
            }
            EntityChange::Save(Entity::Poll(message)) => {
                self.polls.insert(message.key(), message);
            }
            EntityChange::Save(Entity::History(entry)) => self.history.push(entry),
            EntityChange::Save(Entity::Token(token)) => {
                self.tokens.insert(token.token.clone(), token);
            }
            EntityChange::Delete(key) => {
                self.billing.remove(&key);
                self.polls.remove(&key);
            }
            EntityChange::SetRecurrenceEnd { key, end } => {
                if let Some(BillingEvent::Recurring(recurring)) = self.billing.get_mut(&key) {
                    recurring.recurrence_end_time = end;
                }
                if let Some(PollMessage::Autorenew(poll)) = self.polls.get_mut(&key) {
                    poll.autorenew_end_time = end;
                }
            }
        }
    }
}

/// Shared, clone-friendly store. Clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    data: Arc<RwLock<StoreData>>,
}

impl InMemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored resource with `key`, as last committed.
    pub fn load_by_key(&self, key: EntityKey) -> Option<Resource> {
        self.data.read().resources.get(&key).cloned()
    }

    /// The resource named `name` whose validity interval contains `as_of`.
    pub fn load_by_name(&self, kind: ResourceKind, name: &str, as_of: Timestamp) -> Option<Resource> {
        self.data.read().live_by_name(kind, name, as_of).cloned()
    }

    /// A stored billing event.
    pub fn billing_event(&self, key: EntityKey) -> Option<BillingEvent> {
        self.data.read().billing.get(&key).cloned()
    }

    /// A stored poll message.
    pub fn poll_message(&self, key: EntityKey) -> Option<PollMessage> {
        self.data.read().polls.get(&key).cloned()
    }

    /// Every billing event for the resource named `target_id`.
    pub fn billing_events_for(&self, target_id: &str) -> Vec<BillingEvent> {
        let data = self.data.read();
        let mut events: Vec<_> = data
            .billing
            .values()
            .filter(|event| event.target_id() == target_id)
            .cloned()
            .collect();
        events.sort_by_key(|event| (event.event_time(), event.key()));
        events
    }

    /// Poll messages visible to `client` at `now`, oldest first.
    pub fn poll_messages_for(&self, client: &ClientId, now: Timestamp) -> Vec<PollMessage> {
        let data = self.data.read();
        let mut messages: Vec<_> = data
            .polls
            .values()
            .filter(|message| message.client_id() == client && message.is_visible_at(now))
            .cloned()
            .collect();
        messages.sort_by_key(|message| (message.event_time(), message.key()));
        messages
    }

    /// History of one resource in commit order.
    pub fn history_for(&self, resource_key: EntityKey) -> Vec<HistoryEntry> {
        self.data
            .read()
            .history
            .iter()
            .filter(|entry| entry.resource_key == resource_key)
            .cloned()
            .collect()
    }

    /// A stored allocation token.
    pub fn token(&self, token: &str) -> Option<AllocationToken> {
        self.data.read().tokens.get(token).cloned()
    }

    /// Register or replace an allocation token.
    pub fn put_token(&self, token: AllocationToken) {
        self.data.write().tokens.insert(token.token.clone(), token);
    }

    /// Apply an outcome atomically and return the stored resource.
    ///
    /// # Errors
    ///
    /// - [`FlowError::Contention`] if the resource's revision moved since
    ///   the outcome was computed, or if a create races another live
    ///   resource with the same name.
    /// - [`FlowError::Contention`] if a single-use token was redeemed by a
    ///   concurrent commit.
    /// - [`FlowError::EntityNotFound`] if a delete or recurrence change
    ///   targets a missing entity. Nothing is applied in either case.
    pub fn commit(&self, outcome: FlowOutcome) -> Result<Resource, FlowError> {
        let mut data = self.data.write();
        data.check_precondition(&outcome)?;
        data.check_targets(&outcome.changes)?;

        let FlowOutcome {
            mut resource,
            precondition,
            changes,
        } = outcome;
        let revision = precondition.map_or(0, |p| p.revision) + 1;
        resource.base_mut().revision = revision;
        for change in changes {
            data.apply(change);
        }
        if precondition.is_none() {
            data.names
                .entry((resource.kind(), resource.name().to_string()))
                .or_default()
                .push(resource.key());
        }
        data.resources.insert(resource.key(), resource.clone());
        Ok(resource)
    }
}
