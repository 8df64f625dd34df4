//! # Resolver
//!
//! Nothing in the registry runs on a timer. Grace periods close, deletes
//! progress through redemption and pending delete, anniversaries renew and
//! pending transfers approve themselves purely as a function of stored
//! timestamps and the caller's `now`:
//!
//! ```text
//! stored ──resolve(now)──▶ ResolvedResource ──operation──▶ FlowOutcome ──commit──▶ stored'
//! ```
//!
//! [`resolve`] is pure and may be called any number of times on read paths.
//! Its result records the revision it was computed from; the store rejects
//! a commit whose revision no longer matches. A resolved view is never
//! trusted as already applied: every write resolves a freshly loaded
//! resource at the write's own `now`.
//!
//! ## Projection order
//!
//! 1. A pending transfer whose window has lapsed is applied as
//!    `serverApproved` at its expiration instant, using the entities
//!    pre-built when it was requested.
//! 2. Anniversaries at or before `now` and before `autorenew_end_time` roll
//!    the expiration forward; the latest opens an `AUTO_RENEW` grace period
//!    while it is within the auto-renew grace length.
//! 3. Grace periods closed at `now` are dropped.

use chrono::Duration;
use tracing::debug;

use rgy_billing::{GracePeriod, GracePeriodStatus};
use rgy_core::{EntityKey, Timestamp};
use rgy_state::{StatusValue, TransferData, TransferStatus};

use crate::config::{RegistryConfig, TldConfig};
use crate::resource::{Contact, Domain, Resource};

/// The stored revision an outcome was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Precondition {
    /// Resource key.
    pub key: EntityKey,
    /// Revision read.
    pub revision: u64,
}

/// A resource as it effectively is at `as_of`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedResource {
    resource: Resource,
    as_of: Timestamp,
    precondition: Precondition,
}

impl ResolvedResource {
    /// The effective resource.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// The instant the view was computed for.
    pub fn as_of(&self) -> Timestamp {
        self.as_of
    }

    /// The stored revision the view was computed from.
    pub fn precondition(&self) -> Precondition {
        self.precondition
    }

    /// The effective resource, discarding the precondition.
    pub fn into_resource(self) -> Resource {
        self.resource
    }
}

/// Resolve a stored resource at `now`.
pub fn resolve(stored: &Resource, now: Timestamp, config: &RegistryConfig) -> ResolvedResource {
    ResolvedResource {
        resource: project(stored, now, config),
        as_of: now,
        precondition: Precondition {
            key: stored.key(),
            revision: stored.base().revision,
        },
    }
}

/// The effective resource at `now`. Pure and idempotent.
pub fn project(stored: &Resource, now: Timestamp, config: &RegistryConfig) -> Resource {
    match stored {
        Resource::Domain(domain) => {
            Resource::Domain(project_domain(domain, now, config.tld_or_default(&domain.tld)))
        }
        Resource::Contact(contact) => Resource::Contact(project_contact(contact, now)),
        Resource::Host(host) => Resource::Host(host.clone()),
    }
}

/// The transfer data after automatic approval, if the window lapsed by `now`.
fn lapsed_transfer(transfer: Option<&TransferData>, now: Timestamp) -> Option<(TransferData, TransferData)> {
    let transfer = transfer.filter(|t| t.is_pending() && now >= t.pending_transfer_expiration_time)?;
    let approved = transfer
        .resolved(TransferStatus::ServerApproved, transfer.pending_transfer_expiration_time)
        .ok()?;
    Some((transfer.clone(), approved))
}

pub(crate) fn project_domain(stored: &Domain, now: Timestamp, tld: &TldConfig) -> Domain {
    let mut domain = stored.clone();
    if let Some((pending, approved)) = lapsed_transfer(stored.transfer_data.as_ref(), now) {
        apply_server_approval(&mut domain, &pending, approved, tld.transfer_grace_length);
    }
    roll_auto_renew(&mut domain, now, tld.auto_renew_grace_length);
    domain.grace_periods.retain(|g| g.is_active_at(now));
    domain
}

fn apply_server_approval(
    domain: &mut Domain,
    pending: &TransferData,
    approved: TransferData,
    transfer_grace: Duration,
) {
    let at = pending.pending_transfer_expiration_time;
    debug!(
        resource = %domain.base.name,
        gaining = %pending.gaining_client_id,
        at = %at,
        "projecting automatic transfer approval"
    );
    if let Some(expiration) = pending.transferred_registration_expiration_time {
        domain.registration_expiration_time = expiration;
        domain.autorenew_anchor_time = expiration;
    }
    if let Some(event) = pending.server_approve_autorenew_event {
        domain.autorenew_billing_event = event;
    }
    if let Some(message) = pending.server_approve_autorenew_poll_message {
        domain.autorenew_poll_message = message;
    }
    domain.autorenew_end_time = Timestamp::end_of_time();
    domain.grace_periods = pending
        .server_approve_billing_event
        .map(|billing_event| GracePeriod {
            kind: GracePeriodStatus::Transfer,
            expiration_time: at.plus(transfer_grace),
            client_id: pending.gaining_client_id.clone(),
            billing_event: Some(billing_event),
        })
        .into_iter()
        .collect();
    domain.base.sponsor_client_id = pending.gaining_client_id.clone();
    domain.base.last_transfer_time = Some(at);
    domain.base.status_values.remove(&StatusValue::PendingTransfer);
    domain.transfer_data = Some(approved);
}

/// Roll the expiration past every anniversary at or before `at` that the
/// recurrence still covers. Anniversaries count whole years from the
/// recurrence anchor. Returns the latest anniversary rolled.
pub(crate) fn roll_auto_renew(domain: &mut Domain, at: Timestamp, auto_renew_grace: Duration) -> Option<Timestamp> {
    let mut latest = None;
    for years in 0.. {
        let anniversary = domain.anniversary(years);
        if anniversary > at || anniversary >= domain.autorenew_end_time || anniversary.is_end_of_time() {
            break;
        }
        if anniversary >= domain.registration_expiration_time {
            latest = Some(anniversary);
            domain.registration_expiration_time = domain.anniversary(years + 1);
        }
    }
    let anniversary = latest?;
    debug!(
        resource = %domain.base.name,
        anniversary = %anniversary,
        expiration = %domain.registration_expiration_time,
        "projecting auto-renew"
    );
    let grace_end = anniversary.plus(auto_renew_grace);
    if at < grace_end {
        domain.grace_periods.insert(GracePeriod::auto_renew_from_key(
            domain.autorenew_billing_event,
            domain.base.sponsor_client_id.clone(),
            grace_end,
        ));
    }
    Some(anniversary)
}

fn project_contact(stored: &Contact, now: Timestamp) -> Contact {
    let mut contact = stored.clone();
    if let Some((pending, approved)) = lapsed_transfer(stored.transfer_data.as_ref(), now) {
        debug!(
            resource = %contact.base.name,
            gaining = %pending.gaining_client_id,
            "projecting automatic contact transfer approval"
        );
        contact.base.sponsor_client_id = pending.gaining_client_id.clone();
        contact.base.last_transfer_time = Some(pending.pending_transfer_expiration_time);
        contact.base.status_values.remove(&StatusValue::PendingTransfer);
        contact.transfer_data = Some(approved);
    }
    contact
}
