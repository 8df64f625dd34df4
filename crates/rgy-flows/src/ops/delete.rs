//! # Delete
//!
//! Deleting voids every open billable grace period with a cancellation and
//! ends the auto-renew recurrence at the delete instant. A refunded
//! auto-renew also gives back the year it added. What happens next
//! depends on the ADD grace period:
//!
//! - **ADD grace open**: the domain is gone at once (`deletion_time = now`).
//! - **otherwise**: a `REDEMPTION` grace period opens and `pendingDelete`
//!   is set. Once redemption lapses the domain sits in pending delete, and
//!   `deletion_time = now + redemption + pending delete` closes its
//!   validity interval. The create charge stands.
//!
//! Contacts and hosts are deleted immediately. A pending transfer on the
//! resource is cancelled by the registry as part of the delete.

use std::collections::BTreeSet;

use rgy_billing::{BillingReason, Cancellation, GracePeriod, GracePeriodStatus, HistoryType, PollMessage};
use rgy_core::{ClientId, EntityKey, Timestamp};
use rgy_state::{GuardedOperation, StatusValue};

use crate::error::FlowError;
use crate::outcome::FlowOutcome;
use crate::resolver::ResolvedResource;
use crate::resource::{Domain, HasGracePeriods, Resource};

use super::transfer::server_cancel;
use super::{begin, history, verify_not_prohibited, verify_sponsor, FlowContext};

fn cancellation_reason(kind: GracePeriodStatus) -> Option<BillingReason> {
    match kind {
        GracePeriodStatus::Add => Some(BillingReason::Create),
        GracePeriodStatus::Renew => Some(BillingReason::Renew),
        GracePeriodStatus::AutoRenew => Some(BillingReason::AutoRenew),
        GracePeriodStatus::Transfer => Some(BillingReason::Transfer),
        GracePeriodStatus::Redemption => None,
    }
}

/// Delete a domain, contact or host.
pub fn delete_resource(
    ctx: &FlowContext<'_>,
    resolved: &ResolvedResource,
    client: &ClientId,
) -> Result<FlowOutcome, FlowError> {
    let now = resolved.as_of();
    let resource = resolved.resource();
    verify_sponsor(resource.as_epp(), client)?;
    verify_not_prohibited(resource.as_epp(), GuardedOperation::Delete, &BTreeSet::new())?;
    let entry = history(resolved, HistoryType::Delete, client);
    let (mut outcome, entry) = begin(resolved, resource.clone(), entry);

    let deleted = match resource {
        Resource::Domain(domain) => Resource::Domain(delete_domain(ctx, domain, &mut outcome, entry.key, now)?),
        Resource::Contact(contact) => {
            let mut deleted = contact.clone();
            server_cancel(&mut deleted, &mut outcome, entry.key, now)?;
            deleted.base.deletion_time = now;
            deleted.base.last_epp_update_time = Some(now);
            Resource::Contact(deleted)
        }
        Resource::Host(host) => {
            let mut deleted = host.clone();
            deleted.base.deletion_time = now;
            deleted.base.last_epp_update_time = Some(now);
            Resource::Host(deleted)
        }
    };
    outcome.resource = deleted;
    Ok(outcome)
}

fn delete_domain(
    ctx: &FlowContext<'_>,
    domain: &Domain,
    outcome: &mut FlowOutcome,
    parent: EntityKey,
    now: Timestamp,
) -> Result<Domain, FlowError> {
    let tld = ctx.tld(domain)?;
    let mut deleted = domain.clone();
    server_cancel(&mut deleted, outcome, parent, now)?;

    for grace in deleted.active_grace_periods(now) {
        if let Some(reason) = cancellation_reason(grace.kind) {
            outcome.save(Cancellation::for_grace_period(
                grace,
                reason,
                &deleted.base.name,
                now,
                parent,
            )?);
        }
    }
    if deleted
        .active_grace_period(GracePeriodStatus::AutoRenew, now)
        .is_some()
    {
        deleted.registration_expiration_time =
            deleted.anniversary_before(deleted.registration_expiration_time);
    }
    let immediate = deleted
        .active_grace_period(GracePeriodStatus::Add, now)
        .is_some();

    outcome.set_recurrence_end(deleted.autorenew_billing_event, now);
    outcome.set_recurrence_end(deleted.autorenew_poll_message, now);
    deleted.autorenew_end_time = now.min(deleted.registration_expiration_time);
    deleted.base.last_epp_update_time = Some(now);

    if immediate {
        deleted.base.deletion_time = now;
        deleted.grace_periods.clear();
        return Ok(deleted);
    }
    let redemption_end = now.plus(tld.redemption_grace_length);
    let purge = redemption_end.plus(tld.pending_delete_length);
    let sponsor = deleted.base.sponsor_client_id.clone();
    let purge_notice = PollMessage::notice(&sponsor, purge, "Domain deleted.", parent, None);
    deleted.grace_periods = [GracePeriod::redemption(redemption_end, sponsor)]
        .into_iter()
        .collect();
    deleted.base.status_values.insert(StatusValue::PendingDelete);
    deleted.base.deletion_time = purge;
    deleted.deletion_poll_message = Some(purge_notice.key());
    outcome.save(purge_notice);
    Ok(deleted)
}
