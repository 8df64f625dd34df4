//! Restore out of redemption.

use std::collections::BTreeSet;

use rgy_billing::{BillingReason, GracePeriodStatus, HistoryType, OneTime, PollMessage, Recurring};
use rgy_core::{ClientId, EntityKey, Money, Timestamp};
use rgy_state::StatusValue;

use crate::error::FlowError;
use crate::outcome::FlowOutcome;
use crate::pricing::PricedAction;
use crate::resolver::ResolvedResource;
use crate::resource::{DeletionPhase, Resource};

use super::{begin, history, require_domain, verify_sponsor, FlowContext};

/// Bring a deleted domain back while its redemption window is open.
///
/// Bills a restore fee and a one-year renewal, both final immediately.
/// The registration gains a year from its expiration, or from now if that
/// has already passed, and a fresh auto-renew recurrence starts there.
pub fn restore_domain(
    ctx: &FlowContext<'_>,
    resolved: &ResolvedResource,
    client: &ClientId,
) -> Result<FlowOutcome, FlowError> {
    let now = resolved.as_of();
    let domain = require_domain(resolved, "restore")?;
    ctx.tld(domain)?;
    verify_sponsor(domain, client)?;
    if domain.deletion_phase(now) != DeletionPhase::Redemption {
        return Err(FlowError::DomainNotInRedemption {
            resource: domain.base.name.clone(),
        });
    }

    let entry = history(resolved, HistoryType::Restore, client).with_period(1);
    let charge = |reason: BillingReason, cost: Money, period_years: u32| OneTime {
        key: EntityKey::new(),
        reason,
        target_id: domain.base.name.clone(),
        client_id: client.clone(),
        cost,
        event_time: now,
        billing_time: now,
        period_years,
        parent: entry.key,
        flags: BTreeSet::new(),
    };
    let restore_fee = charge(
        BillingReason::Restore,
        ctx.pricing.cost(PricedAction::Restore, resolved.resource(), 0, now)?,
        0,
    );
    let renewal = charge(
        BillingReason::Renew,
        ctx.pricing.cost(PricedAction::Renew, resolved.resource(), 1, now)?,
        1,
    );
    let expiration = domain.registration_expiration_time.max(now).plus_years(1);
    let recurring = Recurring::auto_renew(&domain.base.name, client, expiration, entry.key);
    let autorenew_poll = PollMessage::autorenew(client, &domain.base.name, expiration, entry.key);

    let mut restored = domain.clone();
    restored.registration_expiration_time = expiration;
    restored.autorenew_billing_event = recurring.key;
    restored.autorenew_anchor_time = expiration;
    restored.autorenew_poll_message = autorenew_poll.key();
    restored.autorenew_end_time = Timestamp::end_of_time();
    restored
        .grace_periods
        .retain(|g| g.kind != GracePeriodStatus::Redemption);
    restored.base.status_values.remove(&StatusValue::PendingDelete);
    restored.base.deletion_time = Timestamp::end_of_time();
    restored.base.last_epp_update_time = Some(now);
    restored.deletion_poll_message = None;

    let (mut outcome, _) = begin(resolved, Resource::Domain(restored), entry);
    if let Some(purge_notice) = domain.deletion_poll_message {
        outcome.delete(purge_notice);
    }
    outcome.save(restore_fee);
    outcome.save(renewal);
    outcome.save(recurring);
    outcome.save(autorenew_poll);
    Ok(outcome)
}
