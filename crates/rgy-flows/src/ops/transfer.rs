//! # Transfers
//!
//! A request records a pending attempt and pre-builds everything automatic
//! approval will need: the gainer's `TRANSFER` charge, the gainer's new
//! recurrence and autorenew poll message, approval notices for both
//! registrars and, if an `AUTO_RENEW` grace period will still be open at the
//! automatic instant, a cancellation of that anniversary. Their keys go into
//! `server_approve_entity_keys`. The loser's recurrence is cut off at the
//! automatic instant.
//!
//! If nobody acts, the resolver applies the approval once the window lapses
//! and the pre-built entities simply take effect. Any explicit resolution
//! deletes them:
//!
//! - **approve** (loser): builds the same entities dated now.
//! - **reject** (loser) / **cancel** (gainer): no charge; the loser's
//!   recurrence runs open-ended again.
//! - **delete** of the resource: `serverCancelled`, both parties notified.
//!
//! ## Subsumption
//!
//! The new expiration is computed once from the domain as projected to the
//! transfer instant. An anniversary inside the pending window rolls the
//! projected expiration forward and opens an `AUTO_RENEW` grace period; the
//! extension then starts from one year earlier and that anniversary is
//! voided, so the gainer pays for the transfer years exactly once.

use std::collections::BTreeSet;

use rgy_billing::{
    BillingReason, Cancellation, GracePeriod, GracePeriodStatus, HistoryType, OneTime, PollMessage,
    Recurring, TransferResponse,
};
use rgy_core::{ClientId, EntityKey, Timestamp};
use rgy_state::{GuardedOperation, StatusValue, TransferData, TransferStatus};

use crate::config::TldConfig;
use crate::error::FlowError;
use crate::outcome::FlowOutcome;
use crate::pricing::PricedAction;
use crate::resolver::{project_domain, ResolvedResource};
use crate::resource::{Contact, Domain, HasGracePeriods, HasTransferData, Resource};

use super::{begin, history, verify_not_prohibited, FlowContext};

fn response(name: &str, data: &TransferData, status: TransferStatus, at: Timestamp) -> TransferResponse {
    TransferResponse {
        resource_name: name.to_string(),
        status,
        gaining_client_id: data.gaining_client_id.clone(),
        losing_client_id: data.losing_client_id.clone(),
        transfer_request_time: data.transfer_request_time,
        pending_transfer_expiration_time: at,
        extended_registration_expiration_time: data.transferred_registration_expiration_time,
    }
}

/// Expiration after adding `years` to a domain as it stands at `at`.
///
/// An open `AUTO_RENEW` grace period means the latest anniversary already
/// added a year that the transfer replaces.
fn transferred_expiration(domain: &Domain, years: u32, at: Timestamp, tld: &TldConfig) -> Timestamp {
    let base = if domain
        .active_grace_period(GracePeriodStatus::AutoRenew, at)
        .is_some()
    {
        domain.anniversary_before(domain.registration_expiration_time)
    } else {
        domain.registration_expiration_time
    };
    base.plus_years(years)
        .min(at.plus_years(tld.max_registration_years))
}

/// Entities that make the gainer the sponsor at `at`.
struct GainerEntities {
    charge: OneTime,
    autorenew_cancellation: Option<Cancellation>,
    recurring: Recurring,
    autorenew_poll: PollMessage,
    grace_period: GracePeriod,
}

#[allow(clippy::too_many_arguments)]
fn gainer_entities(
    ctx: &FlowContext<'_>,
    domain: &Domain,
    gaining: &ClientId,
    years: u32,
    expiration: Timestamp,
    at: Timestamp,
    parent: EntityKey,
    tld: &TldConfig,
) -> Result<GainerEntities, FlowError> {
    let name = &domain.base.name;
    let cost = ctx
        .pricing
        .cost(PricedAction::Transfer, &Resource::Domain(domain.clone()), years, at)?;
    let charge = OneTime {
        key: EntityKey::new(),
        reason: BillingReason::Transfer,
        target_id: name.clone(),
        client_id: gaining.clone(),
        cost,
        event_time: at,
        billing_time: at.plus(tld.transfer_grace_length),
        period_years: years,
        parent,
        flags: BTreeSet::new(),
    };
    let autorenew_cancellation = domain
        .active_grace_period(GracePeriodStatus::AutoRenew, at)
        .map(|grace| Cancellation::for_grace_period(grace, BillingReason::AutoRenew, name, at, parent))
        .transpose()?;
    let grace_period = GracePeriod::for_one_time(GracePeriodStatus::Transfer, &charge)?;
    Ok(GainerEntities {
        recurring: Recurring::auto_renew(name, gaining, expiration, parent),
        autorenew_poll: PollMessage::autorenew(gaining, name, expiration, parent),
        charge,
        autorenew_cancellation,
        grace_period,
    })
}

/// Request a transfer of a domain or contact to `gaining`.
///
/// `period_years` applies to domains and is capped at the TLD's maximum
/// transfer extension; contacts ignore it.
pub fn request_transfer(
    ctx: &FlowContext<'_>,
    resolved: &ResolvedResource,
    gaining: &ClientId,
    period_years: u32,
) -> Result<FlowOutcome, FlowError> {
    let now = resolved.as_of();
    let resource = resolved.resource();
    let transferable = resource
        .as_transferable()
        .ok_or(FlowError::UnsupportedResourceKind {
            kind: resource.kind(),
            operation: "transfer",
        })?;
    if transferable.pending_transfer_at(now).is_some() {
        return Err(FlowError::TransferAlreadyPending {
            resource: resource.name().to_string(),
        });
    }
    if transferable.sponsor() == gaining {
        return Err(FlowError::ObjectAlreadySponsored {
            resource: resource.name().to_string(),
            client: gaining.clone(),
        });
    }
    verify_not_prohibited(resource.as_epp(), GuardedOperation::Transfer, &BTreeSet::new())?;
    match resource {
        Resource::Domain(domain) => request_domain_transfer(ctx, resolved, domain, gaining, period_years),
        Resource::Contact(contact) => request_contact_transfer(ctx, resolved, contact, gaining),
        Resource::Host(_) => Err(FlowError::UnsupportedResourceKind {
            kind: resource.kind(),
            operation: "transfer",
        }),
    }
}

fn request_domain_transfer(
    ctx: &FlowContext<'_>,
    resolved: &ResolvedResource,
    domain: &Domain,
    gaining: &ClientId,
    period_years: u32,
) -> Result<FlowOutcome, FlowError> {
    let now = resolved.as_of();
    let tld = ctx.tld(domain)?;
    if period_years == 0 {
        return Err(FlowError::InvalidPeriod { years: period_years });
    }
    let years = period_years.min(tld.max_transfer_extension_years);
    let automatic = now.plus(tld.automatic_transfer_length);
    let losing = domain.base.sponsor_client_id.clone();

    let mut cut_off = domain.clone();
    cut_off.autorenew_end_time = automatic;
    let at_transfer = project_domain(&cut_off, automatic, tld);
    let expiration = transferred_expiration(&at_transfer, years, automatic, tld);

    let entry = history(resolved, HistoryType::TransferRequest, gaining).with_period(years);
    let gainer = gainer_entities(ctx, &at_transfer, gaining, years, expiration, automatic, entry.key, tld)?;

    let mut pending = TransferData {
        status: TransferStatus::Pending,
        gaining_client_id: gaining.clone(),
        losing_client_id: losing.clone(),
        transfer_request_time: now,
        pending_transfer_expiration_time: automatic,
        transfer_period_years: years,
        transferred_registration_expiration_time: Some(expiration),
        server_approve_entity_keys: BTreeSet::new(),
        server_approve_billing_event: Some(gainer.charge.key),
        server_approve_autorenew_event: Some(gainer.recurring.key),
        server_approve_autorenew_poll_message: Some(gainer.autorenew_poll.key()),
    };
    let approved = response(&domain.base.name, &pending, TransferStatus::ServerApproved, automatic);
    let gainer_notice = PollMessage::notice(
        gaining,
        automatic,
        "Transfer server approved.",
        entry.key,
        Some(approved.clone()),
    );
    let loser_notice = PollMessage::notice(
        &losing,
        automatic,
        "Transfer server approved.",
        entry.key,
        Some(approved),
    );
    pending.server_approve_entity_keys = [
        gainer.charge.key,
        gainer.recurring.key,
        gainer.autorenew_poll.key(),
        gainer_notice.key(),
        loser_notice.key(),
    ]
    .into_iter()
    .chain(gainer.autorenew_cancellation.as_ref().map(|c| c.key))
    .collect();
    pending.check_invariants(tld.automatic_transfer_length)?;
    let request_notice = PollMessage::notice(
        &losing,
        now,
        "Transfer requested.",
        entry.key,
        Some(response(&domain.base.name, &pending, TransferStatus::Pending, automatic)),
    );

    let mut requested = domain.clone();
    requested.base.status_values.insert(StatusValue::PendingTransfer);
    requested.base.last_epp_update_time = Some(now);
    requested.autorenew_end_time = automatic;
    requested.transfer_data = Some(pending);

    let (mut outcome, _) = begin(resolved, Resource::Domain(requested), entry);
    outcome.set_recurrence_end(domain.autorenew_billing_event, automatic);
    outcome.set_recurrence_end(domain.autorenew_poll_message, automatic);
    outcome.save(gainer.charge);
    if let Some(cancellation) = gainer.autorenew_cancellation {
        outcome.save(cancellation);
    }
    outcome.save(gainer.recurring);
    outcome.save(gainer.autorenew_poll);
    outcome.save(gainer_notice);
    outcome.save(loser_notice);
    outcome.save(request_notice);
    Ok(outcome)
}

fn request_contact_transfer(
    ctx: &FlowContext<'_>,
    resolved: &ResolvedResource,
    contact: &Contact,
    gaining: &ClientId,
) -> Result<FlowOutcome, FlowError> {
    let now = resolved.as_of();
    let length = ctx.config.contact_automatic_transfer_length;
    let automatic = now.plus(length);
    let losing = contact.base.sponsor_client_id.clone();
    let entry = history(resolved, HistoryType::TransferRequest, gaining);

    let mut pending = TransferData {
        status: TransferStatus::Pending,
        gaining_client_id: gaining.clone(),
        losing_client_id: losing.clone(),
        transfer_request_time: now,
        pending_transfer_expiration_time: automatic,
        transfer_period_years: 0,
        transferred_registration_expiration_time: None,
        server_approve_entity_keys: BTreeSet::new(),
        server_approve_billing_event: None,
        server_approve_autorenew_event: None,
        server_approve_autorenew_poll_message: None,
    };
    let approved = response(&contact.base.name, &pending, TransferStatus::ServerApproved, automatic);
    let gainer_notice =
        PollMessage::notice(gaining, automatic, "Transfer server approved.", entry.key, Some(approved.clone()));
    let loser_notice =
        PollMessage::notice(&losing, automatic, "Transfer server approved.", entry.key, Some(approved));
    pending.server_approve_entity_keys = [gainer_notice.key(), loser_notice.key()].into_iter().collect();
    pending.check_invariants(length)?;
    let request_notice = PollMessage::notice(
        &losing,
        now,
        "Transfer requested.",
        entry.key,
        Some(response(&contact.base.name, &pending, TransferStatus::Pending, automatic)),
    );

    let mut requested = contact.clone();
    requested.base.status_values.insert(StatusValue::PendingTransfer);
    requested.base.last_epp_update_time = Some(now);
    requested.transfer_data = Some(pending);

    let (mut outcome, _) = begin(resolved, Resource::Contact(requested), entry);
    outcome.save(gainer_notice);
    outcome.save(loser_notice);
    outcome.save(request_notice);
    Ok(outcome)
}

/// The pending attempt an explicit resolution acts on.
fn pending_transfer(resolved: &ResolvedResource, operation: &'static str) -> Result<TransferData, FlowError> {
    let resource = resolved.resource();
    let transferable = resource
        .as_transferable()
        .ok_or(FlowError::UnsupportedResourceKind {
            kind: resource.kind(),
            operation,
        })?;
    match transferable.transfer_data() {
        Some(data) if data.is_pending_at(resolved.as_of()) => Ok(data.clone()),
        other => Err(FlowError::TransferAlreadyResolved {
            resource: resource.name().to_string(),
            status: other.map(|data| data.status),
        }),
    }
}

fn require_party(
    resolved: &ResolvedResource,
    client: &ClientId,
    party: &ClientId,
) -> Result<(), FlowError> {
    if client != party {
        return Err(FlowError::NotAuthorizedForTransferAction {
            resource: resolved.resource().name().to_string(),
            client: client.clone(),
        });
    }
    Ok(())
}

/// Approve a pending transfer. Only the losing registrar may approve.
pub fn approve_transfer(
    ctx: &FlowContext<'_>,
    resolved: &ResolvedResource,
    client: &ClientId,
) -> Result<FlowOutcome, FlowError> {
    let now = resolved.as_of();
    let pending = pending_transfer(resolved, "transfer approve")?;
    require_party(resolved, client, &pending.losing_client_id)?;
    let mut approved = pending.resolved(TransferStatus::ClientApproved, now)?;
    let entry = history(resolved, HistoryType::TransferApprove, client);
    let (mut outcome, entry) = begin(resolved, resolved.resource().clone(), entry);
    for key in &pending.server_approve_entity_keys {
        outcome.delete(*key);
    }
    let gaining = pending.gaining_client_id.clone();

    match resolved.resource() {
        Resource::Domain(domain) => {
            let tld = ctx.tld(domain)?;
            let years = pending.transfer_period_years;
            let expiration = transferred_expiration(domain, years, now, tld);
            let gainer = gainer_entities(ctx, domain, &gaining, years, expiration, now, entry.key, tld)?;
            approved.transferred_registration_expiration_time = Some(expiration);

            let mut transferred = domain.clone();
            transferred.registration_expiration_time = expiration;
            transferred.autorenew_billing_event = gainer.recurring.key;
            transferred.autorenew_anchor_time = expiration;
            transferred.autorenew_poll_message = gainer.autorenew_poll.key();
            transferred.autorenew_end_time = Timestamp::end_of_time();
            transferred.grace_periods = [gainer.grace_period].into_iter().collect();
            transferred.base.sponsor_client_id = gaining.clone();
            transferred.base.last_transfer_time = Some(now);
            transferred.base.last_epp_update_time = Some(now);
            transferred.base.status_values.remove(&StatusValue::PendingTransfer);
            transferred.transfer_data = Some(approved.clone());

            outcome.set_recurrence_end(domain.autorenew_billing_event, now);
            outcome.set_recurrence_end(domain.autorenew_poll_message, now);
            outcome.save(gainer.charge);
            if let Some(cancellation) = gainer.autorenew_cancellation {
                outcome.save(cancellation);
            }
            outcome.save(gainer.recurring);
            outcome.save(gainer.autorenew_poll);
            outcome.resource = Resource::Domain(transferred);
        }
        Resource::Contact(contact) => {
            let mut transferred = contact.clone();
            transferred.base.sponsor_client_id = gaining.clone();
            transferred.base.last_transfer_time = Some(now);
            transferred.base.last_epp_update_time = Some(now);
            transferred.base.status_values.remove(&StatusValue::PendingTransfer);
            transferred.transfer_data = Some(approved.clone());
            outcome.resource = Resource::Contact(transferred);
        }
        Resource::Host(_) => {}
    }
    outcome.save(PollMessage::notice(
        &gaining,
        now,
        "Transfer approved.",
        entry.key,
        Some(response(resolved.resource().name(), &approved, TransferStatus::ClientApproved, now)),
    ));
    Ok(outcome)
}

/// Reject a pending transfer. Only the losing registrar may reject.
pub fn reject_transfer(
    resolved: &ResolvedResource,
    client: &ClientId,
) -> Result<FlowOutcome, FlowError> {
    let pending = pending_transfer(resolved, "transfer reject")?;
    require_party(resolved, client, &pending.losing_client_id)?;
    close_transfer(
        resolved,
        client,
        &pending,
        TransferStatus::ClientRejected,
        &pending.gaining_client_id,
        "Transfer rejected.",
    )
}

/// Cancel a pending transfer. Only the gaining registrar may cancel.
pub fn cancel_transfer(
    resolved: &ResolvedResource,
    client: &ClientId,
) -> Result<FlowOutcome, FlowError> {
    let pending = pending_transfer(resolved, "transfer cancel")?;
    require_party(resolved, client, &pending.gaining_client_id)?;
    close_transfer(
        resolved,
        client,
        &pending,
        TransferStatus::ClientCancelled,
        &pending.losing_client_id,
        "Transfer cancelled.",
    )
}

fn close_transfer(
    resolved: &ResolvedResource,
    client: &ClientId,
    pending: &TransferData,
    status: TransferStatus,
    notify: &ClientId,
    message: &str,
) -> Result<FlowOutcome, FlowError> {
    let now = resolved.as_of();
    let closed = pending.resolved(status, now)?;
    let history_type = match status {
        TransferStatus::ClientRejected => HistoryType::TransferReject,
        _ => HistoryType::TransferCancel,
    };
    let entry = history(resolved, history_type, client);
    let (mut outcome, entry) = begin(resolved, resolved.resource().clone(), entry);
    for key in &pending.server_approve_entity_keys {
        outcome.delete(*key);
    }
    match resolved.resource() {
        Resource::Domain(domain) => {
            let mut restored = domain.clone();
            restored.autorenew_end_time = Timestamp::end_of_time();
            restored.base.status_values.remove(&StatusValue::PendingTransfer);
            restored.base.last_epp_update_time = Some(now);
            restored.transfer_data = Some(closed.clone());
            outcome.set_recurrence_end(domain.autorenew_billing_event, Timestamp::end_of_time());
            outcome.set_recurrence_end(domain.autorenew_poll_message, Timestamp::end_of_time());
            outcome.resource = Resource::Domain(restored);
        }
        Resource::Contact(contact) => {
            let mut restored = contact.clone();
            restored.base.status_values.remove(&StatusValue::PendingTransfer);
            restored.base.last_epp_update_time = Some(now);
            restored.transfer_data = Some(closed.clone());
            outcome.resource = Resource::Contact(restored);
        }
        Resource::Host(_) => {}
    }
    outcome.save(PollMessage::notice(
        notify,
        now,
        message,
        entry.key,
        Some(response(resolved.resource().name(), &closed, status, now)),
    ));
    Ok(outcome)
}

/// Resolve a pending attempt as `serverCancelled` because the resource is
/// going away. Both parties are notified and the pre-built entities are
/// deleted. Does nothing when no attempt is pending at `now`.
pub(crate) fn server_cancel<R: HasTransferData>(
    resource: &mut R,
    outcome: &mut FlowOutcome,
    parent: EntityKey,
    now: Timestamp,
) -> Result<(), FlowError> {
    let Some(pending) = resource.pending_transfer_at(now).cloned() else {
        return Ok(());
    };
    let cancelled = pending.resolved(TransferStatus::ServerCancelled, now)?;
    for key in &pending.server_approve_entity_keys {
        outcome.delete(*key);
    }
    let notice = response(resource.name(), &cancelled, TransferStatus::ServerCancelled, now);
    for party in [&pending.gaining_client_id, &pending.losing_client_id] {
        outcome.save(PollMessage::notice(
            party,
            now,
            "Transfer cancelled by the registry.",
            parent,
            Some(notice.clone()),
        ));
    }
    resource.base_mut().status_values.remove(&StatusValue::PendingTransfer);
    resource.set_transfer_data(Some(cancelled));
    Ok(())
}
