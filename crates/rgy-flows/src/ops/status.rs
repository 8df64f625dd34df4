//! Status changes.
//!
//! Registrars change `client*` statuses for free. The registry changes
//! `server*` statuses as superuser; adding any to a domain bills a flat fee
//! at once, with no grace period, and removing the status later refunds
//! nothing.

use std::collections::BTreeSet;

use rgy_billing::{BillingReason, HistoryType, OneTime};
use rgy_core::{ClientId, EntityKey};
use rgy_state::{GuardedOperation, StatusValue};

use crate::error::FlowError;
use crate::outcome::FlowOutcome;
use crate::pricing::PricedAction;
use crate::resolver::ResolvedResource;
use crate::resource::{EppResource, Resource};

use super::{begin, history, verify_not_prohibited, verify_sponsor, FlowContext};

fn check_changes(
    resource: &dyn EppResource,
    add: &BTreeSet<StatusValue>,
    remove: &BTreeSet<StatusValue>,
    settable: fn(&StatusValue) -> bool,
) -> Result<BTreeSet<StatusValue>, FlowError> {
    if add.is_empty() && remove.is_empty() {
        return Err(FlowError::EmptyStatusUpdate {
            resource: resource.name().to_string(),
        });
    }
    if let Some(status) = add.iter().chain(remove).find(|s| !settable(s)) {
        return Err(FlowError::StatusNotSettable { status: *status });
    }
    if let Some(status) = add.iter().find(|s| resource.has_status(**s)) {
        return Err(FlowError::StatusValueAlreadyPresent {
            resource: resource.name().to_string(),
            status: *status,
        });
    }
    if let Some(status) = remove.iter().find(|s| !resource.has_status(**s)) {
        return Err(FlowError::StatusValueNotPresent {
            resource: resource.name().to_string(),
            status: *status,
        });
    }
    let mut statuses = resource.base().status_values.clone();
    statuses.retain(|s| !remove.contains(s));
    statuses.extend(add.iter().copied());
    Ok(statuses)
}

/// Add and remove registry-only statuses.
pub fn update_server_status(
    ctx: &FlowContext<'_>,
    resolved: &ResolvedResource,
    add: &BTreeSet<StatusValue>,
    remove: &BTreeSet<StatusValue>,
) -> Result<FlowOutcome, FlowError> {
    let now = resolved.as_of();
    let resource = resolved.resource();
    let statuses = check_changes(resource.as_epp(), add, remove, StatusValue::is_server_settable)?;
    let sponsor = resource.base().sponsor_client_id.clone();
    let entry = history(resolved, HistoryType::ServerStatusUpdate, &sponsor).by_superuser();

    let fee = match resource {
        Resource::Domain(_) if !add.is_empty() => Some(OneTime {
            key: EntityKey::new(),
            reason: BillingReason::ServerStatus,
            target_id: resource.name().to_string(),
            client_id: sponsor.clone(),
            cost: ctx
                .pricing
                .cost(PricedAction::ServerStatusChange, resource, 0, now)?,
            event_time: now,
            billing_time: now,
            period_years: 0,
            parent: entry.key,
            flags: BTreeSet::new(),
        }),
        _ => None,
    };

    let mut updated = resource.clone();
    updated.base_mut().status_values = statuses;
    updated.base_mut().last_epp_update_time = Some(now);
    let (mut outcome, _) = begin(resolved, updated, entry);
    if let Some(fee) = fee {
        outcome.save(fee);
    }
    Ok(outcome)
}

/// Add and remove registrar statuses.
///
/// `clientUpdateProhibited` blocks the update unless this update removes it.
pub fn update_client_status(
    resolved: &ResolvedResource,
    client: &ClientId,
    add: &BTreeSet<StatusValue>,
    remove: &BTreeSet<StatusValue>,
) -> Result<FlowOutcome, FlowError> {
    let now = resolved.as_of();
    let resource = resolved.resource();
    verify_sponsor(resource.as_epp(), client)?;
    verify_not_prohibited(resource.as_epp(), GuardedOperation::Update, remove)?;
    let statuses = check_changes(resource.as_epp(), add, remove, StatusValue::is_client_settable)?;
    let entry = history(resolved, HistoryType::Update, client);

    let mut updated = resource.clone();
    updated.base_mut().status_values = statuses;
    updated.base_mut().last_epp_update_time = Some(now);
    let (outcome, _) = begin(resolved, updated, entry);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::fixtures::{config, created_domain, no_statuses, pricing, registrar, resolved};
    use rgy_billing::BillingEvent;

    fn set(statuses: &[StatusValue]) -> BTreeSet<StatusValue> {
        statuses.iter().copied().collect()
    }

    #[test]
    fn server_hold_bills_once_and_removal_refunds_nothing() {
        let (domain, _) = created_domain("2000-06-01T00:00:00Z", 1);
        let config = config();
        let pricing = pricing();
        let ctx = FlowContext::new(&config, &pricing);
        let added = update_server_status(
            &ctx,
            &resolved(&domain, "2000-07-01T00:00:00Z"),
            &set(&[StatusValue::ServerHold, StatusValue::ServerDeleteProhibited]),
            &no_statuses(),
        )
        .unwrap();
        let fees: Vec<_> = added.billing_events().collect();
        assert_eq!(fees.len(), 1);
        match fees[0] {
            BillingEvent::OneTime(fee) => {
                assert_eq!(fee.reason, BillingReason::ServerStatus);
                assert_eq!(fee.billing_time, fee.event_time);
                assert_eq!(fee.cost.minor_units, 2000);
            }
            other => panic!("unexpected event {other:?}"),
        }
        let held = added.resource.as_domain().unwrap();
        assert!(held.grace_periods.iter().all(|g| g.billing_event != Some(fees[0].key())));
        assert!(added.history().all(|h| h.by_superuser));

        let mut held = held.clone();
        held.base.revision = 2;
        let removed = update_server_status(
            &ctx,
            &resolved(&held, "2000-07-01T00:00:10Z"),
            &no_statuses(),
            &set(&[StatusValue::ServerHold]),
        )
        .unwrap();
        assert_eq!(removed.billing_events().count(), 0);
    }

    #[test]
    fn status_no_ops_are_rejected() {
        let (domain, _) = created_domain("2000-06-01T00:00:00Z", 1);
        let config = config();
        let pricing = pricing();
        let ctx = FlowContext::new(&config, &pricing);
        let view = resolved(&domain, "2000-07-01T00:00:00Z");
        assert!(matches!(
            update_server_status(&ctx, &view, &no_statuses(), &no_statuses()),
            Err(FlowError::EmptyStatusUpdate { .. })
        ));
        assert!(matches!(
            update_server_status(&ctx, &view, &no_statuses(), &set(&[StatusValue::ServerHold])),
            Err(FlowError::StatusValueNotPresent { .. })
        ));
        assert!(matches!(
            update_server_status(&ctx, &view, &set(&[StatusValue::ClientHold]), &no_statuses()),
            Err(FlowError::StatusNotSettable { .. })
        ));
        assert!(matches!(
            update_client_status(&view, &registrar(), &set(&[StatusValue::ServerHold]), &no_statuses()),
            Err(FlowError::StatusNotSettable { .. })
        ));
    }

    #[test]
    fn client_update_prohibited_can_remove_itself() {
        let (mut domain, _) = created_domain("2000-06-01T00:00:00Z", 1);
        domain.base.status_values.insert(StatusValue::ClientUpdateProhibited);
        let view = resolved(&domain, "2000-07-01T00:00:00Z");
        assert!(matches!(
            update_client_status(&view, &registrar(), &set(&[StatusValue::ClientHold]), &no_statuses()),
            Err(FlowError::ResourceStatusProhibitsOperation { .. })
        ));
        let outcome = update_client_status(
            &view,
            &registrar(),
            &no_statuses(),
            &set(&[StatusValue::ClientUpdateProhibited]),
        )
        .unwrap();
        assert!(outcome.resource.base().status_values.is_empty());
        assert_eq!(outcome.billing_events().count(), 0);
    }
}
