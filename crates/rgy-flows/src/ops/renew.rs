//! Explicit domain renewal.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use rgy_billing::{
    BillingReason, GracePeriod, GracePeriodStatus, HistoryType, OneTime, PollMessage, Recurring,
};
use rgy_core::{ClientId, EntityKey, Timestamp};
use rgy_state::GuardedOperation;

use crate::error::FlowError;
use crate::outcome::FlowOutcome;
use crate::pricing::PricedAction;
use crate::resolver::ResolvedResource;
use crate::resource::Resource;

use super::{begin, history, require_domain, verify_not_prohibited, verify_sponsor, FlowContext};

/// Add `period_years` to a domain's registration.
///
/// `current_expiration_date` must match the domain's effective expiration
/// date, which guards against renewing twice from a stale view. The
/// current recurrence ends now and a new one starts at the new expiration.
pub fn renew_domain(
    ctx: &FlowContext<'_>,
    resolved: &ResolvedResource,
    client: &ClientId,
    current_expiration_date: NaiveDate,
    period_years: u32,
) -> Result<FlowOutcome, FlowError> {
    let now = resolved.as_of();
    let domain = require_domain(resolved, "renew")?;
    let tld = ctx.tld(domain)?;
    verify_sponsor(domain, client)?;
    verify_not_prohibited(domain, GuardedOperation::Renew, &BTreeSet::new())?;
    if period_years == 0 {
        return Err(FlowError::InvalidPeriod { years: period_years });
    }
    let actual = domain.registration_expiration_time.date();
    if actual != current_expiration_date {
        return Err(FlowError::CurrentExpirationDateMismatch {
            resource: domain.base.name.clone(),
            supplied: current_expiration_date,
            actual,
        });
    }
    let new_expiration = domain.registration_expiration_time.plus_years(period_years);
    if new_expiration > now.plus_years(tld.max_registration_years) {
        return Err(FlowError::ExceedsMaxRegistrationYears {
            resource: domain.base.name.clone(),
            max_years: tld.max_registration_years,
        });
    }

    let mut renewed = domain.clone();
    let entry = history(resolved, HistoryType::Renew, client).with_period(period_years);
    let cost = ctx
        .pricing
        .cost(PricedAction::Renew, resolved.resource(), period_years, now)?;
    let renew = OneTime {
        key: EntityKey::new(),
        reason: BillingReason::Renew,
        target_id: domain.base.name.clone(),
        client_id: client.clone(),
        cost,
        event_time: now,
        billing_time: now.plus(tld.renew_grace_length),
        period_years,
        parent: entry.key,
        flags: BTreeSet::new(),
    };
    let recurring = Recurring::auto_renew(&domain.base.name, client, new_expiration, entry.key);
    let autorenew_poll = PollMessage::autorenew(client, &domain.base.name, new_expiration, entry.key);

    renewed.registration_expiration_time = new_expiration;
    renewed.autorenew_billing_event = recurring.key;
    renewed.autorenew_anchor_time = new_expiration;
    renewed.autorenew_poll_message = autorenew_poll.key();
    renewed.autorenew_end_time = Timestamp::end_of_time();
    renewed
        .grace_periods
        .insert(GracePeriod::for_one_time(GracePeriodStatus::Renew, &renew)?);
    renewed.base.last_epp_update_time = Some(now);

    let (mut outcome, _) = begin(resolved, Resource::Domain(renewed), entry);
    outcome.set_recurrence_end(domain.autorenew_billing_event, now);
    outcome.set_recurrence_end(domain.autorenew_poll_message, now);
    outcome.save(renew);
    outcome.save(recurring);
    outcome.save(autorenew_poll);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::fixtures::{at, config, created_domain, gainer, pricing, registrar, resolved};
    use rgy_billing::BillingEvent;
    use rgy_state::StatusValue;

    #[test]
    fn renew_extends_and_replaces_recurrence() {
        let (domain, _) = created_domain("2000-06-01T00:00:00Z", 1);
        let config = config();
        let pricing = pricing();
        let ctx = FlowContext::new(&config, &pricing);
        let view = resolved(&domain, "2000-08-01T00:00:00Z");
        let date = NaiveDate::from_ymd_opt(2001, 6, 1).unwrap();
        let outcome = renew_domain(&ctx, &view, &registrar(), date, 2).unwrap();
        let renewed = outcome.resource.as_domain().unwrap();
        assert_eq!(renewed.registration_expiration_time, at("2003-06-01T00:00:00Z"));
        assert_ne!(renewed.autorenew_billing_event, domain.autorenew_billing_event);
        let ends: Vec<_> = outcome.recurrence_ends().collect();
        assert!(ends.contains(&(domain.autorenew_billing_event, at("2000-08-01T00:00:00Z"))));
        assert!(ends.contains(&(domain.autorenew_poll_message, at("2000-08-01T00:00:00Z"))));
        let renew = outcome
            .billing_events()
            .find_map(|e| match e {
                BillingEvent::OneTime(o) => Some(o),
                _ => None,
            })
            .unwrap();
        assert_eq!(renew.cost.minor_units, 2200);
        assert!(renewed
            .grace_periods
            .iter()
            .any(|g| g.kind == GracePeriodStatus::Renew && g.billing_event == Some(renew.key)));
    }

    #[test]
    fn two_renewals_keep_two_renew_grace_periods() {
        let (domain, _) = created_domain("2000-06-01T00:00:00Z", 1);
        let config = config();
        let pricing = pricing();
        let ctx = FlowContext::new(&config, &pricing);
        let first = renew_domain(
            &ctx,
            &resolved(&domain, "2000-08-01T00:00:00Z"),
            &registrar(),
            NaiveDate::from_ymd_opt(2001, 6, 1).unwrap(),
            1,
        )
        .unwrap();
        let mut after_first = first.resource.as_domain().unwrap().clone();
        after_first.base.revision = 2;
        let second = renew_domain(
            &ctx,
            &resolved(&after_first, "2000-08-02T00:00:00Z"),
            &registrar(),
            NaiveDate::from_ymd_opt(2002, 6, 1).unwrap(),
            1,
        )
        .unwrap();
        let renews = second
            .resource
            .as_domain()
            .unwrap()
            .grace_periods
            .iter()
            .filter(|g| g.kind == GracePeriodStatus::Renew)
            .count();
        assert_eq!(renews, 2);
    }

    #[test]
    fn renew_guards() {
        let (mut domain, _) = created_domain("2000-06-01T00:00:00Z", 1);
        let config = config();
        let pricing = pricing();
        let ctx = FlowContext::new(&config, &pricing);
        let date = NaiveDate::from_ymd_opt(2001, 6, 1).unwrap();
        let view = resolved(&domain, "2000-08-01T00:00:00Z");
        assert!(matches!(
            renew_domain(&ctx, &view, &gainer(), date, 1),
            Err(FlowError::ResourceNotOwned { .. })
        ));
        assert!(matches!(
            renew_domain(&ctx, &view, &registrar(), NaiveDate::from_ymd_opt(2002, 6, 1).unwrap(), 1),
            Err(FlowError::CurrentExpirationDateMismatch { .. })
        ));
        assert!(matches!(
            renew_domain(&ctx, &view, &registrar(), date, 10),
            Err(FlowError::ExceedsMaxRegistrationYears { .. })
        ));
        domain.base.status_values.insert(StatusValue::ServerRenewProhibited);
        let view = resolved(&domain, "2000-08-01T00:00:00Z");
        assert!(matches!(
            renew_domain(&ctx, &view, &registrar(), date, 1),
            Err(FlowError::ResourceStatusProhibitsOperation {
                status: StatusValue::ServerRenewProhibited,
                ..
            })
        ));
    }
}
