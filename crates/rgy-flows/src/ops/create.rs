//! Resource creation.

use std::collections::BTreeSet;

use rgy_billing::{
    BillingReason, GracePeriod, GracePeriodStatus, HistoryEntry, HistoryType, OneTime, PollMessage,
    Recurring,
};
use rgy_core::{ClientId, EntityKey, Timestamp};
use rgy_state::AllocationToken;

use crate::error::FlowError;
use crate::outcome::FlowOutcome;
use crate::pricing::PricedAction;
use crate::resource::{tld_of, Contact, Domain, Host, Resource, ResourceBase};

use super::FlowContext;

/// What to create.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateRequest {
    /// A domain registration.
    Domain {
        /// Fully qualified name.
        name: String,
        /// Years to register.
        period_years: u32,
        /// Token unlocking the registration, if any.
        allocation_token: Option<AllocationToken>,
    },
    /// A contact.
    Contact {
        /// Contact id.
        contact_id: String,
    },
    /// A host.
    Host {
        /// Fully qualified host name.
        host_name: String,
    },
}

impl CreateRequest {
    /// Kind of resource requested.
    pub fn kind(&self) -> crate::resource::ResourceKind {
        use crate::resource::ResourceKind;
        match self {
            Self::Domain { .. } => ResourceKind::Domain,
            Self::Contact { .. } => ResourceKind::Contact,
            Self::Host { .. } => ResourceKind::Host,
        }
    }

    /// Requested name.
    pub fn name(&self) -> &str {
        match self {
            Self::Domain { name, .. } => name,
            Self::Contact { contact_id } => contact_id,
            Self::Host { host_name } => host_name,
        }
    }
}

/// Create any resource kind. Name uniqueness is checked by the store.
pub fn create_resource(
    ctx: &FlowContext<'_>,
    request: &CreateRequest,
    client: &ClientId,
    now: Timestamp,
) -> Result<FlowOutcome, FlowError> {
    match request {
        CreateRequest::Domain {
            name,
            period_years,
            allocation_token,
        } => create_domain(ctx, name, client, *period_years, allocation_token.as_ref(), now),
        CreateRequest::Contact { contact_id } => Ok(create_contact(contact_id, client, now)),
        CreateRequest::Host { host_name } => Ok(create_host(host_name, client, now)),
    }
}

/// Register a domain for `period_years`.
///
/// Bills a `CREATE` charge finalized at the end of the ADD grace period,
/// starts the auto-renew recurrence and its poll message at the new
/// expiration, and redeems the allocation token if one was presented.
/// Without a token the TLD must be in general availability.
pub fn create_domain(
    ctx: &FlowContext<'_>,
    name: &str,
    client: &ClientId,
    period_years: u32,
    allocation_token: Option<&AllocationToken>,
    now: Timestamp,
) -> Result<FlowOutcome, FlowError> {
    let tld_name = tld_of(name)?;
    let tld = ctx.config.tld(tld_name)?;
    if period_years == 0 {
        return Err(FlowError::InvalidPeriod { years: period_years });
    }
    if period_years > tld.max_registration_years {
        return Err(FlowError::ExceedsMaxRegistrationYears {
            resource: name.to_string(),
            max_years: tld.max_registration_years,
        });
    }
    match allocation_token {
        Some(token) if !token.is_valid_at(now) => {
            return Err(FlowError::AllocationTokenNotValid {
                token: token.token.clone(),
                status: token.status_at(now),
                redeemed: token.redemption.is_some(),
            });
        }
        Some(_) => {}
        None => {
            let state = *tld.tld_state_schedule.value_at(now);
            if !state.accepts_general_registrations() {
                return Err(FlowError::RegistrationsNotOpen {
                    tld: tld_name.to_string(),
                    state,
                });
            }
        }
    }

    let base = ResourceBase::new(name, client, now);
    let entry = HistoryEntry::new(base.key, HistoryType::Create, client, now).with_period(period_years);
    let expiration = now.plus_years(period_years);
    let recurring = Recurring::auto_renew(name, client, expiration, entry.key);
    let autorenew_poll = PollMessage::autorenew(client, name, expiration, entry.key);
    let mut domain = Domain {
        base,
        tld: tld_name.to_string(),
        registration_expiration_time: expiration,
        autorenew_billing_event: recurring.key,
        autorenew_anchor_time: expiration,
        autorenew_poll_message: autorenew_poll.key(),
        autorenew_end_time: Timestamp::end_of_time(),
        deletion_poll_message: None,
        grace_periods: BTreeSet::new(),
        transfer_data: None,
    };
    let cost = ctx.pricing.cost(
        PricedAction::Create,
        &Resource::Domain(domain.clone()),
        period_years,
        now,
    )?;
    let create = OneTime {
        key: EntityKey::new(),
        reason: BillingReason::Create,
        target_id: name.to_string(),
        client_id: client.clone(),
        cost,
        event_time: now,
        billing_time: now.plus(tld.add_grace_length),
        period_years,
        parent: entry.key,
        flags: BTreeSet::new(),
    };
    domain
        .grace_periods
        .insert(GracePeriod::for_one_time(GracePeriodStatus::Add, &create)?);
    let domain_key = domain.base.key;

    let mut outcome = FlowOutcome::new(Resource::Domain(domain), None);
    outcome.save(entry);
    outcome.save(create);
    outcome.save(recurring);
    outcome.save(autorenew_poll);
    if let Some(token) = allocation_token {
        let mut redeemed = token.clone();
        redeemed.redemption = Some(domain_key);
        outcome.save(redeemed);
    }
    Ok(outcome)
}

/// Create a contact.
pub fn create_contact(contact_id: &str, client: &ClientId, now: Timestamp) -> FlowOutcome {
    let base = ResourceBase::new(contact_id, client, now);
    let entry = HistoryEntry::new(base.key, HistoryType::Create, client, now);
    let mut outcome = FlowOutcome::new(
        Resource::Contact(Contact {
            base,
            transfer_data: None,
        }),
        None,
    );
    outcome.save(entry);
    outcome
}

/// Create a host.
pub fn create_host(host_name: &str, client: &ClientId, now: Timestamp) -> FlowOutcome {
    let base = ResourceBase::new(host_name, client, now);
    let entry = HistoryEntry::new(base.key, HistoryType::Create, client, now);
    let mut outcome = FlowOutcome::new(Resource::Host(Host { base }), None);
    outcome.save(entry);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::ops::fixtures::{at, config, created_domain, pricing, registrar};
    use crate::pricing::TldPricing;
    use rgy_billing::BillingEvent;
    use rgy_state::{TldState, TldStateSchedule};

    #[test]
    fn create_bills_with_add_grace_and_starts_recurrence() {
        let (domain, outcome) = created_domain("2000-06-01T00:00:00Z", 2);
        assert_eq!(domain.registration_expiration_time, at("2002-06-01T00:00:00Z"));
        let events: Vec<_> = outcome.billing_events().collect();
        let create = events
            .iter()
            .find_map(|e| match e {
                BillingEvent::OneTime(o) => Some(o),
                _ => None,
            })
            .unwrap();
        assert_eq!(create.cost.minor_units, 2600);
        assert_eq!(create.billing_time, at("2000-06-06T00:00:00Z"));
        let recurring = events
            .iter()
            .find_map(|e| match e {
                BillingEvent::Recurring(r) => Some(r),
                _ => None,
            })
            .unwrap();
        assert_eq!(recurring.key, domain.autorenew_billing_event);
        assert_eq!(recurring.event_time, domain.registration_expiration_time);
        let grace: Vec<_> = domain.grace_periods.iter().collect();
        assert_eq!(grace.len(), 1);
        assert_eq!(grace[0].kind, GracePeriodStatus::Add);
        assert_eq!(grace[0].billing_event, Some(create.key));
        assert_eq!(outcome.history().count(), 1);
        assert_eq!(outcome.poll_messages().count(), 1);
    }

    #[test]
    fn create_rejects_bad_periods_and_tlds() {
        let config = config();
        let pricing = pricing();
        let ctx = FlowContext::new(&config, &pricing);
        let now = at("2000-06-01T00:00:00Z");
        assert!(matches!(
            create_domain(&ctx, "example.tld", &registrar(), 0, None, now),
            Err(FlowError::InvalidPeriod { years: 0 })
        ));
        assert!(matches!(
            create_domain(&ctx, "example.tld", &registrar(), 11, None, now),
            Err(FlowError::ExceedsMaxRegistrationYears { max_years: 10, .. })
        ));
        assert!(matches!(
            create_domain(&ctx, "example.other", &registrar(), 1, None, now),
            Err(FlowError::UnknownTld { .. })
        ));
    }

    #[test]
    fn sunrise_requires_a_valid_token() {
        let mut config = RegistryConfig::with_tlds(["tld"]);
        if let Some(tld) = config.tlds.get_mut("tld") {
            tld.tld_state_schedule = TldStateSchedule::new(vec![
                (Timestamp::start_of_time(), TldState::Sunrise),
                (at("2001-01-01T00:00:00Z"), TldState::GeneralAvailability),
            ])
            .unwrap();
        }
        let pricing = TldPricing::new(config.clone());
        let ctx = FlowContext::new(&config, &pricing);
        let now = at("2000-06-01T00:00:00Z");
        assert!(matches!(
            create_domain(&ctx, "example.tld", &registrar(), 1, None, now),
            Err(FlowError::RegistrationsNotOpen { state: TldState::Sunrise, .. })
        ));

        let expired = AllocationToken::valid_between(
            "sunrise",
            at("2000-01-01T00:00:00Z"),
            at("2000-02-01T00:00:00Z"),
        )
        .unwrap();
        assert!(matches!(
            create_domain(&ctx, "example.tld", &registrar(), 1, Some(&expired), now),
            Err(FlowError::AllocationTokenNotValid { .. })
        ));

        let token =
            AllocationToken::valid_between("sunrise", at("2000-01-01T00:00:00Z"), Timestamp::end_of_time())
                .unwrap();
        let outcome = create_domain(&ctx, "example.tld", &registrar(), 1, Some(&token), now).unwrap();
        let redeemed = outcome
            .changes
            .iter()
            .find_map(|change| match change {
                crate::outcome::EntityChange::Save(crate::outcome::Entity::Token(t)) => Some(t),
                _ => None,
            })
            .unwrap();
        assert_eq!(redeemed.redemption, Some(outcome.resource.key()));
    }

    #[test]
    fn contact_and_host_creation_is_unbilled() {
        let now = at("2000-06-01T00:00:00Z");
        let contact = create_contact("sh8013", &registrar(), now);
        assert_eq!(contact.billing_events().count(), 0);
        assert_eq!(contact.resource.kind(), crate::resource::ResourceKind::Contact);
        let host = create_host("ns1.example.tld", &registrar(), now);
        assert_eq!(host.history().count(), 1);
        assert!(host.precondition.is_none());
    }
}
