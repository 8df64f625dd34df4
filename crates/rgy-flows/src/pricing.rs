//! # Pricing
//!
//! Operations ask a [`Pricing`] collaborator for every charge and record
//! the answer verbatim. [`TldPricing`] prices from the TLD fee schedules.

use rgy_core::{Money, Timestamp};

use crate::config::RegistryConfig;
use crate::error::FlowError;
use crate::resource::Resource;

/// A billable action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PricedAction {
    /// Initial registration, per year.
    Create,
    /// Explicit renewal, per year.
    Renew,
    /// Transfer, priced as a renewal of the transferred years.
    Transfer,
    /// Restore out of redemption, flat.
    Restore,
    /// Registry-applied status change, flat.
    ServerStatusChange,
}

/// Prices billable actions.
pub trait Pricing: Send + Sync {
    /// Cost of `action` on `resource` for `period_years` at `at`.
    fn cost(
        &self,
        action: PricedAction,
        resource: &Resource,
        period_years: u32,
        at: Timestamp,
    ) -> Result<Money, FlowError>;
}

/// Prices from each TLD's configured fee schedules.
#[derive(Debug, Clone)]
pub struct TldPricing {
    config: RegistryConfig,
}

impl TldPricing {
    /// Price from `config`.
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }
}

impl Pricing for TldPricing {
    fn cost(
        &self,
        action: PricedAction,
        resource: &Resource,
        period_years: u32,
        at: Timestamp,
    ) -> Result<Money, FlowError> {
        let domain = resource.as_domain().ok_or(FlowError::UnsupportedResourceKind {
            kind: resource.kind(),
            operation: "pricing",
        })?;
        let tld = self.config.tld(&domain.tld)?;
        Ok(match action {
            PricedAction::Create => tld.create_cost_schedule.value_at(at).times(period_years),
            PricedAction::Renew | PricedAction::Transfer => {
                tld.renew_cost_schedule.value_at(at).times(period_years)
            }
            PricedAction::Restore => tld.restore_cost.clone(),
            PricedAction::ServerStatusChange => tld.server_status_change_cost.clone(),
        })
    }
}

impl<P: Pricing + ?Sized> Pricing for std::sync::Arc<P> {
    fn cost(
        &self,
        action: PricedAction,
        resource: &Resource,
        period_years: u32,
        at: Timestamp,
    ) -> Result<Money, FlowError> {
        (**self).cost(action, resource, period_years, at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgy_state::FeeSchedule;

    use crate::ops::create_contact;
    use crate::ops::fixtures::{created_domain, registrar};

    fn at(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn domain(tld: &str) -> Resource {
        let (mut domain, _) = created_domain("2000-01-01T00:00:00Z", 1);
        domain.tld = tld.to_string();
        Resource::Domain(domain)
    }

    fn pricing() -> TldPricing {
        let mut config = RegistryConfig::with_tlds(["tld"]);
        if let Some(tld) = config.tlds.get_mut("tld") {
            tld.renew_cost_schedule = FeeSchedule::new(vec![
                (Timestamp::start_of_time(), Money::new("USD", 1100).unwrap()),
                (at("2030-01-01T00:00:00Z"), Money::new("USD", 1500).unwrap()),
            ])
            .unwrap();
        }
        TldPricing::new(config)
    }

    #[test]
    fn term_charges_scale_with_years() {
        let pricing = pricing();
        let resource = domain("tld");
        let now = at("2020-01-01T00:00:00Z");
        assert_eq!(pricing.cost(PricedAction::Create, &resource, 3, now).unwrap().minor_units, 3900);
        assert_eq!(pricing.cost(PricedAction::Renew, &resource, 2, now).unwrap().minor_units, 2200);
        assert_eq!(pricing.cost(PricedAction::Transfer, &resource, 1, now).unwrap().minor_units, 1100);
    }

    #[test]
    fn schedule_in_effect_at_the_action_applies() {
        let pricing = pricing();
        let resource = domain("tld");
        let before = pricing
            .cost(PricedAction::Renew, &resource, 1, at("2029-12-31T23:59:59Z"))
            .unwrap();
        let after = pricing
            .cost(PricedAction::Renew, &resource, 1, at("2030-01-01T00:00:00Z"))
            .unwrap();
        assert_eq!((before.minor_units, after.minor_units), (1100, 1500));
    }

    #[test]
    fn flat_fees_ignore_period() {
        let pricing = pricing();
        let resource = domain("tld");
        let now = at("2020-01-01T00:00:00Z");
        assert_eq!(pricing.cost(PricedAction::Restore, &resource, 5, now).unwrap().minor_units, 1700);
        assert_eq!(
            pricing.cost(PricedAction::ServerStatusChange, &resource, 0, now).unwrap().minor_units,
            2000
        );
    }

    #[test]
    fn only_configured_domains_are_priced() {
        let pricing = pricing();
        let now = at("2020-01-01T00:00:00Z");
        assert!(matches!(
            pricing.cost(PricedAction::Create, &domain("other"), 1, now),
            Err(FlowError::UnknownTld { .. })
        ));
        let contact = create_contact("sh8013", &registrar(), now).resource;
        assert!(matches!(
            pricing.cost(PricedAction::Create, &contact, 1, now),
            Err(FlowError::UnsupportedResourceKind { .. })
        ));
    }
}
