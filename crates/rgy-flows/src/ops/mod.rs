//! # Operations
//!
//! Each operation takes a [`ResolvedResource`] (or, for creates, nothing)
//! and acts at the view's `as_of` instant. It returns a [`FlowOutcome`]
//! describing the updated resource and every side entity; it never reads
//! or writes storage.
//!
//! - [`create`]: domains, contacts and hosts.
//! - [`renew`]: explicit domain renewal.
//! - [`delete`]: immediate delete inside ADD grace, redemption otherwise.
//! - [`restore`]: out of redemption.
//! - [`transfer`]: request, approve, reject and cancel.
//! - [`status`]: client and registry status changes.

pub mod create;
pub mod delete;
pub mod renew;
pub mod restore;
pub mod status;
pub mod transfer;

pub use create::{create_contact, create_domain, create_host, create_resource, CreateRequest};
pub use delete::delete_resource;
pub use renew::renew_domain;
pub use restore::restore_domain;
pub use status::{update_client_status, update_server_status};
pub use transfer::{approve_transfer, cancel_transfer, reject_transfer, request_transfer};

use std::collections::BTreeSet;

use rgy_billing::{HistoryEntry, HistoryType};
use rgy_core::ClientId;
use rgy_state::{GuardedOperation, StatusValue};

use crate::config::{RegistryConfig, TldConfig};
use crate::error::FlowError;
use crate::outcome::FlowOutcome;
use crate::pricing::Pricing;
use crate::resolver::ResolvedResource;
use crate::resource::{Domain, EppResource, Resource};

/// What every operation needs besides the resource.
#[derive(Clone, Copy)]
pub struct FlowContext<'a> {
    /// Registry constants.
    pub config: &'a RegistryConfig,
    /// Charge calculator.
    pub pricing: &'a dyn Pricing,
}

impl<'a> FlowContext<'a> {
    /// Bundle a config and a pricing collaborator.
    pub fn new(config: &'a RegistryConfig, pricing: &'a dyn Pricing) -> Self {
        Self { config, pricing }
    }

    pub(crate) fn tld(&self, domain: &Domain) -> Result<&'a TldConfig, FlowError> {
        self.config.tld(&domain.tld)
    }
}

impl std::fmt::Debug for FlowContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

pub(crate) fn require_domain<'r>(
    resolved: &'r ResolvedResource,
    operation: &'static str,
) -> Result<&'r Domain, FlowError> {
    let resource = resolved.resource();
    resource.as_domain().ok_or(FlowError::UnsupportedResourceKind {
        kind: resource.kind(),
        operation,
    })
}

pub(crate) fn verify_sponsor(resource: &dyn EppResource, client: &ClientId) -> Result<(), FlowError> {
    if resource.sponsor() != client {
        return Err(FlowError::ResourceNotOwned {
            resource: resource.name().to_string(),
            client: client.clone(),
        });
    }
    Ok(())
}

/// Reject if a status blocking `operation` is present, ignoring `exempt`.
pub(crate) fn verify_not_prohibited(
    resource: &dyn EppResource,
    operation: GuardedOperation,
    exempt: &BTreeSet<StatusValue>,
) -> Result<(), FlowError> {
    match operation
        .prohibited_by()
        .iter()
        .find(|status| resource.has_status(**status) && !exempt.contains(*status))
    {
        Some(status) => Err(FlowError::prohibited(resource.name(), operation, *status)),
        None => Ok(()),
    }
}

/// Start an outcome for `resource` and record its history entry.
pub(crate) fn begin(
    resolved: &ResolvedResource,
    resource: Resource,
    entry: HistoryEntry,
) -> (FlowOutcome, HistoryEntry) {
    let mut outcome = FlowOutcome::new(resource, Some(resolved.precondition()));
    outcome.save(entry.clone());
    (outcome, entry)
}

pub(crate) fn history(
    resolved: &ResolvedResource,
    history_type: HistoryType,
    client: &ClientId,
) -> HistoryEntry {
    HistoryEntry::new(
        resolved.resource().key(),
        history_type,
        client,
        resolved.as_of(),
    )
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Shared builders for operation tests.

    use std::collections::BTreeSet;

    use rgy_core::{ClientId, Timestamp};

    use crate::config::RegistryConfig;
    use crate::outcome::FlowOutcome;
    use crate::pricing::TldPricing;
    use crate::resolver::{resolve, ResolvedResource};
    use crate::resource::{Domain, Resource};

    use super::{create_domain, FlowContext};

    pub fn at(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    pub fn registrar() -> ClientId {
        ClientId::new("TheRegistrar").unwrap()
    }

    pub fn gainer() -> ClientId {
        ClientId::new("NewRegistrar").unwrap()
    }

    pub fn config() -> RegistryConfig {
        RegistryConfig::with_tlds(["tld"])
    }

    pub fn pricing() -> TldPricing {
        TldPricing::new(config())
    }

    /// A committed-looking domain created by `registrar()` at `created`.
    pub fn created_domain(created: &str, years: u32) -> (Domain, FlowOutcome) {
        let config = config();
        let pricing = pricing();
        let ctx = FlowContext::new(&config, &pricing);
        let mut outcome =
            create_domain(&ctx, "example.tld", &registrar(), years, None, at(created)).unwrap();
        outcome.resource.base_mut().revision = 1;
        let domain = outcome.resource.as_domain().unwrap().clone();
        (domain, outcome)
    }

    pub fn resolved(domain: &Domain, now: &str) -> ResolvedResource {
        resolve(&Resource::Domain(domain.clone()), at(now), &config())
    }

    pub fn no_statuses() -> BTreeSet<rgy_state::StatusValue> {
        BTreeSet::new()
    }
}
