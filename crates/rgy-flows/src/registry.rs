//! # Registry Façade
//!
//! Runs every exposed operation as one transaction:
//!
//! ```text
//! load fresh ──▶ resolve(now) ──▶ operation ──▶ commit
//!      ▲                                          │
//!      └────────── contention, retry ◀────────────┘
//! ```
//!
//! Each attempt reads the clock again, so a retried operation acts on the
//! state and instant it actually commits against. Business rejections are
//! returned at once; only [`FlowError::Contention`] is retried, up to
//! `max_contention_retries` times.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use tracing::{info, warn};

use rgy_core::{ClientId, Timestamp};
use rgy_state::StatusValue;

use crate::clock::Clock;
use crate::config::RegistryConfig;
use crate::error::FlowError;
use crate::ops::{self, CreateRequest, FlowContext};
use crate::outcome::FlowOutcome;
use crate::pricing::Pricing;
use crate::resolver::{project, resolve, ResolvedResource};
use crate::resource::{Resource, ResourceKind};
use crate::store::InMemoryStore;

/// The registry's transactional entry point.
#[derive(Debug)]
pub struct Registry<C: Clock, P: Pricing> {
    config: RegistryConfig,
    clock: C,
    pricing: P,
    store: InMemoryStore,
}

impl<C: Clock, P: Pricing> Registry<C, P> {
    /// A registry over an empty store.
    pub fn new(config: RegistryConfig, clock: C, pricing: P) -> Self {
        Self::with_store(config, clock, pricing, InMemoryStore::new())
    }

    /// A registry over an existing store.
    pub fn with_store(config: RegistryConfig, clock: C, pricing: P, store: InMemoryStore) -> Self {
        Self {
            config,
            clock,
            pricing,
            store,
        }
    }

    /// The backing store.
    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }

    /// The clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Registry constants.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn ctx(&self) -> FlowContext<'_> {
        FlowContext::new(&self.config, &self.pricing)
    }

    /// The resource named `name` as it effectively is now.
    pub fn info(&self, kind: ResourceKind, name: &str) -> Result<Resource, FlowError> {
        let now = self.clock.now();
        let stored = self.load(kind, name, now)?;
        Ok(project(&stored, now, &self.config))
    }

    /// Create a resource.
    pub fn create(&self, request: &CreateRequest, client: &ClientId) -> Result<Resource, FlowError> {
        self.run("create", request.name(), client, |now| {
            self.ensure_available(request.kind(), request.name(), now)?;
            ops::create_resource(&self.ctx(), request, client, now)
        })
    }

    /// Register a domain, redeeming the stored allocation token named
    /// `allocation_token` if given.
    pub fn create_domain(
        &self,
        name: &str,
        client: &ClientId,
        period_years: u32,
        allocation_token: Option<&str>,
    ) -> Result<Resource, FlowError> {
        self.run("create", name, client, |now| {
            self.ensure_available(ResourceKind::Domain, name, now)?;
            let token = allocation_token
                .map(|token| {
                    self.store
                        .token(token)
                        .ok_or_else(|| FlowError::UnknownAllocationToken {
                            token: token.to_string(),
                        })
                })
                .transpose()?;
            ops::create_domain(&self.ctx(), name, client, period_years, token.as_ref(), now)
        })
    }

    /// Renew a domain.
    pub fn renew(
        &self,
        name: &str,
        client: &ClientId,
        current_expiration_date: NaiveDate,
        period_years: u32,
    ) -> Result<Resource, FlowError> {
        self.mutate("renew", ResourceKind::Domain, name, client, |ctx, resolved| {
            ops::renew_domain(ctx, resolved, client, current_expiration_date, period_years)
        })
    }

    /// Delete a resource.
    pub fn delete(&self, kind: ResourceKind, name: &str, client: &ClientId) -> Result<Resource, FlowError> {
        self.mutate("delete", kind, name, client, |ctx, resolved| {
            ops::delete_resource(ctx, resolved, client)
        })
    }

    /// Restore a domain out of redemption.
    pub fn restore(&self, name: &str, client: &ClientId) -> Result<Resource, FlowError> {
        self.mutate("restore", ResourceKind::Domain, name, client, |ctx, resolved| {
            ops::restore_domain(ctx, resolved, client)
        })
    }

    /// Request a transfer to `gaining`.
    pub fn request_transfer(
        &self,
        kind: ResourceKind,
        name: &str,
        gaining: &ClientId,
        period_years: u32,
    ) -> Result<Resource, FlowError> {
        self.mutate("transfer request", kind, name, gaining, |ctx, resolved| {
            ops::request_transfer(ctx, resolved, gaining, period_years)
        })
    }

    /// Approve a pending transfer.
    pub fn approve_transfer(
        &self,
        kind: ResourceKind,
        name: &str,
        client: &ClientId,
    ) -> Result<Resource, FlowError> {
        self.mutate("transfer approve", kind, name, client, |ctx, resolved| {
            ops::approve_transfer(ctx, resolved, client)
        })
    }

    /// Reject a pending transfer.
    pub fn reject_transfer(
        &self,
        kind: ResourceKind,
        name: &str,
        client: &ClientId,
    ) -> Result<Resource, FlowError> {
        self.mutate("transfer reject", kind, name, client, |_, resolved| {
            ops::reject_transfer(resolved, client)
        })
    }

    /// Cancel a pending transfer.
    pub fn cancel_transfer(
        &self,
        kind: ResourceKind,
        name: &str,
        client: &ClientId,
    ) -> Result<Resource, FlowError> {
        self.mutate("transfer cancel", kind, name, client, |_, resolved| {
            ops::cancel_transfer(resolved, client)
        })
    }

    /// Change registry statuses as superuser.
    pub fn update_server_status(
        &self,
        kind: ResourceKind,
        name: &str,
        add: &BTreeSet<StatusValue>,
        remove: &BTreeSet<StatusValue>,
    ) -> Result<Resource, FlowError> {
        self.mutate("server status update", kind, name, &"superuser", |ctx, resolved| {
            ops::update_server_status(ctx, resolved, add, remove)
        })
    }

    /// Change registrar statuses.
    pub fn update_client_status(
        &self,
        kind: ResourceKind,
        name: &str,
        client: &ClientId,
        add: &BTreeSet<StatusValue>,
        remove: &BTreeSet<StatusValue>,
    ) -> Result<Resource, FlowError> {
        self.mutate("client status update", kind, name, client, |_, resolved| {
            ops::update_client_status(resolved, client, add, remove)
        })
    }

    fn load(&self, kind: ResourceKind, name: &str, now: Timestamp) -> Result<Resource, FlowError> {
        self.store
            .load_by_name(kind, name, now)
            .ok_or_else(|| FlowError::ResourceDoesNotExist {
                kind,
                name: name.to_string(),
            })
    }

    fn ensure_available(&self, kind: ResourceKind, name: &str, now: Timestamp) -> Result<(), FlowError> {
        match self.store.load_by_name(kind, name, now) {
            Some(_) => Err(FlowError::ResourceAlreadyExists {
                kind,
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn mutate<F>(
        &self,
        operation: &'static str,
        kind: ResourceKind,
        name: &str,
        actor: &dyn fmt::Display,
        op: F,
    ) -> Result<Resource, FlowError>
    where
        F: Fn(&FlowContext<'_>, &ResolvedResource) -> Result<FlowOutcome, FlowError>,
    {
        self.run(operation, name, actor, |now| {
            let stored = self.load(kind, name, now)?;
            let resolved = resolve(&stored, now, &self.config);
            op(&self.ctx(), &resolved)
        })
    }

    fn run<F>(
        &self,
        operation: &'static str,
        name: &str,
        actor: &dyn fmt::Display,
        attempt: F,
    ) -> Result<Resource, FlowError>
    where
        F: Fn(Timestamp) -> Result<FlowOutcome, FlowError>,
    {
        let mut retries = 0;
        loop {
            let outcome = attempt(self.clock.now())?;
            match self.store.commit(outcome) {
                Ok(resource) => {
                    info!(
                        resource = name,
                        client = %actor,
                        operation,
                        revision = resource.base().revision,
                        "committed"
                    );
                    return Ok(resource);
                }
                Err(err) if err.is_retryable() && retries < self.config.max_contention_retries => {
                    retries += 1;
                    warn!(
                        resource = name,
                        client = %actor,
                        operation,
                        retry = retries,
                        error = %err,
                        "retrying after contention"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::pricing::TldPricing;
    use crate::resource::DeletionPhase;
    use chrono::Duration;
    use rgy_state::AllocationToken;

    fn at(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn client() -> ClientId {
        ClientId::new("TheRegistrar").unwrap()
    }

    fn registry(now: &str) -> Registry<FakeClock, TldPricing> {
        let config = RegistryConfig::with_tlds(["tld"]);
        Registry::new(config.clone(), FakeClock::new(at(now)), TldPricing::new(config))
    }

    #[test]
    fn info_projects_at_the_clock() {
        let registry = registry("2000-06-01T00:00:00Z");
        registry.create_domain("example.tld", &client(), 1, None).unwrap();
        registry.clock().set(at("2001-06-02T00:00:00Z"));
        let info = registry.info(ResourceKind::Domain, "example.tld").unwrap();
        let domain = info.as_domain().unwrap();
        assert_eq!(domain.registration_expiration_time, at("2002-06-01T00:00:00Z"));
        let stored = registry
            .store()
            .load_by_name(ResourceKind::Domain, "example.tld", at("2001-06-02T00:00:00Z"))
            .unwrap();
        assert_eq!(
            stored.as_domain().unwrap().registration_expiration_time,
            at("2001-06-01T00:00:00Z")
        );
    }

    #[test]
    fn duplicate_create_is_rejected_until_purge() {
        let registry = registry("2000-06-01T00:00:00Z");
        registry.create_domain("example.tld", &client(), 1, None).unwrap();
        registry.clock().set(at("2000-07-01T00:00:00Z"));
        assert!(matches!(
            registry.create_domain("example.tld", &client(), 1, None),
            Err(FlowError::ResourceAlreadyExists { .. })
        ));
        registry
            .delete(ResourceKind::Domain, "example.tld", &client())
            .unwrap();
        let info = registry.info(ResourceKind::Domain, "example.tld").unwrap();
        assert_eq!(
            info.as_domain().unwrap().deletion_phase(registry.clock().now()),
            DeletionPhase::Redemption
        );
        registry.clock().advance(Duration::days(35));
        assert!(matches!(
            registry.info(ResourceKind::Domain, "example.tld"),
            Err(FlowError::ResourceDoesNotExist { .. })
        ));
        registry.create_domain("example.tld", &client(), 1, None).unwrap();
    }

    #[test]
    fn allocation_tokens_are_looked_up_and_redeemed_once() {
        let registry = registry("2000-06-01T00:00:00Z");
        registry.store().put_token(
            AllocationToken::valid_between("promo", Timestamp::start_of_time(), Timestamp::end_of_time())
                .unwrap(),
        );
        assert!(matches!(
            registry.create_domain("one.tld", &client(), 1, Some("missing")),
            Err(FlowError::UnknownAllocationToken { .. })
        ));
        let created = registry.create_domain("one.tld", &client(), 1, Some("promo")).unwrap();
        assert_eq!(registry.store().token("promo").unwrap().redemption, Some(created.key()));
        assert!(matches!(
            registry.create_domain("two.tld", &client(), 1, Some("promo")),
            Err(FlowError::AllocationTokenNotValid { redeemed: true, .. })
        ));
    }

    #[test]
    fn missing_resource_is_reported() {
        let registry = registry("2000-06-01T00:00:00Z");
        assert!(matches!(
            registry.restore("nothing.tld", &client()),
            Err(FlowError::ResourceDoesNotExist { .. })
        ));
    }
}
