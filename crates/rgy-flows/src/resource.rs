//! # Registry Resources
//!
//! Domains, contacts and hosts share a [`ResourceBase`]. Capabilities that
//! only some kinds have are separate traits:
//!
//! | Kind | [`HasTransferData`] | [`HasGracePeriods`] |
//! |---|---|---|
//! | [`Domain`] | yes | yes |
//! | [`Contact`] | yes | no |
//! | [`Host`] | no | no |
//!
//! Resources refer to billing events and poll messages by [`EntityKey`]
//! only. A resource is never removed from storage; `deletion_time` closes
//! its validity interval, after which name lookups no longer find it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use rgy_billing::{GracePeriod, GracePeriodStatus};
use rgy_core::{ClientId, EntityKey, Timestamp};
use rgy_state::{StatusValue, TransferData};

use crate::error::FlowError;

/// Kind of resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A domain name.
    Domain,
    /// A contact object.
    Contact,
    /// A host (nameserver) object.
    Host,
}

impl ResourceKind {
    /// The canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Contact => "contact",
            Self::Host => "host",
        }
    }

    /// Parse a canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Domain, Self::Contact, Self::Host]
            .into_iter()
            .find(|kind| kind.as_str() == name)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields every resource carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBase {
    /// Storage key.
    pub key: EntityKey,
    /// Domain name, contact id or host name.
    pub name: String,
    /// Current sponsoring registrar.
    pub sponsor_client_id: ClientId,
    /// Registrar that created the resource.
    pub creation_client_id: ClientId,
    /// Current statuses. Empty means `ok`.
    pub status_values: BTreeSet<StatusValue>,
    /// When the resource was created.
    pub creation_time: Timestamp,
    /// Last mutation by a registrar or the registry.
    pub last_epp_update_time: Option<Timestamp>,
    /// Last time sponsorship moved.
    pub last_transfer_time: Option<Timestamp>,
    /// End of the validity interval. `END_OF_TIME` while live.
    pub deletion_time: Timestamp,
    /// Storage revision, bumped on every commit.
    pub revision: u64,
}

impl ResourceBase {
    /// A fresh, uncommitted resource.
    pub fn new(name: impl Into<String>, client_id: &ClientId, now: Timestamp) -> Self {
        Self {
            key: EntityKey::new(),
            name: name.into(),
            sponsor_client_id: client_id.clone(),
            creation_client_id: client_id.clone(),
            status_values: BTreeSet::new(),
            creation_time: now,
            last_epp_update_time: None,
            last_transfer_time: None,
            deletion_time: Timestamp::end_of_time(),
            revision: 0,
        }
    }

    /// Whether the resource is within its validity interval at `at`.
    pub fn exists_at(&self, at: Timestamp) -> bool {
        self.creation_time <= at && at < self.deletion_time
    }
}

/// Behavior common to every resource kind.
pub trait EppResource {
    /// Shared fields.
    fn base(&self) -> &ResourceBase;
    /// Shared fields, mutably.
    fn base_mut(&mut self) -> &mut ResourceBase;
    /// Kind of resource.
    fn kind(&self) -> ResourceKind;

    /// Domain name, contact id or host name.
    fn name(&self) -> &str {
        &self.base().name
    }

    /// Current sponsoring registrar.
    fn sponsor(&self) -> &ClientId {
        &self.base().sponsor_client_id
    }

    /// Whether `status` is present.
    fn has_status(&self, status: StatusValue) -> bool {
        self.base().status_values.contains(&status)
    }
}

/// Resources that can change sponsor through the transfer protocol.
pub trait HasTransferData: EppResource {
    /// The latest transfer attempt, if any.
    fn transfer_data(&self) -> Option<&TransferData>;
    /// Replace the latest transfer attempt.
    fn set_transfer_data(&mut self, transfer_data: Option<TransferData>);

    /// The attempt, if it is pending and has not lapsed at `now`.
    fn pending_transfer_at(&self, now: Timestamp) -> Option<&TransferData> {
        self.transfer_data().filter(|t| t.is_pending_at(now))
    }
}

/// Resources that carry grace periods.
pub trait HasGracePeriods: EppResource {
    /// Every stored grace period.
    fn grace_periods(&self) -> &BTreeSet<GracePeriod>;
    /// Every stored grace period, mutably.
    fn grace_periods_mut(&mut self) -> &mut BTreeSet<GracePeriod>;

    /// Grace periods still open at `now`.
    fn active_grace_periods(&self, now: Timestamp) -> Vec<&GracePeriod> {
        self.grace_periods()
            .iter()
            .filter(|g| g.is_active_at(now))
            .collect()
    }

    /// The first open grace period of `kind` at `now`.
    fn active_grace_period(&self, kind: GracePeriodStatus, now: Timestamp) -> Option<&GracePeriod> {
        self.grace_periods()
            .iter()
            .find(|g| g.kind == kind && g.is_active_at(now))
    }
}

/// Where a domain stands in the delete lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeletionPhase {
    /// Not deleted.
    Active,
    /// Deleted and still restorable.
    Redemption,
    /// Deleted, no longer restorable, not yet purged.
    PendingDelete,
    /// Gone; the name is available again.
    Purged,
}

/// A registered domain name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Shared fields.
    #[serde(flatten)]
    pub base: ResourceBase,
    /// TLD, the labels after the first.
    pub tld: String,
    /// When the registration lapses unless renewed.
    pub registration_expiration_time: Timestamp,
    /// The sponsor's `Recurring` auto-renew event.
    pub autorenew_billing_event: EntityKey,
    /// First anniversary of that recurrence. Later anniversaries are whole
    /// years from here, so a February 29th anchor recurs on leap days.
    pub autorenew_anchor_time: Timestamp,
    /// The sponsor's autorenew poll message.
    pub autorenew_poll_message: EntityKey,
    /// No anniversary at or after this instant auto-renews.
    pub autorenew_end_time: Timestamp,
    /// Notice queued for the purge instant after a non-immediate delete.
    pub deletion_poll_message: Option<EntityKey>,
    /// Reversible windows.
    pub grace_periods: BTreeSet<GracePeriod>,
    /// Latest transfer attempt.
    pub transfer_data: Option<TransferData>,
}

impl Domain {
    /// The auto-renew anniversary `years` after the anchor.
    pub fn anniversary(&self, years: u32) -> Timestamp {
        self.autorenew_anchor_time.plus_years(years)
    }

    /// The latest anniversary strictly before `at`, falling back to one
    /// year before `at` when the anchor is not earlier.
    pub fn anniversary_before(&self, at: Timestamp) -> Timestamp {
        let mut previous = None;
        for years in 0.. {
            let anniversary = self.anniversary(years);
            if anniversary >= at || anniversary.is_end_of_time() {
                break;
            }
            previous = Some(anniversary);
        }
        previous.unwrap_or_else(|| at.minus_years(1))
    }

    /// Where the domain stands in the delete lifecycle at `now`.
    pub fn deletion_phase(&self, now: Timestamp) -> DeletionPhase {
        if self.base.deletion_time <= now {
            DeletionPhase::Purged
        } else if !self.has_status(StatusValue::PendingDelete) {
            DeletionPhase::Active
        } else if self
            .active_grace_period(GracePeriodStatus::Redemption, now)
            .is_some()
        {
            DeletionPhase::Redemption
        } else {
            DeletionPhase::PendingDelete
        }
    }
}

/// The TLD of a domain name: everything after the first label.
pub fn tld_of(name: &str) -> Result<&str, FlowError> {
    match name.split_once('.') {
        Some((label, tld)) if !label.is_empty() && !tld.is_empty() => Ok(tld),
        _ => Err(FlowError::InvalidDomainName {
            name: name.to_string(),
        }),
    }
}

impl EppResource for Domain {
    fn base(&self) -> &ResourceBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut ResourceBase {
        &mut self.base
    }
    fn kind(&self) -> ResourceKind {
        ResourceKind::Domain
    }
}

impl HasTransferData for Domain {
    fn transfer_data(&self) -> Option<&TransferData> {
        self.transfer_data.as_ref()
    }
    fn set_transfer_data(&mut self, transfer_data: Option<TransferData>) {
        self.transfer_data = transfer_data;
    }
}

impl HasGracePeriods for Domain {
    fn grace_periods(&self) -> &BTreeSet<GracePeriod> {
        &self.grace_periods
    }
    fn grace_periods_mut(&mut self) -> &mut BTreeSet<GracePeriod> {
        &mut self.grace_periods
    }
}

/// A registrant or administrative contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Shared fields.
    #[serde(flatten)]
    pub base: ResourceBase,
    /// Latest transfer attempt.
    pub transfer_data: Option<TransferData>,
}

impl EppResource for Contact {
    fn base(&self) -> &ResourceBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut ResourceBase {
        &mut self.base
    }
    fn kind(&self) -> ResourceKind {
        ResourceKind::Contact
    }
}

impl HasTransferData for Contact {
    fn transfer_data(&self) -> Option<&TransferData> {
        self.transfer_data.as_ref()
    }
    fn set_transfer_data(&mut self, transfer_data: Option<TransferData>) {
        self.transfer_data = transfer_data;
    }
}

/// A nameserver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Shared fields.
    #[serde(flatten)]
    pub base: ResourceBase,
}

impl EppResource for Host {
    fn base(&self) -> &ResourceBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut ResourceBase {
        &mut self.base
    }
    fn kind(&self) -> ResourceKind {
        ResourceKind::Host
    }
}

/// Any resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    /// A domain.
    Domain(Domain),
    /// A contact.
    Contact(Contact),
    /// A host.
    Host(Host),
}

impl Resource {
    /// Kind of resource.
    pub fn kind(&self) -> ResourceKind {
        self.as_epp().kind()
    }

    /// Shared fields.
    pub fn base(&self) -> &ResourceBase {
        self.as_epp().base()
    }

    /// Shared fields, mutably.
    pub fn base_mut(&mut self) -> &mut ResourceBase {
        match self {
            Self::Domain(d) => &mut d.base,
            Self::Contact(c) => &mut c.base,
            Self::Host(h) => &mut h.base,
        }
    }

    /// Storage key.
    pub fn key(&self) -> EntityKey {
        self.base().key
    }

    /// Domain name, contact id or host name.
    pub fn name(&self) -> &str {
        &self.base().name
    }

    /// The resource as its common trait.
    pub fn as_epp(&self) -> &dyn EppResource {
        match self {
            Self::Domain(d) => d,
            Self::Contact(c) => c,
            Self::Host(h) => h,
        }
    }

    /// The domain, if this is one.
    pub fn as_domain(&self) -> Option<&Domain> {
        match self {
            Self::Domain(d) => Some(d),
            _ => None,
        }
    }

    /// The contact, if this is one.
    pub fn as_contact(&self) -> Option<&Contact> {
        match self {
            Self::Contact(c) => Some(c),
            _ => None,
        }
    }

    /// The transfer capability, for domains and contacts.
    pub fn as_transferable(&self) -> Option<&dyn HasTransferData> {
        match self {
            Self::Domain(d) => Some(d),
            Self::Contact(c) => Some(c),
            Self::Host(_) => None,
        }
    }
}
