//! # Billing Events
//!
//! The durable financial record of the registry. Three kinds:
//!
//! - [`OneTime`]: a single charge (create, renew, transfer, restore,
//!   server status change). `billing_time` is when the charge becomes final:
//!   the end of its grace period, or `event_time` when it has none.
//! - [`Recurring`]: the annual auto-renew charge. One instance per
//!   anniversary of `event_time` strictly before `recurrence_end_time`.
//! - [`Cancellation`]: voids one charge (a `OneTime`, or one anniversary of
//!   a `Recurring`). Its `billing_time` always equals the billing time of
//!   what it voids, so invoicing can net the two in the same period.
//!
//! Events reference their parent history entry and the voided event by
//! [`EntityKey`] only.

use std::collections::BTreeSet;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use rgy_core::{ClientId, EntityKey, Money, Timestamp};

use crate::error::BillingError;
use crate::grace::GracePeriod;

/// Why a charge was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingReason {
    /// Initial registration.
    Create,
    /// Explicit renewal.
    Renew,
    /// Anniversary renewal.
    AutoRenew,
    /// Approved transfer.
    Transfer,
    /// Restore out of redemption.
    Restore,
    /// Registry-applied status change.
    ServerStatus,
}

impl BillingReason {
    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Renew => "RENEW",
            Self::AutoRenew => "AUTO_RENEW",
            Self::Transfer => "TRANSFER",
            Self::Restore => "RESTORE",
            Self::ServerStatus => "SERVER_STATUS",
        }
    }
}

impl std::fmt::Display for BillingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Markers on billing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingFlag {
    /// Part of the auto-renew machinery.
    AutoRenew,
}

/// A single charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneTime {
    /// Key of this event.
    pub key: EntityKey,
    /// Why the charge was made.
    pub reason: BillingReason,
    /// Name of the billed resource.
    pub target_id: String,
    /// Registrar charged.
    pub client_id: ClientId,
    /// Amount charged.
    pub cost: Money,
    /// When the billable action happened.
    pub event_time: Timestamp,
    /// When the charge becomes final.
    pub billing_time: Timestamp,
    /// Registration years purchased, zero for non-term charges.
    pub period_years: u32,
    /// History entry that produced this event.
    pub parent: EntityKey,
    /// Markers.
    pub flags: BTreeSet<BillingFlag>,
}

/// The annual auto-renew charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurring {
    /// Key of this event.
    pub key: EntityKey,
    /// Always [`BillingReason::AutoRenew`] today.
    pub reason: BillingReason,
    /// Name of the billed resource.
    pub target_id: String,
    /// Registrar charged.
    pub client_id: ClientId,
    /// The first anniversary. Later ones recur yearly.
    pub event_time: Timestamp,
    /// No anniversary at or after this instant is billed.
    pub recurrence_end_time: Timestamp,
    /// Markers.
    pub flags: BTreeSet<BillingFlag>,
    /// History entry that produced this event.
    pub parent: EntityKey,
}

impl Recurring {
    /// Start an open-ended auto-renew recurrence at `first_anniversary`.
    pub fn auto_renew(
        target_id: &str,
        client_id: &ClientId,
        first_anniversary: Timestamp,
        parent: EntityKey,
    ) -> Self {
        Self {
            key: EntityKey::new(),
            reason: BillingReason::AutoRenew,
            target_id: target_id.to_string(),
            client_id: client_id.clone(),
            event_time: first_anniversary,
            recurrence_end_time: Timestamp::end_of_time(),
            flags: [BillingFlag::AutoRenew].into_iter().collect(),
            parent,
        }
    }

    /// Anniversaries in `[from, to)` that this recurrence bills.
    pub fn anniversaries_between(&self, from: Timestamp, to: Timestamp) -> Vec<Timestamp> {
        let end = to.min(self.recurrence_end_time);
        let mut found = Vec::new();
        let mut years = 0u32;
        loop {
            let anniversary = self.event_time.plus_years(years);
            if anniversary >= end || anniversary.is_end_of_time() {
                break;
            }
            if anniversary >= from {
                found.push(anniversary);
            }
            years += 1;
        }
        found
    }

    /// Billing time of the instance at `anniversary`: the end of its
    /// auto-renew grace period.
    pub fn billing_time_for(&self, anniversary: Timestamp, auto_renew_grace: Duration) -> Timestamp {
        anniversary.plus(auto_renew_grace)
    }
}

/// Voids one charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    /// Key of this event.
    pub key: EntityKey,
    /// Reason of the voided charge.
    pub reason: BillingReason,
    /// Name of the billed resource.
    pub target_id: String,
    /// Registrar credited.
    pub client_id: ClientId,
    /// When the reversing action happened.
    pub event_time: Timestamp,
    /// Billing time of the voided charge.
    pub billing_time: Timestamp,
    /// The voided `OneTime` or `Recurring`.
    pub voided_event: EntityKey,
    /// History entry that produced this event.
    pub parent: EntityKey,
}

impl Cancellation {
    /// Void the charge attached to an active grace period.
    ///
    /// For one-time charges the grace period ends at the charge's billing
    /// time; for auto-renew it ends at the anniversary's billing time. Either
    /// way the cancellation's billing time is the grace period's expiration.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::GracePeriodNotBillable`] for a grace period
    /// without a billing event (redemption).
    pub fn for_grace_period(
        grace_period: &GracePeriod,
        reason: BillingReason,
        target_id: &str,
        event_time: Timestamp,
        parent: EntityKey,
    ) -> Result<Self, BillingError> {
        let voided_event = grace_period
            .billing_event
            .ok_or(BillingError::GracePeriodNotBillable {
                kind: grace_period.kind,
            })?;
        Ok(Self {
            key: EntityKey::new(),
            reason,
            target_id: target_id.to_string(),
            client_id: grace_period.client_id.clone(),
            event_time,
            billing_time: grace_period.expiration_time,
            voided_event,
            parent,
        })
    }

    /// Check that this cancellation lines up with the event it voids.
    pub fn check_voids(&self, voided: &BillingEvent) -> Result<(), BillingError> {
        if voided.key() != self.voided_event {
            return Err(BillingError::CancellationMismatch {
                cancellation: self.key,
                reason: format!("voids {} but was checked against {}", self.voided_event, voided.key()),
            });
        }
        match voided {
            BillingEvent::OneTime(one_time) if one_time.billing_time != self.billing_time => {
                Err(BillingError::CancellationMismatch {
                    cancellation: self.key,
                    reason: format!(
                        "billing time {} differs from voided event billing time {}",
                        self.billing_time, one_time.billing_time
                    ),
                })
            }
            BillingEvent::Cancellation(_) => Err(BillingError::CancellationMismatch {
                cancellation: self.key,
                reason: "a cancellation cannot void another cancellation".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// Any billing event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BillingEvent {
    /// A single charge.
    OneTime(OneTime),
    /// An annual charge.
    Recurring(Recurring),
    /// A voiding record.
    Cancellation(Cancellation),
}

impl BillingEvent {
    /// Key of the event.
    pub fn key(&self) -> EntityKey {
        match self {
            Self::OneTime(e) => e.key,
            Self::Recurring(e) => e.key,
            Self::Cancellation(e) => e.key,
        }
    }

    /// Registrar charged or credited.
    pub fn client_id(&self) -> &ClientId {
        match self {
            Self::OneTime(e) => &e.client_id,
            Self::Recurring(e) => &e.client_id,
            Self::Cancellation(e) => &e.client_id,
        }
    }

    /// Name of the billed resource.
    pub fn target_id(&self) -> &str {
        match self {
            Self::OneTime(e) => &e.target_id,
            Self::Recurring(e) => &e.target_id,
            Self::Cancellation(e) => &e.target_id,
        }
    }

    /// When the action happened.
    pub fn event_time(&self) -> Timestamp {
        match self {
            Self::OneTime(e) => e.event_time,
            Self::Recurring(e) => e.event_time,
            Self::Cancellation(e) => e.event_time,
        }
    }

    /// The reason code.
    pub fn reason(&self) -> BillingReason {
        match self {
            Self::OneTime(e) => e.reason,
            Self::Recurring(e) => e.reason,
            Self::Cancellation(e) => e.reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grace::GracePeriodStatus;

    fn at(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn client() -> ClientId {
        ClientId::new("TheRegistrar").unwrap()
    }

    fn create_event() -> OneTime {
        OneTime {
            key: EntityKey::new(),
            reason: BillingReason::Create,
            target_id: "example.tld".to_string(),
            client_id: client(),
            cost: Money::new("USD", 2600).unwrap(),
            event_time: at("2000-06-01T00:00:00Z"),
            billing_time: at("2000-06-06T00:00:00Z"),
            period_years: 2,
            parent: EntityKey::new(),
            flags: BTreeSet::new(),
        }
    }

    #[test]
    fn recurring_anniversaries_respect_end_time() {
        let mut recurring = Recurring::auto_renew(
            "example.tld",
            &client(),
            at("2001-06-01T00:00:00Z"),
            EntityKey::new(),
        );
        let all = recurring.anniversaries_between(
            Timestamp::start_of_time(),
            at("2004-01-01T00:00:00Z"),
        );
        assert_eq!(
            all,
            vec![
                at("2001-06-01T00:00:00Z"),
                at("2002-06-01T00:00:00Z"),
                at("2003-06-01T00:00:00Z")
            ]
        );
        recurring.recurrence_end_time = at("2002-06-01T00:00:00Z");
        let truncated =
            recurring.anniversaries_between(Timestamp::start_of_time(), Timestamp::end_of_time());
        assert_eq!(truncated, vec![at("2001-06-01T00:00:00Z")]);
    }

    #[test]
    fn recurring_window_is_half_open() {
        let recurring = Recurring::auto_renew(
            "example.tld",
            &client(),
            at("2001-06-01T00:00:00Z"),
            EntityKey::new(),
        );
        let inside = recurring.anniversaries_between(
            at("2001-06-01T00:00:00Z"),
            at("2001-06-06T00:00:00Z"),
        );
        assert_eq!(inside.len(), 1);
        let outside = recurring.anniversaries_between(
            at("2001-05-27T00:00:00Z"),
            at("2001-06-01T00:00:00Z"),
        );
        assert!(outside.is_empty());
    }

    #[test]
    fn cancellation_carries_voided_billing_time() {
        let create = create_event();
        let grace = GracePeriod::for_one_time(GracePeriodStatus::Add, &create).unwrap();
        let cancellation = Cancellation::for_grace_period(
            &grace,
            BillingReason::Create,
            "example.tld",
            at("2000-06-02T00:00:00Z"),
            EntityKey::new(),
        )
        .unwrap();
        assert_eq!(cancellation.billing_time, create.billing_time);
        assert_eq!(cancellation.voided_event, create.key);
        assert!(cancellation.check_voids(&BillingEvent::OneTime(create)).is_ok());
    }

    #[test]
    fn cancellation_mismatch_detected() {
        let create = create_event();
        let grace = GracePeriod::for_one_time(GracePeriodStatus::Add, &create).unwrap();
        let mut cancellation = Cancellation::for_grace_period(
            &grace,
            BillingReason::Create,
            "example.tld",
            at("2000-06-02T00:00:00Z"),
            EntityKey::new(),
        )
        .unwrap();
        cancellation.billing_time = at("2000-06-03T00:00:00Z");
        assert!(cancellation.check_voids(&BillingEvent::OneTime(create)).is_err());
    }

    #[test]
    fn redemption_grace_is_not_cancellable() {
        let grace = GracePeriod::redemption(at("2000-08-01T00:00:00Z"), client());
        let err = Cancellation::for_grace_period(
            &grace,
            BillingReason::Create,
            "example.tld",
            at("2000-07-10T00:00:00Z"),
            EntityKey::new(),
        )
        .unwrap_err();
        assert!(matches!(err, BillingError::GracePeriodNotBillable { .. }));
    }

    #[test]
    fn billing_event_serde_is_tagged() {
        let json = serde_json::to_value(BillingEvent::OneTime(create_event())).unwrap();
        assert_eq!(json["kind"], "one_time");
        assert_eq!(json["reason"], "CREATE");
    }
}
