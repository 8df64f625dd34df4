//! # Grace Periods
//!
//! A grace period is a reversible window after a billable action. Deleting
//! a domain while a billable grace period is active voids that charge with a
//! [`Cancellation`](crate::event::Cancellation).
//!
//! | Kind | Opened by | Ends at | Billing reference |
//! |---|---|---|---|
//! | `Add` | create | create's `billing_time` | the create `OneTime` |
//! | `Renew` | renew | renew's `billing_time` | the renew `OneTime` |
//! | `AutoRenew` | anniversary (projected) | anniversary + auto-renew grace | the `Recurring` |
//! | `Transfer` | transfer approval | transfer's `billing_time` | the transfer `OneTime` |
//! | `Redemption` | non-immediate delete | delete + redemption length | none |
//!
//! Several grace periods, including several `Renew`, may be active at once.
//! `Redemption` is a status overlay, not a cancellable charge.

use serde::{Deserialize, Serialize};

use rgy_core::{ClientId, EntityKey, Timestamp};

use crate::error::BillingError;
use crate::event::{OneTime, Recurring};

/// Kind of grace period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GracePeriodStatus {
    /// After create.
    Add,
    /// After explicit renew.
    Renew,
    /// After an auto-renew anniversary.
    AutoRenew,
    /// After an approved transfer.
    Transfer,
    /// After a delete that did not take effect immediately.
    Redemption,
}

impl GracePeriodStatus {
    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Renew => "RENEW",
            Self::AutoRenew => "AUTO_RENEW",
            Self::Transfer => "TRANSFER",
            Self::Redemption => "REDEMPTION",
        }
    }

    /// Whether a grace period of this kind references a charge.
    pub fn is_billable(&self) -> bool {
        !matches!(self, Self::Redemption)
    }
}

impl std::fmt::Display for GracePeriodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reversible window on a domain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GracePeriod {
    /// Kind of window.
    pub kind: GracePeriodStatus,
    /// First instant at which the window is closed.
    pub expiration_time: Timestamp,
    /// Registrar that made the billable action.
    pub client_id: ClientId,
    /// The charge the window can void. `None` only for `Redemption`.
    pub billing_event: Option<EntityKey>,
}

impl GracePeriod {
    /// Window over a one-time charge, closing at its billing time.
    ///
    /// # Errors
    ///
    /// `AutoRenew` windows reference a `Recurring` and `Redemption` windows
    /// reference nothing; both are rejected here.
    pub fn for_one_time(kind: GracePeriodStatus, event: &OneTime) -> Result<Self, BillingError> {
        if matches!(kind, GracePeriodStatus::AutoRenew | GracePeriodStatus::Redemption) {
            return Err(BillingError::GracePeriodKindMismatch {
                kind,
                expected: "a one-time charge kind (ADD, RENEW, TRANSFER)".to_string(),
            });
        }
        Ok(Self {
            kind,
            expiration_time: event.billing_time,
            client_id: event.client_id.clone(),
            billing_event: Some(event.key),
        })
    }

    /// Auto-renew window over one anniversary of a recurrence.
    pub fn for_auto_renew(recurring: &Recurring, expiration_time: Timestamp) -> Self {
        Self {
            kind: GracePeriodStatus::AutoRenew,
            expiration_time,
            client_id: recurring.client_id.clone(),
            billing_event: Some(recurring.key),
        }
    }

    /// Auto-renew window built from stored keys, as the projection does.
    pub fn auto_renew_from_key(
        recurring: EntityKey,
        client_id: ClientId,
        expiration_time: Timestamp,
    ) -> Self {
        Self {
            kind: GracePeriodStatus::AutoRenew,
            expiration_time,
            client_id,
            billing_event: Some(recurring),
        }
    }

    /// Redemption window after a delete.
    pub fn redemption(expiration_time: Timestamp, client_id: ClientId) -> Self {
        Self {
            kind: GracePeriodStatus::Redemption,
            expiration_time,
            client_id,
            billing_event: None,
        }
    }

    /// Whether the window is open at `now`.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        now < self.expiration_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::BillingReason;
    use rgy_core::Money;

    fn at(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn renew_event() -> OneTime {
        OneTime {
            key: EntityKey::new(),
            reason: BillingReason::Renew,
            target_id: "example.tld".to_string(),
            client_id: ClientId::new("TheRegistrar").unwrap(),
            cost: Money::new("USD", 1100).unwrap(),
            event_time: at("2001-01-01T00:00:00Z"),
            billing_time: at("2001-01-06T00:00:00Z"),
            period_years: 1,
            parent: EntityKey::new(),
            flags: Default::default(),
        }
    }

    #[test]
    fn one_time_window_closes_at_billing_time() {
        let event = renew_event();
        let grace = GracePeriod::for_one_time(GracePeriodStatus::Renew, &event).unwrap();
        assert_eq!(grace.expiration_time, event.billing_time);
        assert!(grace.is_active_at(at("2001-01-05T23:59:59Z")));
        assert!(!grace.is_active_at(at("2001-01-06T00:00:00Z")));
    }

    #[test]
    fn one_time_window_rejects_recurring_kinds() {
        let event = renew_event();
        assert!(GracePeriod::for_one_time(GracePeriodStatus::AutoRenew, &event).is_err());
        assert!(GracePeriod::for_one_time(GracePeriodStatus::Redemption, &event).is_err());
    }

    #[test]
    fn redemption_is_not_billable() {
        let grace = GracePeriod::redemption(
            at("2001-02-01T00:00:00Z"),
            ClientId::new("TheRegistrar").unwrap(),
        );
        assert!(grace.billing_event.is_none());
        assert!(!grace.kind.is_billable());
    }

    #[test]
    fn several_renew_windows_coexist_in_a_set() {
        let first = GracePeriod::for_one_time(GracePeriodStatus::Renew, &renew_event()).unwrap();
        let second = GracePeriod::for_one_time(GracePeriodStatus::Renew, &renew_event()).unwrap();
        let set: std::collections::BTreeSet<_> = [first, second].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
