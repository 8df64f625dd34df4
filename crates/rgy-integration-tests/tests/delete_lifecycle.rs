//! # Delete, redemption and restore
//!
//! Driven through the `Registry` façade with a fake clock, so every read
//! goes through the resolver and every write through the store.

use chrono::Duration;

use rgy_billing::{BillingEvent, BillingReason, PollMessage};
use rgy_core::{ClientId, Timestamp};
use rgy_flows::{
    Clock, DeletionPhase, Domain, FakeClock, FlowError, Registry, RegistryConfig, ResourceKind, TldPricing,
};
use rgy_state::StatusValue;

fn at(s: &str) -> Timestamp {
    Timestamp::parse(s).unwrap()
}

fn registrar() -> ClientId {
    ClientId::new("TheRegistrar").unwrap()
}

fn registry(now: &str) -> Registry<FakeClock, TldPricing> {
    let config = RegistryConfig::with_tlds(["tld"]);
    Registry::new(config.clone(), FakeClock::new(at(now)), TldPricing::new(config))
}

fn info(registry: &Registry<FakeClock, TldPricing>) -> Domain {
    registry
        .info(ResourceKind::Domain, "example.tld")
        .unwrap()
        .as_domain()
        .unwrap()
        .clone()
}

fn cancellations(registry: &Registry<FakeClock, TldPricing>) -> Vec<rgy_billing::Cancellation> {
    registry
        .store()
        .billing_events_for("example.tld")
        .into_iter()
        .filter_map(|event| match event {
            BillingEvent::Cancellation(c) => Some(c),
            _ => None,
        })
        .collect()
}

#[test]
fn delete_inside_add_grace_is_immediate_and_refunded() {
    let registry = registry("2000-06-01T00:00:00Z");
    registry.create_domain("example.tld", &registrar(), 1, None).unwrap();
    let create_event = registry
        .store()
        .billing_events_for("example.tld")
        .into_iter()
        .find(|event| event.reason() == BillingReason::Create)
        .unwrap();

    registry.clock().set(at("2000-06-02T00:00:00Z"));
    registry
        .delete(ResourceKind::Domain, "example.tld", &registrar())
        .unwrap();

    let refunds = cancellations(&registry);
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].voided_event, create_event.key());
    assert!(matches!(
        registry.info(ResourceKind::Domain, "example.tld"),
        Err(FlowError::ResourceDoesNotExist { .. })
    ));
    assert!(registry
        .store()
        .load_by_name(ResourceKind::Domain, "example.tld", at("2000-06-02T00:00:00Z"))
        .is_none());
    assert!(registry
        .store()
        .load_by_name(ResourceKind::Domain, "example.tld", at("2000-06-01T23:59:59Z"))
        .is_some());
}

#[test]
fn delete_after_add_grace_goes_through_redemption_and_pending_delete() {
    let registry = registry("2000-06-01T00:00:00Z");
    registry.create_domain("example.tld", &registrar(), 1, None).unwrap();
    registry.clock().set(at("2000-07-07T00:00:00Z"));
    registry
        .delete(ResourceKind::Domain, "example.tld", &registrar())
        .unwrap();
    assert!(cancellations(&registry).is_empty());

    let deleted = info(&registry);
    assert!(deleted.base.status_values.contains(&StatusValue::PendingDelete));
    assert_eq!(deleted.deletion_phase(registry.clock().now()), DeletionPhase::Redemption);

    registry.clock().set(at("2000-08-06T00:00:00Z"));
    assert_eq!(info(&registry).deletion_phase(registry.clock().now()), DeletionPhase::PendingDelete);
    assert!(matches!(
        registry.restore("example.tld", &registrar()),
        Err(FlowError::DomainNotInRedemption { .. })
    ));

    registry.clock().set(at("2000-08-10T23:59:59Z"));
    assert!(matches!(
        registry.create_domain("example.tld", &registrar(), 1, None),
        Err(FlowError::ResourceAlreadyExists { .. })
    ));

    registry.clock().advance(Duration::seconds(1));
    assert!(matches!(
        registry.info(ResourceKind::Domain, "example.tld"),
        Err(FlowError::ResourceDoesNotExist { .. })
    ));
    let purge_notices: Vec<_> = registry
        .store()
        .poll_messages_for(&registrar(), registry.clock().now())
        .into_iter()
        .filter(|message| matches!(message, PollMessage::OneTime(m) if m.message == "Domain deleted."))
        .collect();
    assert_eq!(purge_notices.len(), 1);

    let recreated = registry.create_domain("example.tld", &registrar(), 1, None).unwrap();
    assert_eq!(recreated.base().creation_time, at("2000-08-11T00:00:00Z"));
}

#[test]
fn restore_returns_the_domain_to_service() {
    let registry = registry("2000-06-01T00:00:00Z");
    registry.create_domain("example.tld", &registrar(), 1, None).unwrap();
    registry.clock().set(at("2000-07-07T00:00:00Z"));
    registry
        .delete(ResourceKind::Domain, "example.tld", &registrar())
        .unwrap();
    let purge_notice = info(&registry).deletion_poll_message.unwrap();

    registry.clock().set(at("2000-07-20T00:00:00Z"));
    registry.restore("example.tld", &registrar()).unwrap();

    let restored = info(&registry);
    assert_eq!(restored.deletion_phase(registry.clock().now()), DeletionPhase::Active);
    assert_eq!(restored.registration_expiration_time, at("2002-06-01T00:00:00Z"));
    assert!(registry.store().poll_message(purge_notice).is_none());
    let reasons: Vec<_> = registry
        .store()
        .billing_events_for("example.tld")
        .iter()
        .filter(|event| event.event_time() == at("2000-07-20T00:00:00Z"))
        .map(BillingEvent::reason)
        .collect();
    assert!(reasons.contains(&BillingReason::Restore));
    assert!(reasons.contains(&BillingReason::Renew));
    assert!(registry
        .store()
        .load_by_name(ResourceKind::Domain, "example.tld", at("2020-01-01T00:00:00Z"))
        .is_some());
}

#[test]
fn auto_renew_is_refunded_when_deleted_inside_its_grace() {
    let registry = registry("2000-06-01T00:00:00Z");
    let created = registry.create_domain("example.tld", &registrar(), 1, None).unwrap();
    let recurring = created.as_domain().unwrap().autorenew_billing_event;

    registry.clock().set(at("2001-06-10T00:00:00Z"));
    registry
        .delete(ResourceKind::Domain, "example.tld", &registrar())
        .unwrap();
    let refunds = cancellations(&registry);
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].voided_event, recurring);
    assert_eq!(refunds[0].reason, BillingReason::AutoRenew);
    assert_eq!(refunds[0].billing_time, at("2001-07-16T00:00:00Z"));
}

#[test]
fn refunded_auto_renew_year_is_not_kept_through_restore() {
    let registry = registry("2000-06-01T00:00:00Z");
    registry.create_domain("example.tld", &registrar(), 1, None).unwrap();

    registry.clock().set(at("2001-06-10T00:00:00Z"));
    assert_eq!(info(&registry).registration_expiration_time, at("2002-06-01T00:00:00Z"));
    registry
        .delete(ResourceKind::Domain, "example.tld", &registrar())
        .unwrap();
    assert_eq!(info(&registry).registration_expiration_time, at("2001-06-01T00:00:00Z"));

    registry.clock().set(at("2001-06-20T00:00:00Z"));
    assert_eq!(info(&registry).registration_expiration_time, at("2001-06-01T00:00:00Z"));
    registry.restore("example.tld", &registrar()).unwrap();
    assert_eq!(info(&registry).registration_expiration_time, at("2002-06-20T00:00:00Z"));

    let billed_years: u32 = registry
        .store()
        .billing_events_for("example.tld")
        .iter()
        .filter_map(|event| match event {
            BillingEvent::OneTime(charge) => Some(charge.period_years),
            _ => None,
        })
        .sum();
    assert_eq!(billed_years, 2);
    assert_eq!(cancellations(&registry).len(), 1);
}
