//! # Time-versioned values
//!
//! Floor lookup and transition validation across the concrete
//! instantiations: token validity, TLD phases and fee schedules.

use proptest::prelude::*;

use rgy_core::{Money, Timestamp};
use rgy_state::timed::TransitionGraph;
use rgy_state::{FeeSchedule, StateError, TldState, TldStateSchedule, TokenStatus, TokenStatusMap};

fn at(s: &str) -> Timestamp {
    Timestamp::parse(s).unwrap()
}

/// Walk the token graph from `start`, picking successors by `choices`.
fn token_walk(start: TokenStatus, choices: &[usize]) -> Vec<TokenStatus> {
    let mut walk = vec![start];
    for choice in choices {
        let successors = walk[walk.len() - 1].valid_transitions();
        if successors.is_empty() {
            break;
        }
        walk.push(successors[choice % successors.len()]);
    }
    walk
}

fn instants(offsets: &std::collections::BTreeSet<i64>) -> Vec<Timestamp> {
    std::iter::once(Timestamp::start_of_time())
        .chain(offsets.iter().map(|secs| Timestamp::from_epoch_secs(*secs).unwrap()))
        .collect()
}

proptest! {
    #[test]
    fn graph_walks_construct_and_floor_lookup_holds(
        start_valid in any::<bool>(),
        choices in proptest::collection::vec(0usize..4, 0..4),
        offsets in proptest::collection::btree_set(1i64..2_000_000_000, 4),
        probe in 0i64..2_100_000_000,
    ) {
        let start = if start_valid { TokenStatus::Valid } else { TokenStatus::NotStarted };
        let walk = token_walk(start, &choices);
        let keys = instants(&offsets);
        let entries: Vec<_> = keys.iter().copied().zip(walk.iter().copied()).collect();
        let map = TokenStatusMap::new(entries.clone()).unwrap();

        let probe_at = Timestamp::from_epoch_secs(probe).unwrap();
        let expected = entries
            .iter()
            .filter(|(key, _)| *key <= probe_at)
            .last()
            .map(|(_, status)| *status)
            .unwrap();
        prop_assert_eq!(*map.value_at(probe_at), expected);
    }

    #[test]
    fn fee_schedule_floor_lookup(
        prices in proptest::collection::vec(1i64..100_000, 1..8),
        offsets in proptest::collection::btree_set(1i64..2_000_000_000, 7),
        probe in 0i64..2_100_000_000,
    ) {
        let keys = instants(&offsets);
        let entries: Vec<_> = keys
            .iter()
            .copied()
            .zip(prices.iter().map(|p| Money::new("USD", *p).unwrap()))
            .collect();
        let schedule = FeeSchedule::new(entries.clone()).unwrap();
        let probe_at = Timestamp::from_epoch_secs(probe).unwrap();
        let expected = entries
            .iter()
            .filter(|(key, _)| *key <= probe_at)
            .last()
            .map(|(_, price)| price.clone())
            .unwrap();
        prop_assert_eq!(schedule.value_at(probe_at), &expected);
    }
}

#[test]
fn illegal_token_transitions_are_rejected() {
    let start = Timestamp::start_of_time();
    let later = at("2020-01-01T00:00:00Z");
    let cases = [
        (TokenStatus::NotStarted, TokenStatus::Ended),
        (TokenStatus::Valid, TokenStatus::Valid),
        (TokenStatus::Ended, TokenStatus::Valid),
        (TokenStatus::Cancelled, TokenStatus::NotStarted),
    ];
    for (from, to) in cases {
        let err = TokenStatusMap::new(vec![(start, from), (later, to)]).unwrap_err();
        assert!(
            matches!(err, StateError::InvalidTransition { .. }),
            "{from} -> {to} gave {err:?}"
        );
    }
}

#[test]
fn schedules_require_start_of_time_and_sorted_keys() {
    assert!(matches!(
        TldStateSchedule::new(vec![(at("2020-01-01T00:00:00Z"), TldState::GeneralAvailability)]),
        Err(StateError::MissingStartOfTime { .. })
    ));
    assert!(matches!(
        TldStateSchedule::new(vec![
            (Timestamp::start_of_time(), TldState::GeneralAvailability),
            (at("2020-01-01T00:00:00Z"), TldState::GeneralAvailability),
            (at("2020-01-01T00:00:00Z"), TldState::GeneralAvailability),
        ]),
        Err(StateError::UnsortedOrDuplicateKey { .. })
    ));
}
