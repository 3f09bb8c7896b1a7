//! Model-based equivalence tests for the storage engine.
//!
//! Random op sequences run against both the engine and a reference model
//! (a `BTreeMap` plus explicit expiry instants) under a shared manual
//! clock. Every observable result must agree, and the engine's internal
//! indices must stay consistent after each step.

use super::engine::StorageEngine;
use crate::clock::{Clock, ManualClock};
use bytes::Bytes;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
enum Op {
    Set(Vec<u8>, Vec<u8>, u64),
    Remove(Vec<u8>),
    Get(Vec<u8>),
    GetMany(Vec<u8>, usize),
    Reap,
    Advance(u64),
}

/// Reference model: key -> (value, expiry). Expired entries stay until
/// removed or reaped, mirroring the engine's lazy expiry.
type Model = BTreeMap<Vec<u8>, (Vec<u8>, Option<Instant>)>;

fn live(entry: &(Vec<u8>, Option<Instant>), now: Instant) -> bool {
    entry.1.map_or(true, |at| at > now)
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A tiny alphabet forces key collisions and adjacent range scans
    prop::collection::vec(b'a'..=b'e', 0..=3)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let value = prop::collection::vec(any::<u8>(), 0..=4);
    let op = prop_oneof![
        30 => (key.clone(), value, 0u64..=8).prop_map(|(k, v, ttl)| Op::Set(k, v, ttl)),
        15 => key.clone().prop_map(Op::Remove),
        25 => key.clone().prop_map(Op::Get),
        15 => (key.clone(), 0usize..=6).prop_map(|(k, n)| Op::GetMany(k, n)),
        10 => Just(Op::Reap),
        5 => (1u64..=4).prop_map(Op::Advance),
    ];
    prop::collection::vec(op, 0..=300)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_engine_matches_model(ops in ops_strategy()) {
        let clock = ManualClock::new();
        let mut engine = StorageEngine::with_clock(clock.clone());
        let mut model: Model = BTreeMap::new();

        for op in ops {
            match op {
                Op::Set(key, value, ttl_secs) => {
                    let ttl = Duration::from_secs(ttl_secs);
                    let expiry = if ttl_secs == 0 {
                        None
                    } else {
                        Some(clock.now() + ttl)
                    };
                    engine.set(Bytes::from(key.clone()), Bytes::from(value.clone()), ttl);
                    model.insert(key, (value, expiry));
                }
                Op::Remove(key) => {
                    let removed_e = engine.remove(&key);
                    let removed_m = model.remove(&key).is_some();
                    prop_assert_eq!(removed_e, removed_m);
                }
                Op::Get(key) => {
                    let now = clock.now();
                    let got_e = engine.get(&key);
                    let got_m = model
                        .get(&key)
                        .filter(|&entry| live(entry, now))
                        .map(|entry| entry.0.clone());
                    prop_assert_eq!(got_e.map(|v| v.to_vec()), got_m);
                }
                Op::GetMany(start, count) => {
                    let now = clock.now();
                    let got: Vec<(Vec<u8>, Vec<u8>)> = engine
                        .get_many_sorted(&start, count)
                        .into_iter()
                        .map(|(k, v)| (k.to_vec(), v.to_vec()))
                        .collect();
                    let expected: Vec<(Vec<u8>, Vec<u8>)> = model
                        .range::<[u8], _>((Bound::Included(&start[..]), Bound::Unbounded))
                        .filter(|&(_, entry)| live(entry, now))
                        .take(count)
                        .map(|(k, entry)| (k.clone(), entry.0.clone()))
                        .collect();
                    prop_assert_eq!(got, expected);
                }
                Op::Reap => {
                    let now = clock.now();
                    match engine.remove_one_expired_entry() {
                        Some((key, value)) => {
                            let entry = model
                                .get(&key[..])
                                .expect("reaped key must exist in the model");
                            let deadline =
                                entry.1.expect("reaped key must have had an expiry");
                            prop_assert!(deadline <= now, "reaped entry was not expired");
                            prop_assert_eq!(value.as_ref(), &entry.0[..]);

                            // The engine promises the earliest deadline
                            let earliest = model
                                .values()
                                .filter_map(|(_, expiry)| *expiry)
                                .min()
                                .expect("model has at least the reaped deadline");
                            prop_assert_eq!(deadline, earliest);

                            model.remove(&key[..]);
                        }
                        None => {
                            prop_assert!(
                                model.values().all(|entry| {
                                    entry.1.map_or(true, |at| at > now)
                                }),
                                "engine reaped nothing while the model holds expired entries"
                            );
                        }
                    }
                }
                Op::Advance(secs) => {
                    clock.advance(Duration::from_secs(secs));
                }
            }

            // Physical record count agrees at every step: lazy expiry never
            // removes anything on its own
            prop_assert_eq!(engine.len(), model.len());
            engine.assert_invariants();
        }

        // Final full enumeration must agree
        let now = clock.now();
        let got: Vec<(Vec<u8>, Vec<u8>)> = engine
            .get_many_sorted(b"", usize::MAX)
            .into_iter()
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect();
        let expected: Vec<(Vec<u8>, Vec<u8>)> = model
            .iter()
            .filter(|&(_, entry)| live(entry, now))
            .map(|(k, entry)| (k.clone(), entry.0.clone()))
            .collect();
        prop_assert_eq!(got, expected);
    }
}
