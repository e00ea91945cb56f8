use std::collections::{BTreeMap, BTreeSet};

use avl_offset_tree::{AvlTreeMap, AvlTreeSet, TreeError};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// The number of operations to perform in each proptest case.
const TEST_SIZE: usize = 5_000;

/// Keys drawn from a range smaller than `TEST_SIZE` so operations collide.
fn key_strategy() -> impl Strategy<Value = i64> {
    -2_000i64..2_000i64
}

fn value_strategy() -> impl Strategy<Value = i64> {
    any::<i64>()
}

// ─── Operations enum for driving randomized tests ────────────────────────────

#[derive(Debug, Clone)]
enum MapOp {
    Add(i64, i64),
    Insert(i64, i64),
    Set(i64, i64),
    Remove(i64),
    Get(i64),
    NearestLess(i64),
    NearestGreaterOrEqual(i64),
    Least,
    Greatest,
}

fn map_op_strategy() -> impl Strategy<Value = MapOp> {
    prop_oneof![
        4 => (key_strategy(), value_strategy()).prop_map(|(k, v)| MapOp::Add(k, v)),
        2 => (key_strategy(), value_strategy()).prop_map(|(k, v)| MapOp::Insert(k, v)),
        1 => (key_strategy(), value_strategy()).prop_map(|(k, v)| MapOp::Set(k, v)),
        3 => key_strategy().prop_map(MapOp::Remove),
        2 => key_strategy().prop_map(MapOp::Get),
        1 => key_strategy().prop_map(MapOp::NearestLess),
        1 => key_strategy().prop_map(MapOp::NearestGreaterOrEqual),
        1 => Just(MapOp::Least),
        1 => Just(MapOp::Greatest),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Replays random operations on both `AvlTreeMap` and `BTreeMap` and
    /// asserts identical results at every step.
    #[test]
    fn map_ops_match_btreemap(ops in proptest::collection::vec(map_op_strategy(), TEST_SIZE)) {
        let mut avl: AvlTreeMap<i64, i64> = AvlTreeMap::new();
        let mut bt: BTreeMap<i64, i64> = BTreeMap::new();

        for op in &ops {
            match *op {
                MapOp::Add(k, v) => {
                    let expected = if bt.contains_key(&k) {
                        Err(TreeError::AlreadyPresent)
                    } else {
                        bt.insert(k, v);
                        Ok(())
                    };
                    prop_assert_eq!(avl.add(k, v), expected, "add({}, {})", k, v);
                }
                MapOp::Insert(k, v) => {
                    prop_assert_eq!(avl.insert(k, v), Ok(bt.insert(k, v)), "insert({}, {})", k, v);
                }
                MapOp::Set(k, v) => {
                    let expected = bt.get_mut(&k).map(|slot| *slot = v).ok_or(TreeError::NotFound);
                    prop_assert_eq!(avl.set(&k, v), expected, "set({}, {})", k, v);
                }
                MapOp::Remove(k) => {
                    prop_assert_eq!(avl.try_remove(&k), bt.remove(&k), "remove({})", k);
                }
                MapOp::Get(k) => {
                    prop_assert_eq!(avl.try_get(&k), bt.get(&k), "get({})", k);
                }
                MapOp::NearestLess(k) => {
                    prop_assert_eq!(avl.nearest_less(&k), bt.range(..k).next_back(), "nearest_less({})", k);
                }
                MapOp::NearestGreaterOrEqual(k) => {
                    prop_assert_eq!(avl.nearest_greater_or_equal(&k), bt.range(k..).next(), "nearest_greater_or_equal({})", k);
                }
                MapOp::Least => prop_assert_eq!(avl.least(), bt.first_key_value()),
                MapOp::Greatest => prop_assert_eq!(avl.greatest(), bt.last_key_value()),
            }
            prop_assert_eq!(avl.len(), bt.len(), "len mismatch after {:?}", op);
        }

        prop_assert!(avl.iter().eq(bt.iter()));
        prop_assert!(avl.iter().rev().eq(bt.iter().rev()));
        prop_assert!(avl.keys().eq(bt.keys()));
        prop_assert!(avl.values().eq(bt.values()));
    }

    /// Iteration from both ends meets in the middle without repeats.
    #[test]
    fn iter_size_and_double_ended(entries in proptest::collection::vec((key_strategy(), value_strategy()), 1..TEST_SIZE)) {
        let mut avl = AvlTreeMap::new();
        let mut bt = BTreeMap::new();
        for &(k, v) in &entries {
            avl.insert(k, v).unwrap();
            bt.insert(k, v);
        }

        let mut avl_iter = avl.iter();
        let mut bt_iter = bt.iter();
        let mut front = true;
        loop {
            prop_assert_eq!(avl_iter.len(), bt_iter.len());
            let (a, b) = if front { (avl_iter.next(), bt_iter.next()) } else { (avl_iter.next_back(), bt_iter.next_back()) };
            prop_assert_eq!(a, b);
            if a.is_none() {
                break;
            }
            front = !front;
        }
    }

    /// Sets behave like `BTreeSet` under random adds and removes.
    #[test]
    fn set_ops_match_btreeset(ops in proptest::collection::vec((any::<bool>(), key_strategy()), TEST_SIZE)) {
        let mut avl = AvlTreeSet::new();
        let mut bt = BTreeSet::new();
        for &(add, k) in &ops {
            if add {
                prop_assert_eq!(avl.try_add(k), Ok(bt.insert(k)));
            } else {
                prop_assert_eq!(avl.try_remove(&k), bt.remove(&k));
            }
            prop_assert_eq!(avl.contains(&k), bt.contains(&k));
        }
        prop_assert!(avl.iter().eq(bt.iter()));
        prop_assert_eq!(avl.nearest_less_or_equal(&0), bt.range(..=0).next_back());
        prop_assert_eq!(avl.nearest_greater(&0), bt.range(1..).next());
    }
}

#[test]
fn clone_is_independent() {
    let mut original = AvlTreeMap::new();
    for k in 0..100 {
        original.add(k, k * k).unwrap();
    }
    let mut copy = original.clone();
    copy.remove(&50).unwrap();
    *copy.get_mut(&10).unwrap() = -1;

    assert_eq!(original.len(), 100);
    assert_eq!(original.get(&50), Ok(&2500));
    assert_eq!(original[&10], 100);
    assert_eq!(copy.len(), 99);
    assert_eq!(copy.try_get(&10), Some(&-1));
}

#[test]
fn debug_output_lists_entries_in_order() {
    let mut map = AvlTreeMap::new();
    map.add(2, "two").unwrap();
    map.add(1, "one").unwrap();
    assert_eq!(format!("{map:?}"), r#"{1: "one", 2: "two"}"#);

    let mut set = AvlTreeSet::new();
    set.add('b').unwrap();
    set.add('a').unwrap();
    assert_eq!(format!("{set:?}"), "{'a', 'b'}");
}

#[test]
fn clear_resets_the_map() {
    let mut map: AvlTreeMap<u32, ()> = (0..64).fold(AvlTreeMap::new(), |mut map, k| {
        map.add(k, ()).unwrap();
        map
    });
    map.clear();
    assert!(map.is_empty());
    assert_eq!(map.least(), None);
    assert_eq!(map.iter().next(), None);
    map.add(7, ()).unwrap();
    assert_eq!(map.keys().copied().collect::<Vec<_>>(), [7]);
}
