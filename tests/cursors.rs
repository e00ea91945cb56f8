use avl_offset_tree::{AvlMultiRankMap, AvlRange2Map, AvlRangeMap, AvlRankMap, AvlTreeMap, Side, TreeError};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Fast and robust cursors agree with each other and with `iter` on an
    /// unmodified map, in both directions.
    #[test]
    fn tree_map_cursors_agree(keys in proptest::collection::vec(any::<i32>(), 0..500)) {
        let mut map = AvlTreeMap::new();
        for k in keys {
            map.insert(k, k.wrapping_mul(3)).unwrap();
        }
        for forward in [true, false] {
            let mut fast = map.fast_cursor(forward);
            let mut robust = map.robust_cursor(forward, None);
            let mut fast_seen = Vec::new();
            let mut robust_seen = Vec::new();
            while let Some(entry) = fast.next(&map).unwrap() {
                fast_seen.push(entry);
            }
            while let Some(entry) = robust.next(&map) {
                robust_seen.push(entry);
            }
            let mut expected: Vec<_> = map.iter().collect();
            if !forward {
                expected.reverse();
            }
            prop_assert_eq!(&fast_seen, &expected);
            prop_assert_eq!(&robust_seen, &expected);
        }
    }

    #[test]
    fn range_map_cursors_agree(lengths in proptest::collection::vec(1i64..1_000, 0..500)) {
        let mut map: AvlRangeMap<usize, i64> = AvlRangeMap::new();
        for (value, length) in lengths.into_iter().enumerate() {
            let end = map.extent();
            map.insert(end, length, value).unwrap();
        }
        let mut fast = map.fast_cursor(true);
        let mut robust = map.robust_cursor(true, None);
        let mut iter = map.iter();
        while let Some(entry) = fast.next(&map).unwrap() {
            prop_assert_eq!(Some(entry), robust.next(&map));
            prop_assert_eq!(Some(entry), iter.next());
        }
        prop_assert_eq!(robust.next(&map), None);
        prop_assert_eq!(iter.next(), None);
    }

    #[test]
    fn range2_map_cursors_agree(pairs in proptest::collection::vec((1i32..50, 1i32..50), 0..300)) {
        let mut map = AvlRange2Map::new();
        for (value, (x, y)) in pairs.into_iter().enumerate() {
            let end = map.extent(Side::Y);
            map.insert(Side::Y, end, x, y, value).unwrap();
        }
        for side in [Side::X, Side::Y] {
            let mut fast = map.fast_cursor(false);
            let mut robust = map.robust_cursor(side, false, None);
            let mut iter = map.iter().rev();
            while let Some(entry) = fast.next(&map).unwrap() {
                prop_assert_eq!(Some(entry), robust.next(&map));
                prop_assert_eq!(Some(entry), iter.next());
            }
            prop_assert_eq!(robust.next(&map), None);
        }
    }
}

#[test]
fn every_fast_cursor_detects_modification() {
    let mut tree = AvlTreeMap::new();
    tree.add(1, ()).unwrap();
    let mut cursor = tree.fast_cursor(true);
    tree.try_remove(&1);
    assert_eq!(cursor.next(&tree), Err(TreeError::ConcurrentModification));

    let mut ranks = AvlRankMap::new();
    ranks.add('a', ()).unwrap();
    let mut cursor = ranks.fast_cursor(true);
    ranks.add('b', ()).unwrap();
    assert_eq!(cursor.next(&ranks), Err(TreeError::ConcurrentModification));

    let mut multi: AvlMultiRankMap<char, ()> = AvlMultiRankMap::new();
    multi.add('a', (), 2).unwrap();
    let mut cursor = multi.fast_cursor(false);
    multi.adjust_count('a', 1).unwrap();
    assert_eq!(cursor.next(&multi), Err(TreeError::ConcurrentModification));

    let mut ranges = AvlRangeMap::new();
    ranges.insert(0, 4, ()).unwrap();
    let mut cursor = ranges.fast_cursor(true);
    ranges.set_length(0, 6).unwrap();
    assert_eq!(cursor.next(&ranges), Err(TreeError::ConcurrentModification));

    let mut pairs = AvlRange2Map::new();
    pairs.insert(Side::X, 0, 1, 1, ()).unwrap();
    let mut cursor = pairs.fast_cursor(true);
    pairs.clear();
    assert_eq!(cursor.next(&pairs), Err(TreeError::ConcurrentModification));
}

#[test]
fn fast_cursor_refuses_a_different_map() {
    let mut a = AvlTreeMap::new();
    let mut c = AvlTreeMap::new();
    for k in 0..10 {
        a.add(k, k).unwrap();
        c.add(k + 100, k + 100).unwrap();
    }
    let mut cursor = a.fast_cursor(true);
    assert_eq!(cursor.next(&c), Err(TreeError::ConcurrentModification));
    assert_eq!(cursor.next(&a), Ok(Some((&0, &0))));
}

#[test]
fn value_writes_do_not_invalidate_fast_cursors() {
    let mut map = AvlTreeMap::new();
    map.add(1, 10).unwrap();
    map.add(2, 20).unwrap();
    let mut cursor = map.fast_cursor(true);
    assert_eq!(cursor.next(&map), Ok(Some((&1, &10))));
    map.set(&2, 21).unwrap();
    assert_eq!(cursor.next(&map), Ok(Some((&2, &21))));
    assert_eq!(cursor.next(&map), Ok(None));
}

#[test]
fn robust_cursor_sees_inserts_ahead_and_skips_removals() {
    let mut map = AvlRankMap::new();
    for k in [10, 20, 30, 40] {
        map.add(k, ()).unwrap();
    }
    let mut cursor = map.robust_cursor(true, None);
    let mut seen = Vec::new();
    while let Some(entry) = cursor.next(&map) {
        let key = *entry.key;
        seen.push((key, entry.rank));
        if key == 10 {
            map.add(5, ()).unwrap();
            map.add(25, ()).unwrap();
            map.remove(&30).unwrap();
        }
    }
    assert_eq!(seen, [(10, 0), (20, 2), (25, 3), (40, 4)]);
}

#[test]
fn robust_cursor_starts_at_a_key() {
    let mut map = AvlTreeMap::new();
    for k in (0..100).step_by(10) {
        map.add(k, ()).unwrap();
    }
    let mut cursor = map.robust_cursor(false, Some(45));
    let keys: Vec<_> = std::iter::from_fn(|| cursor.next(&map).map(|(k, ())| *k)).collect();
    assert_eq!(keys, [40, 30, 20, 10, 0]);
}
