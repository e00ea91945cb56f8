use avl_offset_tree::{AvlRange2Map, AvlRangeMap, Side, TreeError};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const TEST_SIZE: usize = 1_000;

fn build(lengths: &[i64]) -> AvlRangeMap<usize, i64> {
    let mut map = AvlRangeMap::new();
    for (value, &length) in lengths.iter().enumerate() {
        let end = map.extent();
        map.insert(end, length, value).unwrap();
    }
    map
}

fn placements(map: &AvlRangeMap<usize, i64>) -> Vec<(i64, i64, usize)> {
    map.iter().map(|e| (e.start, e.length, *e.value)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Resizing one segment moves exactly the segments after it.
    #[test]
    fn set_length_shifts_only_later_segments(
        lengths in proptest::collection::vec(1i64..1_000, 1..TEST_SIZE),
        pick in any::<usize>(),
        new_length in 1i64..1_000,
    ) {
        let mut map = build(&lengths);
        let before = placements(&map);
        let (start, old_length, _) = before[pick % before.len()];

        map.set_length(start, new_length).unwrap();
        let after = placements(&map);
        for (&(s0, l0, v0), &(s1, l1, v1)) in before.iter().zip(&after) {
            prop_assert_eq!(v0, v1);
            if s0 < start {
                prop_assert_eq!((s1, l1), (s0, l0));
            } else if s0 == start {
                prop_assert_eq!((s1, l1), (s0, new_length));
            } else {
                prop_assert_eq!((s1, l1), (s0 + new_length - old_length, l0));
            }
        }
        prop_assert_eq!(map.extent(), lengths.iter().sum::<i64>() + new_length - old_length);
    }

    /// Extent after a run of appends is the sum of the lengths, and every
    /// position maps back to the segment covering it.
    #[test]
    fn positions_resolve_to_covering_segment(lengths in proptest::collection::vec(1i64..50, 1..200)) {
        let map = build(&lengths);
        prop_assert_eq!(map.extent(), lengths.iter().sum::<i64>());
        let mut start = 0;
        for (value, &length) in lengths.iter().enumerate() {
            for position in start..start + length {
                let hit = map.nearest_less_or_equal(position).unwrap();
                prop_assert_eq!((hit.start, *hit.value), (start, value));
            }
            start += length;
        }
        prop_assert!(map.nearest_less_or_equal(-1).is_none());
        prop_assert!(map.nearest_greater_or_equal(map.extent()).is_none());
    }

    /// Deleting every segment in random order keeps the rest contiguous.
    #[test]
    fn deletions_keep_segments_contiguous(lengths in proptest::collection::vec(1i64..100, 1..300), picks in proptest::collection::vec(any::<usize>(), 300)) {
        let mut map = build(&lengths);
        let mut model: Vec<(i64, usize)> = lengths.iter().copied().zip(0..).collect();
        for pick in picks {
            if model.is_empty() {
                break;
            }
            let index = pick % model.len();
            let start: i64 = model[..index].iter().map(|&(length, _)| length).sum();
            let (_, value) = model.remove(index);
            prop_assert_eq!(map.delete(start), Ok(value));
        }
        let mut start = 0;
        for (entry, &(length, value)) in map.iter().zip(&model) {
            prop_assert_eq!((entry.start, entry.length, *entry.value), (start, length, value));
            start += length;
        }
        prop_assert_eq!(map.len(), model.len());
    }
}

#[test]
fn three_appended_segments() {
    let mut map = AvlRangeMap::new();
    map.insert(0, 3, "a").unwrap();
    map.insert(3, 5, "b").unwrap();
    map.insert(8, 2, "c").unwrap();
    assert_eq!(map.extent(), 10);
    let hit = map.nearest_less_or_equal(6).unwrap();
    assert_eq!((hit.start, hit.length, *hit.value), (3, 5, "b"));
}

#[test]
fn deleting_the_middle_segment() {
    let mut map = AvlRangeMap::new();
    for value in ["a", "b", "c"] {
        let end = map.extent();
        map.insert(end, 4, value).unwrap();
    }
    assert_eq!(map.delete(4), Ok("b"));
    assert_eq!(map.extent(), 8);
    let next = map.get(4).unwrap();
    assert_eq!((next.start, next.length, *next.value), (4, 4, "c"));
}

#[test]
fn inserting_in_front_pushes_everything_back() {
    let mut map = AvlRangeMap::new();
    map.insert(0, 10, 'x').unwrap();
    map.insert(10, 10, 'y').unwrap();
    map.insert(0, 5, 'w').unwrap();
    let all: Vec<_> = map.iter().map(|e| (e.start, e.end(), *e.value)).collect();
    assert_eq!(all, [(0, 5, 'w'), (5, 15, 'x'), (15, 25, 'y')]);
    assert_eq!(map.first().map(|e| *e.value), Some('w'));
    assert_eq!(map.last().map(|e| e.start), Some(15));
}

#[test]
fn mutable_values_stay_in_place() {
    let mut map = AvlRangeMap::new();
    map.insert(0, 2, 1).unwrap();
    map.insert(2, 2, 2).unwrap();
    *map.try_get_mut(2).unwrap() *= 10;
    assert_eq!(map.try_get_mut(1), None);
    assert_eq!(map.get(2).map(|e| *e.value), Ok(20));
}

#[test]
fn adjust_length_to_zero_deletes() {
    let mut map = AvlRangeMap::new();
    map.insert(0, 3, 'a').unwrap();
    map.insert(3, 3, 'b').unwrap();
    assert_eq!(map.adjust_length(0, 2), Ok(5));
    assert_eq!(map.get(5).map(|e| *e.value), Ok('b'));
    assert!(matches!(map.adjust_length(5, -4), Err(TreeError::OutOfRange(_))));
    assert_eq!(map.adjust_length(5, -3), Ok(0));
    assert_eq!(map.len(), 1);
    assert_eq!(map.extent(), 5);
}

#[test]
fn pairs_are_addressable_from_either_side() {
    let mut map = AvlRange2Map::new();
    map.insert(Side::X, 0, 4, 1, 'a').unwrap();
    map.insert(Side::X, 4, 2, 6, 'b').unwrap();
    map.insert(Side::Y, 7, 3, 3, 'c').unwrap();

    assert_eq!((map.extent(Side::X), map.extent(Side::Y)), (9, 10));
    let c = map.get(Side::X, 6).unwrap();
    assert_eq!((c.y_start, c.y_length, *c.value), (7, 3, 'c'));
    assert_eq!(map.nearest_less_or_equal(Side::Y, 3).map(|e| *e.value), Some('b'));
    assert_eq!(map.nearest_less_or_equal(Side::X, 3).map(|e| *e.value), Some('a'));

    // 'b' starts at 4 on X but at 1 on Y.
    assert_eq!(map.try_insert(Side::Y, 4, 1, 1, 'z'), Ok(false));
    map.insert(Side::Y, 1, 1, 1, 'z').unwrap();
    let order: Vec<_> = map.iter().map(|e| (e.x_start, e.y_start, *e.value)).collect();
    assert_eq!(order, [(0, 0, 'a'), (4, 1, 'z'), (5, 2, 'b'), (7, 8, 'c')]);

    assert_eq!(map.delete(Side::Y, 2), Ok('b'));
    assert_eq!(map.get(Side::X, 5).map(|e| e.y_start), Ok(2));
    assert_eq!(map.delete(Side::X, 100), Err(TreeError::NotFound));
}

#[test]
fn pair_lengths_must_both_be_positive() {
    let mut map: AvlRange2Map<(), i32> = AvlRange2Map::new();
    assert!(matches!(map.insert(Side::X, 0, 0, 1, ()), Err(TreeError::OutOfRange(_))));
    assert!(matches!(map.insert(Side::X, 0, 1, -1, ()), Err(TreeError::OutOfRange(_))));
    assert!(map.is_empty());
    map.insert(Side::X, 0, 1, i32::MAX, ()).unwrap();
    assert_eq!(map.insert(Side::X, 1, 1, 1, ()), Err(TreeError::Overflow));
    assert_eq!(map.len(), 1);
}
