use core::fmt;
use core::iter::FusedIterator;

use crate::raw::{Dir, Located, RawIter, RawTree, Resume, Seek, Walker, before_start, by_start};
use crate::{AllocationMode, Position, TreeError};

type RawPairTree<V, P> = RawTree<(), V, P, 2>;

/// Selects which of the two paired sequences a position refers to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Side {
    X,
    Y,
}

impl Side {
    const fn axis(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
        }
    }
}

/// A range pair of an [`AvlRange2Map`] with its placement on both sides.
#[derive(Debug, Eq, PartialEq, Hash)]
pub struct Range2Entry<'a, V, P = i32> {
    pub x_start: P,
    pub x_length: P,
    pub y_start: P,
    pub y_length: P,
    pub value: &'a V,
}

impl<V, P: Copy> Clone for Range2Entry<'_, V, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V, P: Copy> Copy for Range2Entry<'_, V, P> {}

impl<'a, V, P: Position> Range2Entry<'a, V, P> {
    fn at(raw: &'a RawPairTree<V, P>, at: Located<P, 2>) -> Self {
        let [x_length, y_length] = at.length();
        Self {
            x_start: at.start[0],
            x_length,
            y_start: at.start[1],
            y_length,
            value: raw.entry(at.handle).1,
        }
    }

    /// Start on `side`.
    #[must_use]
    pub fn start(&self, side: Side) -> P {
        match side {
            Side::X => self.x_start,
            Side::Y => self.y_start,
        }
    }

    /// Length on `side`.
    #[must_use]
    pub fn length(&self, side: Side) -> P {
        match side {
            Side::X => self.x_length,
            Side::Y => self.y_length,
        }
    }
}

/// Two sequences of segments tiled in lockstep: every entry occupies a run
/// on the X sequence and an independent run on the Y sequence, and both runs
/// move together.
///
/// This is the shape of a text diff or a source map, where a span of one
/// document corresponds to a span of different length in another. Either
/// side can be used to address entries.
///
/// # Examples
///
/// ```
/// use avl_offset_tree::{AvlRange2Map, Side};
///
/// // Old text on X, new text on Y.
/// let mut diff = AvlRange2Map::new();
/// diff.insert(Side::X, 0, 10, 10, "kept").unwrap();
/// diff.insert(Side::X, 10, 4, 9, "rewritten").unwrap();
/// diff.insert(Side::X, 14, 6, 6, "kept").unwrap();
///
/// let hit = diff.nearest_less_or_equal(Side::Y, 21).unwrap();
/// assert_eq!((hit.x_start, hit.y_start, *hit.value), (14, 19, "kept"));
/// assert_eq!((diff.extent(Side::X), diff.extent(Side::Y)), (20, 25));
/// ```
#[derive(Clone)]
pub struct AvlRange2Map<V, P = i32> {
    raw: RawPairTree<V, P>,
}

impl<V, P: Position> AvlRange2Map<V, P> {
    /// Makes a new, empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self { raw: RawTree::new() }
    }

    /// Makes a new, empty map with room for `capacity` pairs under `mode`.
    ///
    /// # Errors
    ///
    /// [`TreeError::Overflow`] if `capacity` exceeds the handle space.
    pub fn with_capacity(capacity: usize, mode: AllocationMode) -> Result<Self, TreeError> {
        Ok(Self {
            raw: RawTree::with_capacity(capacity, mode)?,
        })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Total length of the sequence on `side`.
    #[must_use]
    pub const fn extent(&self, side: Side) -> P {
        self.raw.extent()[side.axis()]
    }

    pub fn clear(&mut self) {
        self.raw.clear();
    }

    #[must_use]
    pub const fn allocation_mode(&self) -> AllocationMode {
        self.raw.mode()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    #[must_use]
    pub const fn free_count(&self) -> usize {
        self.raw.free_count()
    }

    /// Grows the freelist until it holds at least `count` nodes.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfCapacity`] for a fixed pool that cannot supply them.
    pub fn ensure_free(&mut self, count: usize) -> Result<(), TreeError> {
        self.raw.ensure_free(count)
    }

    /// Inserts a pair before the entry starting at `start` on `side` (or at
    /// the end when `start` is that side's extent), moving every later entry
    /// on both sides. Returns `Ok(false)` if `start` is not such a boundary.
    ///
    /// # Errors
    ///
    /// - [`TreeError::OutOfRange`] for a negative `start` or a non-positive length
    /// - [`TreeError::Overflow`] if either extent would overflow `P`
    /// - [`TreeError::OutOfCapacity`] when no node can be allocated
    pub fn try_insert(&mut self, side: Side, start: P, x_length: P, y_length: P, value: V) -> Result<bool, TreeError> {
        check_start(start)?;
        check_lengths(x_length, y_length)?;
        let extent = self.extent(side);
        if start > extent || (start < extent && self.try_get(side, start).is_none()) {
            return Ok(false);
        }
        let descent = self.raw.descend(before_start(start, side.axis()));
        self.raw.insert(descent, (), value, [x_length, y_length])?;
        Ok(true)
    }

    /// Inserts a pair at `start` on `side`.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if `start` is neither an entry start nor the
    /// extent, otherwise as [`try_insert`](Self::try_insert).
    pub fn insert(&mut self, side: Side, start: P, x_length: P, y_length: P, value: V) -> Result<(), TreeError> {
        if self.try_insert(side, start, x_length, y_length, value)? {
            Ok(())
        } else {
            Err(TreeError::NotFound)
        }
    }

    /// Removes the entry starting at `start` on `side`.
    pub fn try_delete(&mut self, side: Side, start: P) -> Option<V> {
        let descent = self.raw.descend(by_start(start, side.axis()));
        self.raw.remove(descent).map(|((), value)| value)
    }

    /// Removes the entry starting at `start` on `side`.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfRange`] for a negative `start`,
    /// [`TreeError::NotFound`] if no entry starts there.
    pub fn delete(&mut self, side: Side, start: P) -> Result<V, TreeError> {
        check_start(start)?;
        self.try_delete(side, start).ok_or(TreeError::NotFound)
    }

    /// Returns the entry starting exactly at `start` on `side`.
    #[must_use]
    pub fn try_get(&self, side: Side, start: P) -> Option<Range2Entry<'_, V, P>> {
        self.nearest(side, start, Seek::Exact)
    }

    /// Returns the entry starting exactly at `start` on `side`.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfRange`] for a negative `start`,
    /// [`TreeError::NotFound`] if no entry starts there.
    pub fn get(&self, side: Side, start: P) -> Result<Range2Entry<'_, V, P>, TreeError> {
        check_start(start)?;
        self.try_get(side, start).ok_or(TreeError::NotFound)
    }

    pub fn try_get_mut(&mut self, side: Side, start: P) -> Option<&mut V> {
        let at = self.raw.seek(by_start(start, side.axis()), Seek::Exact)?;
        Some(self.raw.entry_mut(at.handle).1)
    }

    /// Replaces both lengths of the entry at `start` on `side`. Returns
    /// `Ok(false)` if no entry starts there.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfRange`] for a non-positive length, or
    /// [`TreeError::Overflow`] if either extent would overflow `P`.
    pub fn try_set_length(&mut self, side: Side, start: P, x_length: P, y_length: P) -> Result<bool, TreeError> {
        check_lengths(x_length, y_length)?;
        let Some(at) = self.raw.seek(by_start(start, side.axis()), Seek::Exact) else {
            return Ok(false);
        };
        self.raw.resize(&at, [x_length, y_length])?;
        Ok(true)
    }

    /// Replaces both lengths of the entry at `start` on `side`.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfRange`] for a negative `start`, [`TreeError::NotFound`]
    /// if no entry starts there, otherwise as [`try_set_length`](Self::try_set_length).
    pub fn set_length(&mut self, side: Side, start: P, x_length: P, y_length: P) -> Result<(), TreeError> {
        check_start(start)?;
        if self.try_set_length(side, start, x_length, y_length)? {
            Ok(())
        } else {
            Err(TreeError::NotFound)
        }
    }

    /// Adds a delta to each length of the entry at `start` on `side` and
    /// returns the new `(x_length, y_length)`. The entry is deleted when both
    /// lengths reach exactly zero.
    ///
    /// # Errors
    ///
    /// - [`TreeError::NotFound`] if no entry starts there
    /// - [`TreeError::OutOfRange`] for a negative `start`, if only one length
    ///   reaches zero, or if either goes negative
    /// - [`TreeError::Overflow`] if a length or extent would overflow `P`
    pub fn adjust_length(&mut self, side: Side, start: P, x_delta: P, y_delta: P) -> Result<(P, P), TreeError> {
        check_start(start)?;
        let descent = self.raw.descend(by_start(start, side.axis()));
        let at = descent.found.ok_or(TreeError::NotFound)?;
        let [x_length, y_length] = at.length();
        let x_length = x_length.checked_add(x_delta).ok_or(TreeError::Overflow)?;
        let y_length = y_length.checked_add(y_delta).ok_or(TreeError::Overflow)?;

        if x_length == P::ZERO && y_length == P::ZERO {
            self.raw.remove(descent);
        } else if x_length <= P::ZERO || y_length <= P::ZERO {
            return Err(TreeError::OutOfRange("lengths must both stay positive or both reach zero"));
        } else if x_delta != P::ZERO || y_delta != P::ZERO {
            self.raw.resize(&at, [x_length, y_length])?;
        }
        Ok((x_length, y_length))
    }

    #[must_use]
    pub fn first(&self) -> Option<Range2Entry<'_, V, P>> {
        self.raw.edge(Dir::Left).map(|at| Range2Entry::at(&self.raw, at))
    }

    #[must_use]
    pub fn last(&self) -> Option<Range2Entry<'_, V, P>> {
        self.raw.edge(Dir::Right).map(|at| Range2Entry::at(&self.raw, at))
    }

    /// Returns the last entry starting strictly before `position` on `side`.
    #[must_use]
    pub fn nearest_less(&self, side: Side, position: P) -> Option<Range2Entry<'_, V, P>> {
        self.nearest(side, position, Seek::Less)
    }

    /// Returns the last entry starting at or before `position` on `side`:
    /// the entry containing it when it lies inside that side's extent.
    #[must_use]
    pub fn nearest_less_or_equal(&self, side: Side, position: P) -> Option<Range2Entry<'_, V, P>> {
        self.nearest(side, position, Seek::LessOrEqual)
    }

    #[must_use]
    pub fn nearest_greater(&self, side: Side, position: P) -> Option<Range2Entry<'_, V, P>> {
        self.nearest(side, position, Seek::Greater)
    }

    #[must_use]
    pub fn nearest_greater_or_equal(&self, side: Side, position: P) -> Option<Range2Entry<'_, V, P>> {
        self.nearest(side, position, Seek::GreaterOrEqual)
    }

    fn nearest(&self, side: Side, position: P, mode: Seek) -> Option<Range2Entry<'_, V, P>> {
        let at = self.raw.seek(by_start(position, side.axis()), mode)?;
        Some(Range2Entry::at(&self.raw, at))
    }

    pub fn iter(&self) -> Iter<'_, V, P> {
        Iter {
            inner: RawIter::new(&self.raw),
        }
    }

    /// Starts a cursor that fails once the map is modified.
    #[must_use]
    pub fn fast_cursor(&self, forward: bool) -> FastCursor<P> {
        FastCursor {
            walker: Walker::new(&self.raw, forward),
        }
    }

    /// Starts a cursor that re-queries by position on `side` every step,
    /// optionally from the nearest start at or beyond `start_at`.
    #[must_use]
    pub const fn robust_cursor(&self, side: Side, forward: bool, start_at: Option<P>) -> RobustCursor<P> {
        RobustCursor {
            side,
            resume: Resume::From(start_at),
            forward,
        }
    }
}

fn check_start<P: Position>(start: P) -> Result<(), TreeError> {
    if start < P::ZERO { Err(TreeError::OutOfRange("start must not be negative")) } else { Ok(()) }
}

fn check_lengths<P: Position>(x_length: P, y_length: P) -> Result<(), TreeError> {
    if x_length > P::ZERO && y_length > P::ZERO {
        Ok(())
    } else {
        Err(TreeError::OutOfRange("lengths must be positive"))
    }
}

impl<V, P: Position> Default for AvlRange2Map<V, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug, P: Position> fmt::Debug for AvlRange2Map<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, V, P: Position> IntoIterator for &'a AvlRange2Map<V, P> {
    type Item = Range2Entry<'a, V, P>;
    type IntoIter = Iter<'a, V, P>;

    fn into_iter(self) -> Iter<'a, V, P> {
        self.iter()
    }
}

/// An iterator over the entries of an [`AvlRange2Map`].
pub struct Iter<'a, V, P> {
    inner: RawIter<'a, (), V, P, 2>,
}

impl<V, P: Position> Clone for Iter<'_, V, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, V, P: Position> Iterator for Iter<'a, V, P> {
    type Item = Range2Entry<'a, V, P>;

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.inner.next()?;
        Some(Range2Entry::at(self.inner.tree(), at))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V, P: Position> DoubleEndedIterator for Iter<'_, V, P> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let at = self.inner.next_back()?;
        Some(Range2Entry::at(self.inner.tree(), at))
    }
}

impl<V, P: Position> ExactSizeIterator for Iter<'_, V, P> {}

impl<V, P: Position> FusedIterator for Iter<'_, V, P> {}

/// Cursor over an [`AvlRange2Map`] that fails once the map is modified.
#[derive(Clone, Debug)]
pub struct FastCursor<P> {
    walker: Walker<P, 2>,
}

impl<P: Position> FastCursor<P> {
    /// Returns the next entry, or `None` once the walk is complete.
    ///
    /// # Errors
    ///
    /// [`TreeError::ConcurrentModification`] if `map` changed since the
    /// cursor was created.
    pub fn next<'a, V>(&mut self, map: &'a AvlRange2Map<V, P>) -> Result<Option<Range2Entry<'a, V, P>>, TreeError> {
        Ok(self.walker.next(&map.raw)?.map(|at| Range2Entry::at(&map.raw, at)))
    }
}

/// Cursor over an [`AvlRange2Map`] that looks up the neighbour of the last
/// entry returned, by its start on one side.
#[derive(Clone, Debug)]
pub struct RobustCursor<P> {
    side: Side,
    resume: Resume<P>,
    forward: bool,
}

impl<P: Position> RobustCursor<P> {
    pub fn next<'a, V>(&mut self, map: &'a AvlRange2Map<V, P>) -> Option<Range2Entry<'a, V, P>> {
        let entry = match self.resume.target(self.forward) {
            Some((&position, mode)) => map.nearest(self.side, position, mode),
            None if self.forward => map.first(),
            None => map.last(),
        }?;
        self.resume = Resume::After(entry.start(self.side));
        Some(entry)
    }
}
