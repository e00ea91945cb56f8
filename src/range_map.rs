use core::fmt;
use core::iter::FusedIterator;

use crate::raw::{Dir, Located, RawIter, RawTree, Resume, Seek, Walker, before_start, by_start};
use crate::{AllocationMode, Position, TreeError};

type RawRangeTree<V, P> = RawTree<(), V, P, 1>;

/// A segment of an [`AvlRangeMap`] with its current placement.
#[derive(Debug, Eq, PartialEq, Hash)]
pub struct RangeEntry<'a, V, P = i32> {
    pub start: P,
    pub length: P,
    pub value: &'a V,
}

impl<V, P: Copy> Clone for RangeEntry<'_, V, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V, P: Copy> Copy for RangeEntry<'_, V, P> {}

impl<'a, V, P: Position> RangeEntry<'a, V, P> {
    fn at(raw: &'a RawRangeTree<V, P>, at: Located<P, 1>) -> Self {
        Self {
            start: at.start[0],
            length: at.length()[0],
            value: raw.entry(at.handle).1,
        }
    }

    /// One past the last position covered by the segment.
    #[must_use]
    pub fn end(&self) -> P {
        self.start + self.length
    }
}

/// A sequence of segments tiling `[0, extent)` without gaps or overlaps.
///
/// Segments are addressed by their current start. Inserting, deleting or
/// resizing a segment moves every later segment in O(log n); no stored
/// position is ever rewritten wholesale.
///
/// # Examples
///
/// ```
/// use avl_offset_tree::AvlRangeMap;
///
/// let mut runs = AvlRangeMap::new();
/// runs.insert(0, 3, 'a').unwrap();
/// runs.insert(3, 5, 'b').unwrap();
/// runs.insert(8, 2, 'c').unwrap();
/// assert_eq!(runs.extent(), 10);
///
/// // Position 6 falls inside the segment starting at 3.
/// let hit = runs.nearest_less_or_equal(6).unwrap();
/// assert_eq!((hit.start, hit.length, *hit.value), (3, 5, 'b'));
///
/// runs.delete(3).unwrap();
/// assert_eq!(runs.get(3).map(|e| *e.value), Ok('c'));
/// ```
#[derive(Clone)]
pub struct AvlRangeMap<V, P = i32> {
    raw: RawRangeTree<V, P>,
}

impl<V, P: Position> AvlRangeMap<V, P> {
    /// Makes a new, empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self { raw: RawTree::new() }
    }

    /// Makes a new, empty map with room for `capacity` segments under `mode`.
    ///
    /// # Errors
    ///
    /// [`TreeError::Overflow`] if `capacity` exceeds the handle space.
    pub fn with_capacity(capacity: usize, mode: AllocationMode) -> Result<Self, TreeError> {
        Ok(Self {
            raw: RawTree::with_capacity(capacity, mode)?,
        })
    }

    /// Returns the number of segments.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Total length of all segments.
    #[must_use]
    pub const fn extent(&self) -> P {
        self.raw.extent()[0]
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

    /// Inserts a segment of `length` at `start`, pushing the segment that
    /// started there (and every later one) back by `length`.
    ///
    /// `start` must be the start of an existing segment or the extent.
    /// Returns `Ok(false)` and leaves the map untouched otherwise.
    ///
    /// # Errors
    ///
    /// - [`TreeError::OutOfRange`] for a negative `start` or a non-positive `length`
    /// - [`TreeError::Overflow`] if the extent would overflow `P`
    /// - [`TreeError::OutOfCapacity`] when no node can be allocated
    pub fn try_insert(&mut self, start: P, length: P, value: V) -> Result<bool, TreeError> {
        check_start(start)?;
        check_length(length)?;
        if start > self.extent() || (start < self.extent() && !self.starts_at(start)) {
            return Ok(false);
        }
        let descent = self.raw.descend(before_start(start, 0));
        self.raw.insert(descent, (), value, [length])?;
        Ok(true)
    }

    /// Inserts a segment of `length` at `start`.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if no segment starts at `start` and `start`
    /// is not the extent, otherwise as [`try_insert`](Self::try_insert).
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_offset_tree::{AvlRangeMap, TreeError};
    ///
    /// let mut map = AvlRangeMap::new();
    /// map.insert(0, 4, "x").unwrap();
    /// assert_eq!(map.insert(2, 1, "y"), Err(TreeError::NotFound));
    /// map.insert(0, 1, "w").unwrap();
    /// assert_eq!(map.get(1).map(|e| *e.value), Ok("x"));
    /// ```
    pub fn insert(&mut self, start: P, length: P, value: V) -> Result<(), TreeError> {
        if self.try_insert(start, length, value)? { Ok(()) } else { Err(TreeError::NotFound) }
    }

    /// Removes the segment starting at `start`, pulling every later segment
    /// forward by its length.
    pub fn try_delete(&mut self, start: P) -> Option<V> {
        let descent = self.raw.descend(by_start(start, 0));
        self.raw.remove(descent).map(|((), value)| value)
    }

    /// Removes the segment starting at `start`.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfRange`] for a negative `start`,
    /// [`TreeError::NotFound`] if no segment starts there.
    pub fn delete(&mut self, start: P) -> Result<V, TreeError> {
        check_start(start)?;
        self.try_delete(start).ok_or(TreeError::NotFound)
    }

    /// Returns the segment starting exactly at `start`.
    #[must_use]
    pub fn try_get(&self, start: P) -> Option<RangeEntry<'_, V, P>> {
        self.nearest(start, Seek::Exact)
    }

    /// Returns the segment starting exactly at `start`.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfRange`] for a negative `start`,
    /// [`TreeError::NotFound`] if no segment starts there.
    pub fn get(&self, start: P) -> Result<RangeEntry<'_, V, P>, TreeError> {
        check_start(start)?;
        self.try_get(start).ok_or(TreeError::NotFound)
    }

    pub fn try_get_mut(&mut self, start: P) -> Option<&mut V> {
        let at = self.raw.seek(by_start(start, 0), Seek::Exact)?;
        Some(self.raw.entry_mut(at.handle).1)
    }

    /// Changes the length of the segment at `start`. Returns `Ok(false)` if
    /// no segment starts there.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfRange`] for a non-positive `length`, or
    /// [`TreeError::Overflow`] if the extent would overflow `P`.
    pub fn try_set_length(&mut self, start: P, length: P) -> Result<bool, TreeError> {
        check_length(length)?;
        let Some(at) = self.raw.seek(by_start(start, 0), Seek::Exact) else {
            return Ok(false);
        };
        self.raw.resize(&at, [length])?;
        Ok(true)
    }

    /// Changes the length of the segment at `start`.
    ///
    /// # Errors
    ///
    /// [`TreeError::OutOfRange`] for a negative `start`, [`TreeError::NotFound`]
    /// if no segment starts there, otherwise as [`try_set_length`](Self::try_set_length).
    pub fn set_length(&mut self, start: P, length: P) -> Result<(), TreeError> {
        check_start(start)?;
        if self.try_set_length(start, length)? { Ok(()) } else { Err(TreeError::NotFound) }
    }

    /// Adds `delta` to the length of the segment at `start` and returns the
    /// new length. A segment whose length reaches exactly zero is deleted.
    ///
    /// # Errors
    ///
    /// - [`TreeError::NotFound`] if no segment starts at `start`
    /// - [`TreeError::OutOfRange`] for a negative `start`, or if the length
    ///   would become negative
    /// - [`TreeError::Overflow`] if the length or extent would overflow `P`
    pub fn adjust_length(&mut self, start: P, delta: P) -> Result<P, TreeError> {
        check_start(start)?;
        let descent = self.raw.descend(by_start(start, 0));
        let at = descent.found.ok_or(TreeError::NotFound)?;
        let length = at.length()[0].checked_add(delta).ok_or(TreeError::Overflow)?;
        if length == P::ZERO {
            self.raw.remove(descent);
        } else if length < P::ZERO {
            return Err(TreeError::OutOfRange("length would become negative"));
        } else if delta != P::ZERO {
            self.raw.resize(&at, [length])?;
        }
        Ok(length)
    }

    /// Returns the segment starting at 0.
    #[must_use]
    pub fn first(&self) -> Option<RangeEntry<'_, V, P>> {
        self.raw.edge(Dir::Left).map(|at| RangeEntry::at(&self.raw, at))
    }

    /// Returns the segment ending at the extent.
    #[must_use]
    pub fn last(&self) -> Option<RangeEntry<'_, V, P>> {
        self.raw.edge(Dir::Right).map(|at| RangeEntry::at(&self.raw, at))
    }

    /// Returns the last segment starting strictly before `position`.
    #[must_use]
    pub fn nearest_less(&self, position: P) -> Option<RangeEntry<'_, V, P>> {
        self.nearest(position, Seek::Less)
    }

    /// Returns the last segment starting at or before `position`; for a
    /// position inside `[0, extent)` this is the segment containing it.
    #[must_use]
    pub fn nearest_less_or_equal(&self, position: P) -> Option<RangeEntry<'_, V, P>> {
        self.nearest(position, Seek::LessOrEqual)
    }

    /// Returns the first segment starting strictly after `position`.
    #[must_use]
    pub fn nearest_greater(&self, position: P) -> Option<RangeEntry<'_, V, P>> {
        self.nearest(position, Seek::Greater)
    }

    /// Returns the first segment starting at or after `position`.
    #[must_use]
    pub fn nearest_greater_or_equal(&self, position: P) -> Option<RangeEntry<'_, V, P>> {
        self.nearest(position, Seek::GreaterOrEqual)
    }

    fn nearest(&self, position: P, mode: Seek) -> Option<RangeEntry<'_, V, P>> {
        let at = self.raw.seek(by_start(position, 0), mode)?;
        Some(RangeEntry::at(&self.raw, at))
    }

    fn starts_at(&self, start: P) -> bool {
        self.raw.seek(by_start(start, 0), Seek::Exact).is_some()
    }

    /// Gets a double-ended iterator over the segments in position order.
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

    /// Starts a cursor that re-queries by position on every step, optionally
    /// from the nearest segment start at or beyond `start_at`.
    #[must_use]
    pub const fn robust_cursor(&self, forward: bool, start_at: Option<P>) -> RobustCursor<P> {
        RobustCursor {
            resume: Resume::From(start_at),
            forward,
        }
    }
}

fn check_start<P: Position>(start: P) -> Result<(), TreeError> {
    if start < P::ZERO { Err(TreeError::OutOfRange("start must not be negative")) } else { Ok(()) }
}

fn check_length<P: Position>(length: P) -> Result<(), TreeError> {
    if length > P::ZERO { Ok(()) } else { Err(TreeError::OutOfRange("length must be positive")) }
}

impl<V, P: Position> Default for AvlRangeMap<V, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug, P: Position> fmt::Debug for AvlRangeMap<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, V, P: Position> IntoIterator for &'a AvlRangeMap<V, P> {
    type Item = RangeEntry<'a, V, P>;
    type IntoIter = Iter<'a, V, P>;

    fn into_iter(self) -> Iter<'a, V, P> {
        self.iter()
    }
}

/// An iterator over the segments of an [`AvlRangeMap`].
pub struct Iter<'a, V, P> {
    inner: RawIter<'a, (), V, P, 1>,
}

impl<V, P: Position> Clone for Iter<'_, V, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, V, P: Position> Iterator for Iter<'a, V, P> {
    type Item = RangeEntry<'a, V, P>;

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.inner.next()?;
        Some(RangeEntry::at(self.inner.tree(), at))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V, P: Position> DoubleEndedIterator for Iter<'_, V, P> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let at = self.inner.next_back()?;
        Some(RangeEntry::at(self.inner.tree(), at))
    }
}

impl<V, P: Position> ExactSizeIterator for Iter<'_, V, P> {}

impl<V, P: Position> FusedIterator for Iter<'_, V, P> {}

/// Cursor over an [`AvlRangeMap`] that fails once the map is modified.
#[derive(Clone, Debug)]
pub struct FastCursor<P> {
    walker: Walker<P, 1>,
}

impl<P: Position> FastCursor<P> {
    /// Returns the next segment, or `None` once the walk is complete.
    ///
    /// # Errors
    ///
    /// [`TreeError::ConcurrentModification`] if `map` changed since the
    /// cursor was created.
    pub fn next<'a, V>(&mut self, map: &'a AvlRangeMap<V, P>) -> Result<Option<RangeEntry<'a, V, P>>, TreeError> {
        Ok(self.walker.next(&map.raw)?.map(|at| RangeEntry::at(&map.raw, at)))
    }
}

/// Cursor over an [`AvlRangeMap`] that remembers the start of the last
/// segment returned and looks up its neighbour on every step.
///
/// Changes ahead of the cursor are observed; changes behind it shift the
/// positions the cursor compares against.
#[derive(Clone, Debug)]
pub struct RobustCursor<P> {
    resume: Resume<P>,
    forward: bool,
}

impl<P: Position> RobustCursor<P> {
    /// Returns the segment following the last one returned.
    pub fn next<'a, V>(&mut self, map: &'a AvlRangeMap<V, P>) -> Option<RangeEntry<'a, V, P>> {
        let entry = match self.resume.target(self.forward) {
            Some((&position, mode)) => map.nearest(position, mode),
            None if self.forward => map.first(),
            None => map.last(),
        }?;
        self.resume = Resume::After(entry.start);
        Some(entry)
    }
}
