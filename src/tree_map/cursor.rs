use super::{AvlTreeMap, RawMap};
use crate::TreeError;
use crate::raw::{Dir, Resume, Walker, by_key};

/// Stack-based cursor over an [`AvlTreeMap`] that refuses to continue once
/// the map has been modified.
///
/// Created by [`AvlTreeMap::fast_cursor`].
#[derive(Clone, Debug)]
pub struct FastCursor {
    walker: Walker<i32, 0>,
}

impl FastCursor {
    pub(super) fn new<K, V>(raw: &RawMap<K, V>, forward: bool) -> Self {
        Self {
            walker: Walker::new(raw, forward),
        }
    }

    /// Returns the next entry, or `None` once the walk is complete.
    ///
    /// # Errors
    ///
    /// [`TreeError::ConcurrentModification`] if `map` changed since the
    /// cursor was created.
    pub fn next<'a, K, V>(&mut self, map: &'a AvlTreeMap<K, V>) -> Result<Option<(&'a K, &'a V)>, TreeError> {
        Ok(self.walker.next(&map.raw)?.map(|at| map.raw.entry(at.handle)))
    }
}

/// Cursor over an [`AvlTreeMap`] that tolerates modification.
///
/// Remembers the last key it returned and re-searches for its neighbour on
/// every step, paying O(log n) per entry. Entries inserted ahead of the
/// cursor are visited; entries removed ahead of it are skipped.
///
/// Created by [`AvlTreeMap::robust_cursor`].
#[derive(Clone, Debug)]
pub struct RobustCursor<K> {
    resume: Resume<K>,
    forward: bool,
}

impl<K> RobustCursor<K> {
    pub(super) const fn new(start: Option<K>, forward: bool) -> Self {
        Self {
            resume: Resume::From(start),
            forward,
        }
    }
}

impl<K: Ord + Clone> RobustCursor<K> {
    /// Returns the entry following the last one returned, in the current
    /// state of `map`.
    pub fn next<'a, V>(&mut self, map: &'a AvlTreeMap<K, V>) -> Option<(&'a K, &'a V)> {
        let found = match self.resume.target(self.forward) {
            Some((key, mode)) => map.raw.seek(by_key(key), mode),
            None => map.raw.edge(if self.forward { Dir::Left } else { Dir::Right }),
        }?;
        let (key, value) = map.raw.entry(found.handle);
        self.resume = Resume::After(key.clone());
        Some((key, value))
    }
}
