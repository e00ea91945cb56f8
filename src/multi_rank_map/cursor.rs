use super::{AvlMultiRankMap, RankEntry, RawRankTree};
use crate::raw::{Dir, Resume, Walker, by_key};
use crate::{Position, TreeError};

/// Cursor over an [`AvlMultiRankMap`] that fails once the map is modified.
#[derive(Clone, Debug)]
pub struct FastCursor<P> {
    walker: Walker<P, 1>,
}

impl<P: Position> FastCursor<P> {
    pub(super) fn new<K, V>(raw: &RawRankTree<K, V, P>, forward: bool) -> Self {
        Self {
            walker: Walker::new(raw, forward),
        }
    }

    /// Returns the next key with its rank, or `None` once the walk is complete.
    ///
    /// # Errors
    ///
    /// [`TreeError::ConcurrentModification`] if `map` changed since the
    /// cursor was created.
    pub fn next<'a, K, V>(
        &mut self,
        map: &'a AvlMultiRankMap<K, V, P>,
    ) -> Result<Option<RankEntry<'a, K, V, P>>, TreeError> {
        Ok(self.walker.next(&map.raw)?.map(|at| RankEntry::at(&map.raw, at)))
    }
}

/// Cursor over an [`AvlMultiRankMap`] that resumes after the last key it
/// returned, so the map may change between steps. Ranks are reported as of
/// the step that returns them.
#[derive(Clone, Debug)]
pub struct RobustCursor<K> {
    resume: Resume<K>,
    forward: bool,
}

impl<K> RobustCursor<K> {
    pub(super) const fn new(start_at: Option<K>, forward: bool) -> Self {
        Self {
            resume: Resume::From(start_at),
            forward,
        }
    }
}

impl<K: Ord + Clone> RobustCursor<K> {
    /// Returns the key following the last one returned.
    pub fn next<'a, V, P: Position>(&mut self, map: &'a AvlMultiRankMap<K, V, P>) -> Option<RankEntry<'a, K, V, P>> {
        let at = match self.resume.target(self.forward) {
            Some((key, mode)) => map.raw.seek(by_key(key), mode),
            None => map.raw.edge(if self.forward { Dir::Left } else { Dir::Right }),
        }?;
        let entry = RankEntry::at(&map.raw, at);
        self.resume = Resume::After(entry.key.clone());
        Some(entry)
    }
}
