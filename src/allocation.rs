/// Node allocation policy, selected when a collection is constructed.
///
/// # Examples
///
/// ```
/// use avl_offset_tree::{AllocationMode, AvlTreeMap, TreeError};
///
/// let mut map = AvlTreeMap::with_capacity(2, AllocationMode::PreallocatedFixed).unwrap();
/// map.add(1, "a").unwrap();
/// map.add(2, "b").unwrap();
/// assert_eq!(map.add(3, "c"), Err(TreeError::OutOfCapacity));
/// assert_eq!(map.len(), 2);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum AllocationMode {
    /// Nodes are allocated on demand and their storage is handed back to the
    /// global allocator once the collection empties.
    #[default]
    DynamicDiscard,
    /// Released nodes are kept on a freelist and reused before any new
    /// allocation; clearing the collection keeps its storage.
    DynamicRetainFreelist,
    /// Exactly `capacity` nodes are allocated up front and the collection never
    /// grows beyond them.
    PreallocatedFixed,
}
