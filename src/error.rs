use thiserror::Error;

/// Errors reported by the collections in this crate.
///
/// Every error is raised before the collection is modified, so a failed call
/// leaves the collection exactly as it was.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum TreeError {
    /// No entry exists for the requested key or position.
    #[error("no entry exists for the requested key or position")]
    NotFound,
    /// An entry already exists for the key.
    #[error("an entry already exists for the key")]
    AlreadyPresent,
    /// An argument was outside its valid range (non-positive length, negative position, ...).
    #[error("argument out of range: {0}")]
    OutOfRange(&'static str),
    /// The total extent or the number of entries would exceed what can be represented.
    #[error("extent or entry count would overflow")]
    Overflow,
    /// A [`PreallocatedFixed`](crate::AllocationMode::PreallocatedFixed) collection has no free nodes.
    #[error("fixed-capacity allocator has no free nodes")]
    OutOfCapacity,
    /// A fast cursor observed a modification of the collection it walks.
    #[error("collection was modified during enumeration")]
    ConcurrentModification,
}
