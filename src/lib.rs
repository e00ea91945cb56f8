//! Threaded AVL tree collections with relative-offset positional augmentation.
//!
//! Every collection in this crate is an instantiation of one engine: an AVL
//! tree whose unused child links are *threads* to the in-order neighbours, and
//! whose nodes store their position *relative to their parent* rather than
//! absolutely. Summing offsets along a root path yields a node's position, so
//! inserting, removing or resizing an entry shifts every later entry in
//! O(log n) by adjusting a single path.
//!
//! - [`AvlTreeMap`] / [`AvlTreeSet`] - ordered keys, no augmentation
//! - [`AvlRankMap`] - ordered keys with their rank (sorted index)
//! - [`AvlMultiRankMap`] - ordered keys that each occupy a run of ranks
//! - [`AvlRangeMap`] - a sequence of segments tiling `[0, extent)`
//! - [`AvlRange2Map`] - segments paired across two independent sequences
//!
//! # Example
//!
//! ```
//! use avl_offset_tree::AvlRangeMap;
//!
//! let mut lines = AvlRangeMap::new();
//! lines.insert(0, 12, "first line").unwrap();
//! lines.insert(12, 30, "second line").unwrap();
//! lines.insert(12, 5, "inserted line").unwrap();
//!
//! // Everything after the inserted segment moved along.
//! let second = lines.nearest_less_or_equal(20).unwrap();
//! assert_eq!((second.start, second.length, *second.value), (17, 30, "second line"));
//! assert_eq!(lines.extent(), 47);
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`
//! - **Allocation policies** - Grow-and-discard, freelist reuse, or a fixed preallocated pool
//! - **Two traversal disciplines** - Fast cursors that detect modification, robust cursors that tolerate it
//! - **32- or 64-bit positions** - Chosen by the `P` type parameter

#![no_std]
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod allocation;
mod error;
mod position;
mod raw;

pub mod multi_rank_map;
pub mod range2_map;
pub mod range_map;
pub mod rank_map;
pub mod tree_map;
pub mod tree_set;

pub use allocation::AllocationMode;
pub use error::TreeError;
pub use multi_rank_map::{AvlMultiRankMap, RankEntry};
pub use position::Position;
pub use range_map::{AvlRangeMap, RangeEntry};
pub use range2_map::{AvlRange2Map, Range2Entry, Side};
pub use rank_map::AvlRankMap;
pub use tree_map::AvlTreeMap;
pub use tree_set::AvlTreeSet;
