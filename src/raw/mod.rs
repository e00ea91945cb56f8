mod arena;
mod balance;
mod handle;
mod node;
mod raw_tree;
mod shift;
mod walker;

pub(crate) use handle::Handle;
pub(crate) use node::Dir;
pub(crate) use raw_tree::{Located, RawTree, Seek, before_start, by_key, by_start};
pub(crate) use walker::{RawIter, Resume, Walker};
