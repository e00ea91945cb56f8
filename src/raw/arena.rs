use alloc::vec::Vec;

use log::debug;

use super::handle::Handle;
use crate::{AllocationMode, TreeError};

#[derive(Clone, Debug)]
enum Slot<T> {
    Occupied(T),
    // Next entry of the freelist.
    Vacant(Option<Handle>),
}

/// Node storage addressed by stable handles, with a singly-linked freelist
/// threaded through the vacant slots.
#[derive(Clone, Debug)]
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<Handle>,
    free_len: usize,
    mode: AllocationMode,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            free_len: 0,
            mode: AllocationMode::DynamicDiscard,
        }
    }

    /// Creates an arena for `capacity` elements.
    ///
    /// The retaining and fixed policies allocate all `capacity` slots up front
    /// and place them on the freelist; the discarding policy only reserves.
    pub(crate) fn with_capacity(capacity: usize, mode: AllocationMode) -> Result<Self, TreeError> {
        if capacity > Handle::MAX + 1 {
            return Err(TreeError::Overflow);
        }
        let mut arena = Self {
            slots: Vec::with_capacity(capacity),
            free_head: None,
            free_len: 0,
            mode,
        };
        if mode != AllocationMode::DynamicDiscard {
            arena.grow_free(capacity)?;
        }
        Ok(arena)
    }

    pub(crate) const fn mode(&self) -> AllocationMode {
        self.mode
    }

    /// Number of slots the arena can hold without reallocating.
    pub(crate) fn capacity(&self) -> usize {
        match self.mode {
            AllocationMode::DynamicDiscard => self.slots.capacity(),
            AllocationMode::DynamicRetainFreelist | AllocationMode::PreallocatedFixed => self.slots.len(),
        }
    }

    pub(crate) const fn free_len(&self) -> usize {
        self.free_len
    }

    pub(crate) const fn len(&self) -> usize {
        self.slots.len() - self.free_len
    }

    fn grow_free(&mut self, additional: usize) -> Result<(), TreeError> {
        if self.slots.len() + additional > Handle::MAX + 1 {
            return Err(TreeError::Overflow);
        }
        self.slots.reserve_exact(additional);
        for _ in 0..additional {
            let handle = Handle::new(self.slots.len()).ok_or(TreeError::Overflow)?;
            self.slots.push(Slot::Vacant(self.free_head));
            self.free_head = Some(handle);
            self.free_len += 1;
        }
        Ok(())
    }

    /// Makes sure at least `count` allocations can succeed without growing.
    pub(crate) fn ensure_free(&mut self, count: usize) -> Result<(), TreeError> {
        match self.mode {
            _ if self.free_len >= count => Ok(()),
            AllocationMode::DynamicDiscard => {
                self.slots.reserve(count - self.free_len);
                Ok(())
            }
            AllocationMode::DynamicRetainFreelist => {
                debug!("growing freelist by {} nodes", count - self.free_len);
                self.grow_free(count - self.free_len)
            }
            AllocationMode::PreallocatedFixed => Err(TreeError::OutOfCapacity),
        }
    }

    pub(crate) fn alloc(&mut self, element: T) -> Result<Handle, TreeError> {
        if let Some(handle) = self.free_head {
            let slot = &mut self.slots[handle.index()];
            let Slot::Vacant(next) = *slot else {
                panic!("`Arena::alloc()` - freelist entry {handle:?} is occupied!");
            };
            *slot = Slot::Occupied(element);
            self.free_head = next;
            self.free_len -= 1;
            return Ok(handle);
        }

        if self.mode == AllocationMode::PreallocatedFixed {
            debug!("fixed-capacity arena exhausted at {} nodes", self.slots.len());
            return Err(TreeError::OutOfCapacity);
        }
        let handle = Handle::new(self.slots.len()).ok_or(TreeError::Overflow)?;
        self.slots.push(Slot::Occupied(element));
        Ok(handle)
    }

    #[inline]
    pub(crate) fn get(&self, handle: Handle) -> &T {
        match &self.slots[handle.index()] {
            Slot::Occupied(element) => element,
            Slot::Vacant(_) => panic!("`Arena::get()` - `handle` is invalid!"),
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, handle: Handle) -> &mut T {
        match &mut self.slots[handle.index()] {
            Slot::Occupied(element) => element,
            Slot::Vacant(_) => panic!("`Arena::get_mut()` - `handle` is invalid!"),
        }
    }

    /// Removes the element at `handle` and returns it, pushing the slot onto
    /// the freelist.
    pub(crate) fn release(&mut self, handle: Handle) -> T {
        let slot = core::mem::replace(&mut self.slots[handle.index()], Slot::Vacant(self.free_head));
        let Slot::Occupied(element) = slot else {
            panic!("`Arena::release()` - `handle` is invalid!");
        };
        self.free_head = Some(handle);
        self.free_len += 1;

        if self.mode == AllocationMode::DynamicDiscard && self.len() == 0 {
            self.discard_storage();
        }
        element
    }

    pub(crate) fn clear(&mut self) {
        match self.mode {
            AllocationMode::DynamicDiscard => self.discard_storage(),
            AllocationMode::DynamicRetainFreelist | AllocationMode::PreallocatedFixed => {
                self.free_head = None;
                for (index, slot) in self.slots.iter_mut().enumerate() {
                    *slot = Slot::Vacant(self.free_head);
                    self.free_head = Handle::new(index);
                }
                self.free_len = self.slots.len();
            }
        }
    }

    fn discard_storage(&mut self) {
        if !self.slots.is_empty() {
            debug!("releasing storage for {} node slots", self.slots.len());
        }
        self.slots = Vec::new();
        self.free_head = None;
        self.free_len = 0;
    }
}
