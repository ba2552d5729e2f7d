//! Fixed-capacity slot arena addressed by non-zero handles.
//!
//! Slots are allocated once at construction and live for the lifetime of the
//! arena. A [`SlotId`] is a 1-based index: index 0 is reserved so that
//! `Option<SlotId>` is pointer-sized and `None` plays the role of a null link.
//!
//! ```text
//!   index:   0        1        2        3
//!          (null)  [slot 1] [slot 2] [slot 3]
//! ```
//!
//! The arena owns no allocation policy; free/occupied bookkeeping lives in
//! [`SlotLinks`](crate::ds::SlotLinks).

use std::num::NonZeroUsize;
use std::ops::Index;

/// Handle to a slot in a [`SlotArena`]. Always in `1..=capacity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(NonZeroUsize);

impl SlotId {
    /// Builds a handle from a 1-based index. Returns `None` for index 0.
    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        NonZeroUsize::new(index).map(SlotId)
    }

    /// Returns the 1-based index of this slot.
    #[inline]
    pub fn index(self) -> usize {
        self.0.get()
    }

    #[inline]
    pub(crate) fn offset(self) -> usize {
        self.0.get() - 1
    }
}

/// Fixed-size pool of `T` cells indexed by [`SlotId`].
#[derive(Debug)]
pub struct SlotArena<T> {
    slots: Box<[T]>,
}

impl<T> SlotArena<T> {
    /// Creates an arena with `capacity` slots, initializing each with `init`.
    pub fn with_capacity(capacity: usize, mut init: impl FnMut(SlotId) -> T) -> Self {
        let slots = (1..=capacity)
            .filter_map(SlotId::from_index)
            .map(&mut init)
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { slots }
    }

    /// Returns the slot for `id`, or `None` if `id` is out of range.
    #[inline]
    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots.get(id.offset())
    }

    /// Returns the number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if `id` addresses a slot in this arena.
    #[inline]
    pub fn contains(&self, id: SlotId) -> bool {
        id.offset() < self.slots.len()
    }

    /// Iterates over all slot handles in index order.
    pub fn ids(&self) -> impl Iterator<Item = SlotId> {
        (1..=self.slots.len()).filter_map(SlotId::from_index)
    }

    /// Iterates over `(SlotId, &T)` in index order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.ids().zip(self.slots.iter())
    }
}

impl<T> Index<SlotId> for SlotArena<T> {
    type Output = T;

    #[inline]
    fn index(&self, id: SlotId) -> &T {
        &self.slots[id.offset()]
    }
}
