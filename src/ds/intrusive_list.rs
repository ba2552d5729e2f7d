//! Free list and recency list over fixed slot handles.
//!
//! `SlotLinks` keeps one `Link { prev, next }` record per slot of a
//! fixed-capacity arena and threads two disjoint lists through them:
//!
//! ```text
//!   recency list (doubly linked, occupied slots)
//!
//!     head ─► [3] ◄──► [1] ◄──► [4] ◄── tail
//!             MRU                LRU
//!
//!   free list (singly linked stack through `next`)
//!
//!     free ─► [2] ──► [5] ──► None
//! ```
//!
//! A slot is in exactly one of three states: on the free stack, on the
//! recency list, or detached (popped from the free stack and not yet linked).
//! Detached is a transient state that only exists inside one critical section
//! of the owner.
//!
//! ## Operations
//! - `pop_free()` / `push_free(id)`: O(1) stack operations
//! - `push_front(id)`: attach a detached slot at the MRU end
//! - `move_to_front(id)`: O(1) promotion
//! - `unlink(id)`: O(1) detach from the recency list
//! - `iter_lru()`: walk from the LRU tail towards the head
//!
//! [`check_invariants`](SlotLinks::check_invariants) validates both lists.

use crate::ds::slot_arena::SlotId;
use crate::error::InvariantError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
    Free,
    Detached,
    Linked,
}

#[derive(Debug, Clone, Copy)]
struct Link {
    prev: Option<SlotId>,
    next: Option<SlotId>,
    membership: Membership,
}

/// Free stack plus intrusive recency list over `capacity` slot handles.
#[derive(Debug)]
pub struct SlotLinks {
    links: Box<[Link]>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
    free: Option<SlotId>,
    linked: usize,
    free_len: usize,
}

impl SlotLinks {
    /// Creates links for `capacity` slots, all on the free stack.
    ///
    /// Slot 1 is on top of the stack so allocation order is ascending.
    pub fn new(capacity: usize) -> Self {
        let links = (1..=capacity)
            .map(|index| Link {
                prev: None,
                next: SlotId::from_index(index + 1).filter(|_| index < capacity),
                membership: Membership::Free,
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            links,
            head: None,
            tail: None,
            free: SlotId::from_index(1).filter(|_| capacity > 0),
            linked: 0,
            free_len: capacity,
        }
    }

    /// Total number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.links.len()
    }

    /// Number of slots on the recency list.
    #[inline]
    pub fn len(&self) -> usize {
        self.linked
    }

    /// Returns `true` if the recency list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.linked == 0
    }

    /// Number of slots on the free stack.
    #[inline]
    pub fn free_len(&self) -> usize {
        self.free_len
    }

    /// Most recently used slot.
    #[inline]
    pub fn front(&self) -> Option<SlotId> {
        self.head
    }

    /// Least recently used slot.
    #[inline]
    pub fn back(&self) -> Option<SlotId> {
        self.tail
    }

    /// Returns `true` if `id` is on the recency list.
    pub fn is_linked(&self, id: SlotId) -> bool {
        self.link(id)
            .map(|link| link.membership == Membership::Linked)
            .unwrap_or(false)
    }

    /// Returns `true` if `id` is on the free stack.
    pub fn is_free(&self, id: SlotId) -> bool {
        self.link(id)
            .map(|link| link.membership == Membership::Free)
            .unwrap_or(false)
    }

    /// Pops a slot off the free stack. The slot is left detached.
    pub fn pop_free(&mut self) -> Option<SlotId> {
        let id = self.free?;
        let link = self.link_mut(id)?;
        debug_assert_eq!(link.membership, Membership::Free);
        let next = link.next.take();
        link.membership = Membership::Detached;
        self.free = next;
        self.free_len -= 1;
        Some(id)
    }

    /// Returns a slot to the free stack, unlinking it first if needed.
    ///
    /// Returns `false` if `id` is out of range or already free.
    pub fn push_free(&mut self, id: SlotId) -> bool {
        match self.link(id).map(|link| link.membership) {
            None | Some(Membership::Free) => return false,
            Some(Membership::Linked) => {
                self.unlink(id);
            },
            Some(Membership::Detached) => {},
        }
        let free = self.free;
        if let Some(link) = self.link_mut(id) {
            link.prev = None;
            link.next = free;
            link.membership = Membership::Free;
        }
        self.free = Some(id);
        self.free_len += 1;
        true
    }

    /// Attaches a detached slot at the MRU end. Returns `false` otherwise.
    pub fn push_front(&mut self, id: SlotId) -> bool {
        if self.link(id).map(|link| link.membership) != Some(Membership::Detached) {
            return false;
        }
        self.attach_front(id);
        true
    }

    /// Moves a linked slot to the MRU end; returns `false` if `id` is not linked.
    pub fn move_to_front(&mut self, id: SlotId) -> bool {
        if !self.is_linked(id) {
            return false;
        }
        if Some(id) == self.head {
            return true;
        }
        self.detach(id);
        self.attach_front(id);
        true
    }

    /// Detaches a linked slot from the recency list; returns `false` if not linked.
    pub fn unlink(&mut self, id: SlotId) -> bool {
        if !self.is_linked(id) {
            return false;
        }
        self.detach(id);
        true
    }

    /// Iterates recency order from MRU (head) to LRU (tail).
    pub fn iter(&self) -> SlotLinksIter<'_> {
        SlotLinksIter {
            links: self,
            current: self.head,
            forward: true,
        }
    }

    /// Iterates recency order from LRU (tail) to MRU (head).
    pub fn iter_lru(&self) -> SlotLinksIter<'_> {
        SlotLinksIter {
            links: self,
            current: self.tail,
            forward: false,
        }
    }

    /// Validates list structure: back-links, counts, and disjointness of the
    /// free stack and recency list.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let capacity = self.capacity();
        let mut seen = vec![false; capacity];

        let mut count = 0usize;
        let mut prev = None;
        let mut current = self.head;
        while let Some(id) = current {
            let link = self
                .link(id)
                .ok_or_else(|| InvariantError::new(format!("slot {} out of range", id.index())))?;
            if link.membership != Membership::Linked {
                return Err(InvariantError::new(format!(
                    "slot {} reachable from head but not marked linked",
                    id.index()
                )));
            }
            if std::mem::replace(&mut seen[id.offset()], true) {
                return Err(InvariantError::new("recency list contains a cycle"));
            }
            if link.prev != prev {
                return Err(InvariantError::new(format!(
                    "slot {} has a stale prev link",
                    id.index()
                )));
            }
            prev = Some(id);
            current = link.next;
            count += 1;
        }
        if self.tail != prev {
            return Err(InvariantError::new("tail does not match last linked slot"));
        }
        if count != self.linked {
            return Err(InvariantError::new(format!(
                "recency list has {count} slots, expected {}",
                self.linked
            )));
        }

        let mut free_count = 0usize;
        let mut current = self.free;
        while let Some(id) = current {
            let link = self
                .link(id)
                .ok_or_else(|| InvariantError::new(format!("slot {} out of range", id.index())))?;
            if link.membership != Membership::Free {
                return Err(InvariantError::new(format!(
                    "slot {} on free stack but not marked free",
                    id.index()
                )));
            }
            if std::mem::replace(&mut seen[id.offset()], true) {
                return Err(InvariantError::new(format!(
                    "slot {} is on both lists or repeated on the free stack",
                    id.index()
                )));
            }
            current = link.next;
            free_count += 1;
        }
        if free_count != self.free_len {
            return Err(InvariantError::new(format!(
                "free stack has {free_count} slots, expected {}",
                self.free_len
            )));
        }

        let detached = self
            .links
            .iter()
            .filter(|link| link.membership == Membership::Detached)
            .count();
        if count + free_count + detached != capacity {
            return Err(InvariantError::new("slot accounting does not add up to capacity"));
        }
        Ok(())
    }

    #[inline]
    fn link(&self, id: SlotId) -> Option<&Link> {
        self.links.get(id.offset())
    }

    #[inline]
    fn link_mut(&mut self, id: SlotId) -> Option<&mut Link> {
        self.links.get_mut(id.offset())
    }

    fn detach(&mut self, id: SlotId) {
        let Some(link) = self.link(id).copied() else {
            return;
        };

        match link.prev {
            Some(prev_id) => {
                if let Some(prev) = self.link_mut(prev_id) {
                    prev.next = link.next;
                }
            },
            None => self.head = link.next,
        }

        match link.next {
            Some(next_id) => {
                if let Some(next) = self.link_mut(next_id) {
                    next.prev = link.prev;
                }
            },
            None => self.tail = link.prev,
        }

        if let Some(link) = self.link_mut(id) {
            link.prev = None;
            link.next = None;
            link.membership = Membership::Detached;
        }
        self.linked -= 1;
    }

    fn attach_front(&mut self, id: SlotId) {
        let old_head = self.head;
        if let Some(link) = self.link_mut(id) {
            link.prev = None;
            link.next = old_head;
            link.membership = Membership::Linked;
        } else {
            return;
        }
        match old_head {
            Some(old_head) => {
                if let Some(head) = self.link_mut(old_head) {
                    head.prev = Some(id);
                }
            },
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        self.linked += 1;
    }
}

/// Iterator over linked slots in either recency direction.
pub struct SlotLinksIter<'a> {
    links: &'a SlotLinks,
    current: Option<SlotId>,
    forward: bool,
}

impl Iterator for SlotLinksIter<'_> {
    type Item = SlotId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let link = self.links.link(id)?;
        self.current = if self.forward { link.next } else { link.prev };
        Some(id)
    }
}
