//! Per-slot state, lock and wake-up condition.
//!
//! Each arena slot owns a `Mutex<SlotState<V>>` and a `Condvar`. The slot lock
//! guards value, expiry, loading flag and generation. Key ownership and list
//! links are *not* here; they live in the cache's structural table under the
//! global lock.
//!
//! ## Lock order
//!
//! ```text
//!   global (structure)  ──►  slot
//! ```
//!
//! A thread holding a slot lock must never request the global lock. Debug
//! builds track held slot locks per thread and assert this in
//! [`assert_no_slot_lock_held`].

#[cfg(debug_assertions)]
use std::cell::Cell;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

#[cfg(debug_assertions)]
thread_local! {
    static SLOT_LOCKS_HELD: Cell<usize> = const { Cell::new(0) };
}

/// Panics in debug builds if the current thread holds any slot lock.
#[inline]
pub(crate) fn assert_no_slot_lock_held() {
    #[cfg(debug_assertions)]
    SLOT_LOCKS_HELD.with(|held| {
        assert_eq!(
            held.get(),
            0,
            "lock order violated: structure lock requested while holding a slot lock"
        );
    });
}

/// When a cached value stops being fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Expiry {
    /// Nothing cached.
    Unset,
    /// Fresh strictly before this instant.
    At(Instant),
    /// TTL overflowed the clock; never expires.
    Never,
}

impl Expiry {
    pub(crate) fn after(now: Instant, ttl: Duration) -> Self {
        now.checked_add(ttl).map_or(Expiry::Never, Expiry::At)
    }

    #[inline]
    pub(crate) fn is_fresh(self, now: Instant) -> bool {
        match self {
            Expiry::Unset => false,
            Expiry::At(deadline) => now < deadline,
            Expiry::Never => true,
        }
    }
}

#[derive(Debug)]
pub(crate) struct SlotState<V> {
    pub(crate) value: Option<V>,
    pub(crate) expiry: Expiry,
    pub(crate) loading: bool,
    /// Bumped whenever the slot starts a load or is reset; a loader only
    /// stores its result if the generation it was handed is still current.
    pub(crate) generation: u64,
}

impl<V> SlotState<V> {
    fn empty() -> Self {
        Self {
            value: None,
            expiry: Expiry::Unset,
            loading: false,
            generation: 0,
        }
    }

    /// Marks the slot as loading for a new attempt and returns its generation.
    pub(crate) fn begin_load(&mut self) -> u64 {
        self.value = None;
        self.expiry = Expiry::Unset;
        self.loading = true;
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    /// Clears the slot and invalidates any in-flight attempt.
    pub(crate) fn reset(&mut self) {
        self.value = None;
        self.expiry = Expiry::Unset;
        self.loading = false;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Stores a loaded value and ends the attempt.
    pub(crate) fn store(&mut self, value: V, expiry: Expiry) {
        self.value = Some(value);
        self.expiry = expiry;
        self.loading = false;
    }

    /// Returns `true` while the attempt identified by `generation` is in flight.
    #[inline]
    pub(crate) fn is_loading(&self, generation: u64) -> bool {
        self.loading && self.generation == generation
    }

    /// Returns the cached value if it is not loading and not expired.
    #[inline]
    pub(crate) fn fresh_value(&self, now: Instant) -> Option<&V> {
        if self.loading || !self.expiry.is_fresh(now) {
            return None;
        }
        self.value.as_ref()
    }
}

pub(crate) struct Slot<V> {
    state: Mutex<SlotState<V>>,
    ready: Condvar,
}

impl<V> Slot<V> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::empty()),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn lock(&self) -> SlotGuard<'_, V> {
        let inner = self.state.lock();
        SlotGuard {
            inner,
            _held: HeldSlotLock::acquire(),
        }
    }

    /// Wakes every thread waiting on this slot.
    pub(crate) fn notify_all(&self) {
        self.ready.notify_all();
    }

    /// Blocks until the attempt identified by `generation` is no longer loading.
    pub(crate) fn wait_while_loading(&self, generation: u64) {
        let mut guard = self.lock();
        while guard.is_loading(generation) {
            self.ready.wait(&mut guard.inner);
        }
    }
}

pub(crate) struct SlotGuard<'a, V> {
    inner: MutexGuard<'a, SlotState<V>>,
    _held: HeldSlotLock,
}

impl<V> Deref for SlotGuard<'_, V> {
    type Target = SlotState<V>;

    fn deref(&self) -> &SlotState<V> {
        &self.inner
    }
}

impl<V> DerefMut for SlotGuard<'_, V> {
    fn deref_mut(&mut self) -> &mut SlotState<V> {
        &mut self.inner
    }
}

struct HeldSlotLock;

impl HeldSlotLock {
    #[inline]
    fn acquire() -> Self {
        #[cfg(debug_assertions)]
        SLOT_LOCKS_HELD.with(|held| held.set(held.get() + 1));
        HeldSlotLock
    }
}

impl Drop for HeldSlotLock {
    #[inline]
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        SLOT_LOCKS_HELD.with(|held| held.set(held.get() - 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn expiry_boundaries() {
        let now = Instant::now();
        let expiry = Expiry::after(now, Duration::from_secs(1));
        assert!(expiry.is_fresh(now));
        assert!(expiry.is_fresh(now + Duration::from_millis(999)));
        assert!(!expiry.is_fresh(now + Duration::from_secs(1)));
        assert!(!Expiry::Unset.is_fresh(now));
        assert_eq!(Expiry::after(now, Duration::MAX), Expiry::Never);
        assert!(Expiry::Never.is_fresh(now + Duration::from_secs(1 << 30)));
    }

    #[test]
    fn begin_load_invalidates_previous_generation() {
        let mut state: SlotState<u32> = SlotState::empty();
        let first = state.begin_load();
        assert!(state.is_loading(first));
        state.reset();
        assert!(!state.is_loading(first));
        let second = state.begin_load();
        assert_ne!(first, second);
        assert!(state.is_loading(second));
    }

    #[test]
    fn fresh_value_hides_loading_and_expired() {
        let now = Instant::now();
        let mut state: SlotState<u32> = SlotState::empty();
        state.begin_load();
        assert_eq!(state.fresh_value(now), None);
        state.store(7, Expiry::after(now, Duration::from_secs(5)));
        assert_eq!(state.fresh_value(now), Some(&7));
        assert_eq!(state.fresh_value(now + Duration::from_secs(5)), None);
    }

    #[test]
    fn waiter_wakes_when_load_ends() {
        let slot: Arc<Slot<u32>> = Arc::new(Slot::new());
        let generation = slot.lock().begin_load();

        let waiter = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || slot.wait_while_loading(generation))
        };

        thread::sleep(Duration::from_millis(20));
        slot.lock().store(1, Expiry::Never);
        slot.notify_all();
        waiter.join().unwrap();
    }

    #[test]
    fn wait_returns_immediately_for_stale_generation() {
        let slot: Slot<u32> = Slot::new();
        let stale = slot.lock().begin_load();
        slot.lock().begin_load();
        slot.wait_while_loading(stale);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "lock order violated")]
    fn structure_lock_under_slot_lock_is_caught() {
        let slot: Slot<u32> = Slot::new();
        let _guard = slot.lock();
        assert_no_slot_lock_held();
    }
}
