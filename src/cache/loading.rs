//! # Loading Cache
//!
//! Bounded, thread-safe LRU cache with per-key TTL and request deduplication
//! ("singleflight"). Callers do not insert values; they ask for a key and hand
//! over a loader that computes it on a miss.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         LoadingCache<V>                              │
//!   │                                                                      │
//!   │   Mutex<Structure>  (global lock)                                    │
//!   │   ┌──────────────────────────────────────────────────────────────┐   │
//!   │   │  table:  FxHashMap<String, SlotId>                           │   │
//!   │   │  owners: [Option<String>; capacity]                          │   │
//!   │   │  links:  SlotLinks  (free stack + recency list)              │   │
//!   │   │                                                              │   │
//!   │   │    head ─► [2] ◄──► [4] ◄──► [1] ◄── tail      free ─► [3]   │   │
//!   │   │            MRU               LRU                             │   │
//!   │   └──────────────────────────────────────────────────────────────┘   │
//!   │                                                                      │
//!   │   SlotArena<Slot<V>>  (one lock + condvar per slot)                  │
//!   │   ┌──────────┬──────────┬──────────┬──────────┐                      │
//!   │   │ slot 1   │ slot 2   │ slot 3   │ slot 4   │                      │
//!   │   │ value    │ value    │ (empty)  │ loading  │                      │
//!   │   │ expiry   │ expiry   │          │ gen = 7  │                      │
//!   │   └──────────┴──────────┴──────────┴──────────┘                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## `get` Flow
//!
//! ```text
//!   ttl == 0 ──────────────────────────────► run loader, return (no caching)
//!
//!   lock structure
//!     key mapped?
//!       ├─ slot loading   ──► unlock, wait on slot condvar, retry from top
//!       ├─ slot fresh     ──► copy value, promote to MRU, return
//!       └─ slot expired   ──► begin_load in place, promote, unlock ─┐
//!     key unmapped                                                  │
//!       └─ pop free slot or evict victim, assign key, begin_load ───┤
//!                                                                   ▼
//!   run loader with NO lock held (panics are caught)
//!                                                                   │
//!   lock structure, lock slot, generation still ours?               │
//!       ├─ no  ──► result is returned but not stored                │
//!       ├─ Ok  ──► store value + expiry, wake waiters, promote      │
//!       └─ Err ──► reset slot, wake waiters, free slot, drop key ◄──┘
//! ```
//!
//! Waiters never receive another caller's error. When a load fails they wake,
//! find the key unmapped and load it themselves, so failures are never shared
//! and never cached.
//!
//! ## Eviction
//!
//! When the free stack is empty the victim is the least recently used slot
//! that is not loading. If every slot is loading, the LRU tail is evicted
//! anyway; its loader later notices the generation change and discards its
//! result, and its waiters wake and retry.
//!
//! ## Thread Safety
//!
//! - Lock order is structure, then slot. Slot locks are only held for short
//!   field updates and never while calling the loader.
//! - Slot handles are revalidated (key still mapped to the slot and
//!   generation unchanged) every time the structure lock is reacquired.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::slot::{assert_no_slot_lock_held, Expiry, Slot};
use crate::cancel::CancelToken;
use crate::ds::{SlotArena, SlotId, SlotLinks};
use crate::error::{ConfigError, InvariantError, LoadError};
#[cfg(feature = "metrics")]
use crate::metrics::{
    LoadingCacheMetrics, LoadingCacheMetricsSnapshot, LoadingMetricsRecorder, MetricsSnapshotProvider,
};

/// Key ownership and list links, guarded by the global lock.
struct Structure {
    table: FxHashMap<String, SlotId>,
    owners: Box<[Option<String>]>,
    links: SlotLinks,
}

impl Structure {
    fn new(capacity: usize) -> Self {
        Self {
            table: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            owners: vec![None; capacity].into_boxed_slice(),
            links: SlotLinks::new(capacity),
        }
    }

    #[inline]
    fn slot_of(&self, key: &str) -> Option<SlotId> {
        self.table.get(key).copied()
    }

    /// Binds a detached slot to `key` at the MRU position.
    fn assign(&mut self, id: SlotId, key: &str) {
        self.owners[id.offset()] = Some(key.to_owned());
        self.table.insert(key.to_owned(), id);
        self.links.push_front(id);
    }

    /// Unbinds `id` from its key and leaves it detached for reuse.
    fn unassign(&mut self, id: SlotId) -> Option<String> {
        let key = self.owners[id.offset()].take()?;
        self.table.remove(&key);
        self.links.unlink(id);
        Some(key)
    }

    /// Unbinds `id` from its key and returns it to the free stack.
    fn release(&mut self, id: SlotId) -> Option<String> {
        let key = self.unassign(id);
        self.links.push_free(id);
        key
    }
}

enum Lookup<V> {
    Hit(V),
    InFlight { id: SlotId, generation: u64 },
    Claimed { id: SlotId, generation: u64 },
    /// No free slot and nothing to evict. Only reachable with a broken
    /// structure; the caller loads without caching.
    Unavailable,
}

/// Bounded LRU cache with per-key TTL and singleflight loading.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use decisionkit::cache::LoadingCache;
/// use decisionkit::cancel::CancelToken;
///
/// let cache: LoadingCache<String> = LoadingCache::new(2);
/// let token = CancelToken::new();
///
/// let value = cache
///     .get(&token, "policy/allow", Duration::from_secs(30), |_, key| {
///         Ok::<_, std::io::Error>(format!("compiled {key}"))
///     })
///     .unwrap();
/// assert_eq!(value, "compiled policy/allow");
/// assert_eq!(cache.peek("policy/allow").as_deref(), Some("compiled policy/allow"));
/// ```
pub struct LoadingCache<V> {
    structure: Mutex<Structure>,
    slots: SlotArena<Slot<V>>,
    clock: Arc<dyn Clock>,
    #[cfg(feature = "metrics")]
    metrics: LoadingCacheMetrics,
}

impl<V> LoadingCache<V> {
    /// Creates a cache holding at most `capacity` keys.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Use [`try_new`](Self::try_new) for
    /// capacities that come from user input.
    pub fn new(capacity: usize) -> Self {
        Self::with_clock(capacity, Arc::new(SystemClock))
    }

    /// Creates a cache, returning [`ConfigError`] if `capacity` is zero.
    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::new("capacity must be > 0"));
        }
        Ok(Self::with_clock(capacity, Arc::new(SystemClock)))
    }

    /// Creates a cache that reads time from `clock`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_clock(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        assert!(capacity > 0, "LoadingCache capacity must be > 0");
        Self {
            structure: Mutex::new(Structure::new(capacity)),
            slots: SlotArena::with_capacity(capacity, |_| Slot::new()),
            clock,
            #[cfg(feature = "metrics")]
            metrics: LoadingCacheMetrics::default(),
        }
    }

    /// Maximum number of keys.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Number of keys currently mapped (cached, expired, or loading).
    pub fn len(&self) -> usize {
        self.lock_structure().table.len()
    }

    /// Returns `true` if no key is mapped.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `key` is mapped, whether fresh, expired, or loading.
    pub fn contains(&self, key: &str) -> bool {
        self.lock_structure().table.contains_key(key)
    }

    /// Mapped keys in recency order, most recently used first.
    pub fn keys_mru(&self) -> Vec<String> {
        let structure = self.lock_structure();
        structure
            .links
            .iter()
            .filter_map(|id| structure.owners[id.offset()].clone())
            .collect()
    }

    /// Removes `key`, freeing its slot even if a load is in flight.
    ///
    /// An in-flight loader for the removed key still returns its result to its
    /// caller, but the result is not stored. Returns `true` if `key` was mapped.
    pub fn delete(&self, key: &str) -> bool {
        let mut structure = self.lock_structure();
        let Some(id) = structure.slot_of(key) else {
            return false;
        };
        structure.release(id);

        let slot = &self.slots[id];
        slot.lock().reset();
        slot.notify_all();

        #[cfg(feature = "metrics")]
        self.metrics.record_delete();
        debug!(key, slot = id.index(), "cache entry deleted");
        true
    }

    /// Checks structural invariants: list consistency, free/recency
    /// disjointness, and agreement between the key table and slot owners.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let structure = self.lock_structure();
        structure.links.check_invariants()?;

        if structure.links.len() + structure.links.free_len() != self.capacity() {
            return Err(InvariantError::new("slot left detached outside a critical section"));
        }
        if structure.table.len() != structure.links.len() {
            return Err(InvariantError::new(format!(
                "key table has {} keys but recency list has {} slots",
                structure.table.len(),
                structure.links.len()
            )));
        }
        for (key, &id) in &structure.table {
            if structure.owners[id.offset()].as_deref() != Some(key.as_str()) {
                return Err(InvariantError::new(format!(
                    "slot {} is not owned by key `{key}`",
                    id.index()
                )));
            }
            if !structure.links.is_linked(id) {
                return Err(InvariantError::new(format!(
                    "mapped slot {} is not on the recency list",
                    id.index()
                )));
            }
        }
        let owned = structure.owners.iter().filter(|owner| owner.is_some()).count();
        if owned != structure.table.len() {
            return Err(InvariantError::new("slot owners disagree with key table"));
        }
        Ok(())
    }

    fn lock_structure(&self) -> MutexGuard<'_, Structure> {
        assert_no_slot_lock_held();
        self.structure.lock()
    }

    /// Picks an eviction victim, unbinds it and resets its slot.
    fn evict(&self, structure: &mut Structure) -> Option<SlotId> {
        let victim = structure
            .links
            .iter_lru()
            .find(|&id| !self.slots[id].lock().loading)
            .or_else(|| structure.links.back())?;

        let evicted_key = structure.unassign(victim);
        let slot = &self.slots[victim];
        slot.lock().reset();
        slot.notify_all();

        #[cfg(feature = "metrics")]
        self.metrics.record_eviction();
        debug!(
            key = evicted_key.as_deref().unwrap_or_default(),
            slot = victim.index(),
            "evicted least recently used entry"
        );
        Some(victim)
    }
}

impl<V: Clone> LoadingCache<V> {
    /// Returns the value for `key`, loading it on a miss.
    ///
    /// - `ttl == Duration::ZERO` bypasses the cache entirely: the loader runs
    ///   and its result is returned untouched. Concurrent bypass calls are not
    ///   deduplicated.
    /// - A fresh entry is returned without calling the loader and is promoted
    ///   to most recently used.
    /// - If another caller is loading `key`, this call blocks until that load
    ///   ends and then re-evaluates.
    /// - Otherwise this caller runs `loader` with no cache lock held. On
    ///   success the value is cached until `now + ttl`. On failure nothing is
    ///   cached and the error is returned.
    ///
    /// A canceled `token` is forwarded to the loader as-is; the cache does not
    /// short-circuit on cancellation. A loader that never returns keeps its
    /// slot loading and blocks its waiters indefinitely.
    ///
    /// # Errors
    ///
    /// [`LoadError::Loader`] carries the loader's error verbatim;
    /// [`LoadError::Panicked`] is returned if the loader panicked.
    pub fn get<E, F>(
        &self,
        token: &CancelToken,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> Result<V, LoadError<E>>
    where
        F: FnOnce(&CancelToken, &str) -> Result<V, E>,
    {
        if ttl.is_zero() {
            #[cfg(feature = "metrics")]
            self.metrics.record_bypass();
            trace!(key, "zero ttl, bypassing cache");
            return self.load(token, key, loader);
        }

        let (id, generation) = loop {
            match self.lookup_or_claim(key) {
                Lookup::Hit(value) => return Ok(value),
                Lookup::InFlight { id, generation } => {
                    #[cfg(feature = "metrics")]
                    self.metrics.record_wait();
                    trace!(key, slot = id.index(), "waiting for in-flight load");
                    self.slots[id].wait_while_loading(generation);
                },
                Lookup::Claimed { id, generation } => break (id, generation),
                Lookup::Unavailable => return self.load(token, key, loader),
            }
        };

        let outcome = self.load(token, key, loader);
        self.complete(key, id, generation, ttl, outcome)
    }

    /// Runs `loader` and counts its outcome, whether or not the result is
    /// later stored.
    fn load<E, F>(&self, token: &CancelToken, key: &str, loader: F) -> Result<V, LoadError<E>>
    where
        F: FnOnce(&CancelToken, &str) -> Result<V, E>,
    {
        let outcome = run_loader(token, key, loader);
        #[cfg(feature = "metrics")]
        match &outcome {
            Ok(_) => self.metrics.record_load_success(),
            Err(err) => self.metrics.record_load_failure(err.is_panic()),
        }
        outcome
    }

    /// Returns the cached value for `key` if it is present, not loading and
    /// not expired. Never loads, never changes recency, never waits on a load.
    pub fn peek(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let structure = self.lock_structure();
        let id = structure.slot_of(key)?;
        let state = self.slots[id].lock();
        state.fresh_value(now).cloned()
    }

    fn lookup_or_claim(&self, key: &str) -> Lookup<V> {
        let now = self.clock.now();
        let mut structure = self.lock_structure();

        if let Some(id) = structure.slot_of(key) {
            let mut state = self.slots[id].lock();
            if state.loading {
                return Lookup::InFlight {
                    id,
                    generation: state.generation,
                };
            }
            if let Some(value) = state.fresh_value(now) {
                let value = value.clone();
                drop(state);
                structure.links.move_to_front(id);
                #[cfg(feature = "metrics")]
                self.metrics.record_hit();
                trace!(key, slot = id.index(), "cache hit");
                return Lookup::Hit(value);
            }

            let generation = state.begin_load();
            drop(state);
            structure.links.move_to_front(id);
            #[cfg(feature = "metrics")]
            self.metrics.record_miss();
            trace!(key, slot = id.index(), "entry expired, reloading");
            return Lookup::Claimed { id, generation };
        }

        #[cfg(feature = "metrics")]
        self.metrics.record_miss();
        let id = match structure.links.pop_free() {
            Some(id) => id,
            None => match self.evict(&mut structure) {
                Some(id) => id,
                None => {
                    let detached = self
                        .capacity()
                        .saturating_sub(structure.links.len() + structure.links.free_len());
                    debug_assert_eq!(detached, 0, "slots detached outside a critical section");
                    warn!(key, detached, "no slot available for a cached load, loading uncached");
                    return Lookup::Unavailable;
                },
            },
        };
        structure.assign(id, key);
        let generation = self.slots[id].lock().begin_load();
        trace!(key, slot = id.index(), "cache miss, loading");
        Lookup::Claimed { id, generation }
    }

    fn complete<E>(
        &self,
        key: &str,
        id: SlotId,
        generation: u64,
        ttl: Duration,
        outcome: Result<V, LoadError<E>>,
    ) -> Result<V, LoadError<E>> {
        let now = self.clock.now();
        let mut structure = self.lock_structure();
        let slot = &self.slots[id];
        let mut state = slot.lock();

        if structure.slot_of(key) != Some(id) || !state.is_loading(generation) {
            drop(state);
            trace!(key, slot = id.index(), "slot reassigned during load, result not stored");
            return outcome;
        }

        match outcome {
            Ok(value) => {
                state.store(value.clone(), Expiry::after(now, ttl));
                drop(state);
                slot.notify_all();
                structure.links.move_to_front(id);
                Ok(value)
            },
            Err(err) => {
                state.reset();
                drop(state);
                slot.notify_all();
                structure.release(id);
                debug!(key, slot = id.index(), "load failed, slot released");
                Err(err)
            },
        }
    }
}

impl<V> fmt::Debug for LoadingCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadingCache")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("clock", &self.clock)
            .finish()
    }
}

#[cfg(feature = "metrics")]
impl<V> LoadingCache<V> {
    /// Returns a point-in-time copy of the cache counters.
    pub fn metrics_snapshot(&self) -> LoadingCacheMetricsSnapshot {
        self.metrics.snapshot(self.len(), self.capacity())
    }
}

#[cfg(feature = "metrics")]
impl<V> MetricsSnapshotProvider<LoadingCacheMetricsSnapshot> for LoadingCache<V> {
    fn snapshot(&self) -> LoadingCacheMetricsSnapshot {
        self.metrics_snapshot()
    }
}

/// Runs `loader`, converting a panic into [`LoadError::Panicked`].
fn run_loader<V, E, F>(token: &CancelToken, key: &str, loader: F) -> Result<V, LoadError<E>>
where
    F: FnOnce(&CancelToken, &str) -> Result<V, E>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| loader(token, key))) {
        Ok(result) => result.map_err(LoadError::Loader),
        Err(payload) => {
            let detail = panic_detail(payload.as_ref());
            warn!(key, panic = %detail, "cache loader panicked");
            Err(LoadError::Panicked(detail))
        },
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}



#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Get(u8),
        Fail(u8),
        Peek(u8),
        Delete(u8),
        Advance(u16),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (0u8..12).prop_map(Op::Get),
            1 => (0u8..12).prop_map(Op::Fail),
            2 => (0u8..12).prop_map(Op::Peek),
            1 => (0u8..12).prop_map(Op::Delete),
            1 => (0u16..2_000).prop_map(Op::Advance),
        ]
    }

    proptest! {
        /// Property: the number of mapped keys never exceeds capacity and the
        /// structure stays consistent under arbitrary operation sequences
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_capacity_and_invariants(
            capacity in 1usize..6,
            ops in prop::collection::vec(op_strategy(), 0..150)
        ) {
            let clock = Arc::new(ManualClock::new());
            let cache: LoadingCache<u8> = LoadingCache::with_clock(capacity, clock.clone());
            let token = CancelToken::new();
            let ttl = Duration::from_millis(500);

            for op in ops {
                match op {
                    Op::Get(k) => {
                        let value = cache
                            .get(&token, &k.to_string(), ttl, |_, _| Ok::<_, ()>(k))
                            .unwrap();
                        prop_assert_eq!(value, k);
                        prop_assert_eq!(cache.peek(&k.to_string()), Some(k));
                    }
                    Op::Fail(k) => {
                        let fresh = cache.peek(&k.to_string()).is_some();
                        let result = cache.get(&token, &k.to_string(), ttl, |_, _| Err::<u8, _>(()));
                        prop_assert_eq!(result.is_ok(), fresh);
                    }
                    Op::Peek(k) => {
                        if let Some(value) = cache.peek(&k.to_string()) {
                            prop_assert_eq!(value, k);
                        }
                    }
                    Op::Delete(k) => {
                        cache.delete(&k.to_string());
                        prop_assert!(!cache.contains(&k.to_string()));
                    }
                    Op::Advance(ms) => clock.advance(Duration::from_millis(u64::from(ms))),
                }
                prop_assert!(cache.len() <= capacity);
                prop_assert!(cache.check_invariants().is_ok());
            }
        }
    }
}
