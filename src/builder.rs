//! Builder for [`LoadingCache`].
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use decisionkit::builder::LoadingCacheBuilder;
//! use decisionkit::cache::ManualClock;
//!
//! let clock = Arc::new(ManualClock::new());
//! let cache = LoadingCacheBuilder::new(100)
//!     .clock(clock)
//!     .build::<String>();
//! assert_eq!(cache.capacity(), 100);
//! ```

use std::sync::Arc;

use crate::cache::{Clock, LoadingCache, SystemClock};
use crate::error::ConfigError;

/// Configures and creates a [`LoadingCache`].
#[derive(Debug, Clone)]
pub struct LoadingCacheBuilder {
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl LoadingCacheBuilder {
    /// Starts a builder for a cache holding at most `capacity` keys.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the time source used for TTL expiry.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builds the cache.
    ///
    /// # Panics
    ///
    /// Panics if the capacity is zero.
    pub fn build<V>(self) -> LoadingCache<V> {
        LoadingCache::with_clock(self.capacity, self.clock)
    }

    /// Builds the cache, returning [`ConfigError`] if the capacity is zero.
    pub fn try_build<V>(self) -> Result<LoadingCache<V>, ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::new("capacity must be > 0"));
        }
        Ok(self.build())
    }
}
