//! Concurrent loading cache.
//!
//! - [`LoadingCache`]: bounded LRU with per-key TTL and singleflight loads
//! - [`Clock`], [`SystemClock`], [`ManualClock`]: time sources for expiry

pub mod clock;
pub mod loading;
mod slot;

pub use clock::{Clock, ManualClock, SystemClock};
pub use loading::LoadingCache;
