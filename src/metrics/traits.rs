//! # Metrics Traits
//!
//! ```text
//!   ┌──────────────────────────────┐
//!   │   LoadingMetricsRecorder     │   written by LoadingCache on every path
//!   │  hit/miss/bypass/wait        │
//!   │  load ok/failed/panicked     │
//!   │  evict/delete                │
//!   └──────────────┬───────────────┘
//!                  │
//!   Consumption (decoupled from recording):
//!   ┌──────────────────────────────┐    ┌──────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>   │    │ MetricsExporter<S>           │
//!   │ (bench/test)                 │    │ (production monitoring)      │
//!   └──────────────────────────────┘    └──────────────────────────────┘
//! ```
//!
//! Recorders take `&self`: the cache is shared across threads and counters
//! are atomics, so no recorder method needs exclusive access.

/// Counters written by the loading cache.
pub trait LoadingMetricsRecorder {
    fn record_hit(&self);
    fn record_miss(&self);
    fn record_bypass(&self);
    fn record_wait(&self);
    fn record_load_success(&self);
    /// `panicked` distinguishes a caught loader panic from a returned error.
    fn record_load_failure(&self, panicked: bool);
    fn record_eviction(&self);
    fn record_delete(&self);
}

/// Snapshot provider for bench/testing.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Reset metrics between tests or benchmark iterations.
pub trait MetricsReset {
    fn reset_metrics(&self);
}

/// Export/publish metrics to production monitoring backends.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
