use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::snapshot::LoadingCacheMetricsSnapshot;
use crate::metrics::traits::{LoadingMetricsRecorder, MetricsReset};

/// Atomic counters owned by a [`LoadingCache`](crate::cache::LoadingCache).
#[derive(Debug, Default)]
pub struct LoadingCacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    bypasses: AtomicU64,
    waits: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
    loader_panics: AtomicU64,
    evictions: AtomicU64,
    deletions: AtomicU64,
}

#[inline]
fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl LoadingCacheMetrics {
    pub fn snapshot(&self, cache_len: usize, capacity: usize) -> LoadingCacheMetricsSnapshot {
        LoadingCacheMetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            bypasses: self.bypasses.load(Ordering::Relaxed),
            waits: self.waits.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            loader_panics: self.loader_panics.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            deletions: self.deletions.load(Ordering::Relaxed),
            cache_len,
            capacity,
        }
    }
}

impl LoadingMetricsRecorder for LoadingCacheMetrics {
    fn record_hit(&self) {
        bump(&self.hits);
    }

    fn record_miss(&self) {
        bump(&self.misses);
    }

    fn record_bypass(&self) {
        bump(&self.bypasses);
    }

    fn record_wait(&self) {
        bump(&self.waits);
    }

    fn record_load_success(&self) {
        bump(&self.loads);
    }

    fn record_load_failure(&self, panicked: bool) {
        bump(&self.load_failures);
        if panicked {
            bump(&self.loader_panics);
        }
    }

    fn record_eviction(&self) {
        bump(&self.evictions);
    }

    fn record_delete(&self) {
        bump(&self.deletions);
    }
}

impl MetricsReset for LoadingCacheMetrics {
    fn reset_metrics(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.bypasses,
            &self.waits,
            &self.loads,
            &self.load_failures,
            &self.loader_panics,
            &self.evictions,
            &self.deletions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_count_panics_separately() {
        let metrics = LoadingCacheMetrics::default();
        metrics.record_miss();
        metrics.record_load_failure(false);
        metrics.record_load_failure(true);
        let snapshot = metrics.snapshot(0, 4);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.load_failures, 2);
        assert_eq!(snapshot.loader_panics, 1);
        assert_eq!(snapshot.capacity, 4);
    }

    #[test]
    fn reset_clears_counters() {
        let metrics = LoadingCacheMetrics::default();
        metrics.record_hit();
        metrics.record_eviction();
        metrics.reset_metrics();
        assert_eq!(metrics.snapshot(1, 1), LoadingCacheMetricsSnapshot {
            cache_len: 1,
            capacity: 1,
            ..Default::default()
        });
    }
}
