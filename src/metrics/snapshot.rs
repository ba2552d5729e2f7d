/// Point-in-time copy of [`LoadingCacheMetrics`](super::LoadingCacheMetrics).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadingCacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub bypasses: u64,
    pub waits: u64,

    pub loads: u64,
    pub load_failures: u64,
    pub loader_panics: u64,

    pub evictions: u64,
    pub deletions: u64,

    // gauges captured at snapshot time
    pub cache_len: usize,
    pub capacity: usize,
}

impl LoadingCacheMetricsSnapshot {
    /// Fraction of cached lookups served without a load; `0.0` before any lookup.
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}
