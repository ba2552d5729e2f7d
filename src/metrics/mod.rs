//! Counters for the loading cache, compiled only with the `metrics` feature.
//!
//! Recording, snapshotting and export are split into separate traits so the
//! cache only ever writes counters and monitoring code only ever reads them.

pub mod exporter;
pub mod metrics_impl;
pub mod snapshot;
pub mod traits;

pub use exporter::PrometheusTextExporter;
pub use metrics_impl::LoadingCacheMetrics;
pub use snapshot::LoadingCacheMetricsSnapshot;
pub use traits::{LoadingMetricsRecorder, MetricsExporter, MetricsReset, MetricsSnapshotProvider};
