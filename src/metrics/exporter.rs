use std::io::Write;

use parking_lot::Mutex;

use crate::metrics::snapshot::LoadingCacheMetricsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for cache metrics snapshots.
///
/// This exporter writes in the Prometheus text exposition format so it can be
/// scraped by Prometheus or forwarded to an OpenTelemetry collector.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the exporter and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_metric(&self, kind: &str, name: &str, value: u64) {
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "# TYPE {} {}", name, kind);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send> MetricsExporter<LoadingCacheMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &LoadingCacheMetricsSnapshot) {
        let counters = [
            ("hits_total", snapshot.hits),
            ("misses_total", snapshot.misses),
            ("bypasses_total", snapshot.bypasses),
            ("waits_total", snapshot.waits),
            ("loads_total", snapshot.loads),
            ("load_failures_total", snapshot.load_failures),
            ("loader_panics_total", snapshot.loader_panics),
            ("evictions_total", snapshot.evictions),
            ("deletions_total", snapshot.deletions),
        ];
        for (suffix, value) in counters {
            self.write_metric("counter", &self.metric_name(suffix), value);
        }
        self.write_metric("gauge", &self.metric_name("len"), snapshot.cache_len as u64);
        self.write_metric("gauge", &self.metric_name("capacity"), snapshot.capacity as u64);
    }
}
