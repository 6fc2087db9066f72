use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing upload and ingest activity.
#[derive(Default)]
pub struct IngestMetrics {
    uploads_accepted: AtomicU64,
    records_stored: AtomicU64,
    ingest_failures: AtomicU64,
    summaries_degraded: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resume accepted by the upload endpoint.
    pub fn record_upload(&self) {
        self.uploads_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed ingest run that persisted a record.
    pub fn record_stored(&self) {
        self.records_stored.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an ingest run that aborted without persisting.
    pub fn record_failure(&self) {
        self.ingest_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a summarization failure that was downgraded to an empty summary.
    pub fn record_degraded_summary(&self) {
        self.summaries_degraded.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uploads_accepted: self.uploads_accepted.load(Ordering::Relaxed),
            records_stored: self.records_stored.load(Ordering::Relaxed),
            ingest_failures: self.ingest_failures.load(Ordering::Relaxed),
            summaries_degraded: self.summaries_degraded.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingest counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Uploads written to storage since startup.
    pub uploads_accepted: u64,
    /// Resume records persisted since startup.
    pub records_stored: u64,
    /// Ingest runs that aborted before persisting.
    pub ingest_failures: u64,
    /// Records persisted with an empty summary because summarization failed.
    pub summaries_degraded: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_each_counter_independently() {
        let metrics = IngestMetrics::new();
        metrics.record_upload();
        metrics.record_upload();
        metrics.record_stored();
        metrics.record_failure();
        metrics.record_degraded_summary();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.uploads_accepted, 2);
        assert_eq!(snapshot.records_stored, 1);
        assert_eq!(snapshot.ingest_failures, 1);
        assert_eq!(snapshot.summaries_degraded, 1);
    }

    #[test]
    fn snapshot_starts_empty() {
        assert_eq!(IngestMetrics::new().snapshot(), MetricsSnapshot::default());
    }
}
