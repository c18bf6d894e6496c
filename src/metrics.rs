use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing the outcome of an ingestion run.
#[derive(Default)]
pub struct IngestMetrics {
    files_seen: AtomicU64,
    files_ingested: AtomicU64,
    files_skipped: AtomicU64,
    files_failed: AtomicU64,
    chunks_stored: AtomicU64,
    batches_failed: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file returned by the folder listing.
    pub fn record_seen(&self) {
        self.files_seen.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a file whose chunks were embedded and written.
    pub fn record_ingested(&self) {
        self.files_ingested.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a deliberately skipped file.
    pub fn record_skipped(&self) {
        self.files_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a file abandoned after an error.
    pub fn record_failed(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch of chunk rows accepted by the store.
    pub fn record_stored(&self, chunk_count: u64) {
        self.chunks_stored.fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record a batch the store rejected.
    pub fn record_batch_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Zero every counter before a new run.
    pub fn reset(&self) {
        for counter in [
            &self.files_seen,
            &self.files_ingested,
            &self.files_skipped,
            &self.files_failed,
            &self.chunks_stored,
            &self.batches_failed,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_seen: self.files_seen.load(Ordering::Relaxed),
            files_ingested: self.files_ingested.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            chunks_stored: self.chunks_stored.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of run counters used for the completion summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Files returned by the folder listing.
    pub files_seen: u64,
    /// Files fully processed (some batches may still have failed to store).
    pub files_ingested: u64,
    /// Files skipped as unsupported, already ingested, or empty.
    pub files_skipped: u64,
    /// Files abandoned after a download, parse, or embedding error.
    pub files_failed: u64,
    /// Chunk rows accepted by the store.
    pub chunks_stored: u64,
    /// Batches rejected by the store.
    pub batches_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_files_and_chunks() {
        let metrics = IngestMetrics::new();
        metrics.record_seen();
        metrics.record_seen();
        metrics.record_ingested();
        metrics.record_skipped();
        metrics.record_stored(10);
        metrics.record_stored(3);
        metrics.record_batch_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.files_seen, 2);
        assert_eq!(snapshot.files_ingested, 1);
        assert_eq!(snapshot.files_skipped, 1);
        assert_eq!(snapshot.files_failed, 0);
        assert_eq!(snapshot.chunks_stored, 13);
        assert_eq!(snapshot.batches_failed, 1);
    }

    #[test]
    fn snapshot_starts_empty() {
        assert_eq!(IngestMetrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn reset_clears_every_counter() {
        let metrics = IngestMetrics::new();
        metrics.record_seen();
        metrics.record_failed();
        metrics.record_stored(4);
        metrics.record_batch_failed();

        metrics.reset();

        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }
}
