use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    documents_processed: AtomicU64,
    documents_failed: AtomicU64,
    pages_extracted: AtomicU64,
    segments_produced: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a document that produced text, with its page and segment counts.
    pub fn record_document(&self, pages: u64, segments: u64) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.pages_extracted.fetch_add(pages, Ordering::Relaxed);
        self.segments_produced
            .fetch_add(segments, Ordering::Relaxed);
    }

    /// Record a document whose extraction failed or was rejected.
    pub fn record_failure(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_processed: self.documents_processed.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            pages_extracted: self.pages_extracted.load(Ordering::Relaxed),
            segments_produced: self.segments_produced.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents that yielded text since startup.
    pub documents_processed: u64,
    /// Documents that failed extraction or were rejected.
    pub documents_failed: u64,
    /// Pages extracted across all processed documents.
    pub pages_extracted: u64,
    /// Segments produced across all processed documents.
    pub segments_produced: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_pages_and_segments() {
        let metrics = PipelineMetrics::new();
        metrics.record_document(4, 2);
        metrics.record_document(1, 3);
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_processed, 2);
        assert_eq!(snapshot.documents_failed, 1);
        assert_eq!(snapshot.pages_extracted, 5);
        assert_eq!(snapshot.segments_produced, 5);
    }

    #[test]
    fn snapshot_starts_empty() {
        let snapshot = PipelineMetrics::new().snapshot();
        assert_eq!(snapshot.documents_processed, 0);
        assert_eq!(snapshot.documents_failed, 0);
        assert_eq!(snapshot.pages_extracted, 0);
        assert_eq!(snapshot.segments_produced, 0);
    }
}
