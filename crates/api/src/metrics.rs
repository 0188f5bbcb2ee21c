use annotate::SpanReport;
use batch::BatchResult;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,

    // Timing (in microseconds)
    total_resolve_time_us: AtomicU64,
    total_aggregate_time_us: AtomicU64,

    // Span quality
    texts_resolved: AtomicUsize,
    segments_rendered: AtomicUsize,
    entities_accepted: AtomicUsize,
    spans_clamped: AtomicUsize,
    spans_discarded: AtomicUsize,
    spans_shadowed: AtomicUsize,

    // Batches
    batches_aggregated: AtomicUsize,
    documents_aggregated: AtomicUsize,
    documents_failed: AtomicUsize,
    csv_exports: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicUsize::new(0),
            successful_requests: AtomicUsize::new(0),
            failed_requests: AtomicUsize::new(0),
            total_resolve_time_us: AtomicU64::new(0),
            total_aggregate_time_us: AtomicU64::new(0),
            texts_resolved: AtomicUsize::new(0),
            segments_rendered: AtomicUsize::new(0),
            entities_accepted: AtomicUsize::new(0),
            spans_clamped: AtomicUsize::new(0),
            spans_discarded: AtomicUsize::new(0),
            spans_shadowed: AtomicUsize::new(0),
            batches_aggregated: AtomicUsize::new(0),
            documents_aggregated: AtomicUsize::new(0),
            documents_failed: AtomicUsize::new(0),
            csv_exports: AtomicUsize::new(0),
        })
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record one resolved text and the span recoveries it needed.
    pub fn record_resolution(&self, duration: std::time::Duration, segments: usize, report: &SpanReport) {
        self.total_resolve_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.texts_resolved.fetch_add(1, Ordering::Relaxed);
        self.segments_rendered.fetch_add(segments, Ordering::Relaxed);
        self.entities_accepted.fetch_add(report.accepted, Ordering::Relaxed);
        self.spans_clamped.fetch_add(report.clamped, Ordering::Relaxed);
        self.spans_discarded.fetch_add(
            report.discarded_empty + report.discarded_out_of_range,
            Ordering::Relaxed,
        );
        self.spans_shadowed.fetch_add(report.shadowed, Ordering::Relaxed);
    }

    pub fn record_batch(&self, duration: std::time::Duration, batch: &BatchResult) {
        self.total_aggregate_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.batches_aggregated.fetch_add(1, Ordering::Relaxed);
        self.documents_aggregated.fetch_add(batch.total, Ordering::Relaxed);
        self.documents_failed.fetch_add(batch.failed, Ordering::Relaxed);
    }

    pub fn record_export(&self) {
        self.csv_exports.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            avg_resolve_time_ms: self.avg_time_ms(&self.total_resolve_time_us, &self.texts_resolved),
            avg_aggregate_time_ms: self.avg_time_ms(&self.total_aggregate_time_us, &self.batches_aggregated),
            texts_resolved: self.texts_resolved.load(Ordering::Relaxed),
            segments_rendered: self.segments_rendered.load(Ordering::Relaxed),
            entities_accepted: self.entities_accepted.load(Ordering::Relaxed),
            spans_clamped: self.spans_clamped.load(Ordering::Relaxed),
            spans_discarded: self.spans_discarded.load(Ordering::Relaxed),
            spans_shadowed: self.spans_shadowed.load(Ordering::Relaxed),
            batches_aggregated: self.batches_aggregated.load(Ordering::Relaxed),
            documents_aggregated: self.documents_aggregated.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            csv_exports: self.csv_exports.load(Ordering::Relaxed),
        }
    }

    fn avg_time_ms(&self, total_us: &AtomicU64, count: &AtomicUsize) -> f64 {
        let total = total_us.load(Ordering::Relaxed) as f64;
        let cnt = count.load(Ordering::Relaxed) as f64;
        if cnt > 0.0 {
            total / cnt / 1000.0 // Convert to ms
        } else {
            0.0
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub avg_resolve_time_ms: f64,
    pub avg_aggregate_time_ms: f64,
    pub texts_resolved: usize,
    pub segments_rendered: usize,
    pub entities_accepted: usize,
    pub spans_clamped: usize,
    pub spans_discarded: usize,
    pub spans_shadowed: usize,
    pub batches_aggregated: usize,
    pub documents_aggregated: usize,
    pub documents_failed: usize,
    pub csv_exports: usize,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
