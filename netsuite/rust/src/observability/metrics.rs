//! Request and record counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector shared by the client and the fetch engine.
#[derive(Debug, Default)]
pub struct Metrics {
    requests_total: AtomicU64,
    requests_success: AtomicU64,
    requests_failed: AtomicU64,
    requests_retried: AtomicU64,
    read_only_rejections: AtomicU64,
    records_fetched: AtomicU64,
    records_skipped: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an attempt sent to the transport.
    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.requests_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.requests_retried.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a request rejected by the read-only gate.
    pub fn record_read_only_rejection(&self) {
        self.read_only_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_records_fetched(&self, count: u64) {
        self.records_fetched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_records_skipped(&self, count: u64) {
        self.records_skipped.fetch_add(count, Ordering::Relaxed);
    }

    /// Gets a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests_total.load(Ordering::Relaxed),
            successes: self.requests_success.load(Ordering::Relaxed),
            failures: self.requests_failed.load(Ordering::Relaxed),
            retries: self.requests_retried.load(Ordering::Relaxed),
            read_only_rejections: self.read_only_rejections.load(Ordering::Relaxed),
            records_fetched: self.records_fetched.load(Ordering::Relaxed),
            records_skipped: self.records_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub retries: u64,
    pub read_only_rejections: u64,
    pub records_fetched: u64,
    pub records_skipped: u64,
}
