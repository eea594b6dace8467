use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Histogram {
    buckets: Vec<(u64, u64)>,
    sum_ms: u64,
    count: u64,
}

impl Histogram {
    pub fn new() -> Self {
        Self {
            buckets: vec![
                (1, 0),
                (5, 0),
                (10, 0),
                (50, 0),
                (100, 0),
                (500, 0),
                (1000, 0),
                (5000, 0),
                (u64::MAX, 0),
            ],
            sum_ms: 0,
            count: 0,
        }
    }

    pub fn observe(&mut self, value_ms: u64) {
        self.sum_ms += value_ms;
        self.count += 1;

        for (threshold, count) in &mut self.buckets {
            if value_ms <= *threshold {
                *count += 1;
                break;
            }
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum_ms as f64 / self.count as f64
        }
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

// Atomic counter so generators running on different tasks never contend
#[derive(Debug)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self { value: AtomicU64::new(0) }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-run counters. A fresh instance is created for every orchestration run.
pub struct Metrics {
    pub flush_latency: Mutex<Histogram>,

    pub urls_written: Counter,
    pub files_written: Counter,
    pub duplicates_skipped: Counter,
    pub blocked_skipped: Counter,
    pub bucket_mismatch_skipped: Counter,
    pub source_requests: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            flush_latency: Mutex::new(Histogram::new()),
            urls_written: Counter::new(),
            files_written: Counter::new(),
            duplicates_skipped: Counter::new(),
            blocked_skipped: Counter::new(),
            bucket_mismatch_skipped: Counter::new(),
            source_requests: Counter::new(),
        }
    }

    pub fn record_flush(&self, entries: usize, duration: Duration) {
        self.flush_latency.lock().observe(duration.as_millis() as u64);
        self.files_written.inc();
        self.urls_written.add(entries as u64);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let hist = self.flush_latency.lock();
        MetricsSnapshot {
            urls_written: self.urls_written.get(),
            files_written: self.files_written.get(),
            duplicates_skipped: self.duplicates_skipped.get(),
            blocked_skipped: self.blocked_skipped.get(),
            bucket_mismatch_skipped: self.bucket_mismatch_skipped.get(),
            source_requests: self.source_requests.get(),
            mean_flush_ms: hist.mean_ms(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedMetrics = Arc<Metrics>;

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub urls_written: u64,
    pub files_written: u64,
    pub duplicates_skipped: u64,
    pub blocked_skipped: u64,
    pub bucket_mismatch_skipped: u64,
    pub source_requests: u64,
    pub mean_flush_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram() {
        let mut hist = Histogram::new();
        hist.observe(5);
        hist.observe(10);
        hist.observe(15);

        assert_eq!(hist.count(), 3);
        assert_eq!(hist.mean_ms(), 10.0);
    }

    #[test]
    fn test_counter() {
        let counter = Counter::new();
        counter.inc();
        counter.add(5);
        assert_eq!(counter.get(), 6);
    }

    #[test]
    fn test_record_flush_updates_counters() {
        let metrics = Metrics::new();
        metrics.record_flush(50_000, Duration::from_millis(12));
        metrics.record_flush(20_001, Duration::from_millis(4));
        let snap = metrics.snapshot();
        assert_eq!(snap.files_written, 2);
        assert_eq!(snap.urls_written, 70_001);
        assert_eq!(snap.mean_flush_ms, 8.0);
    }
}
