//! Service metrics
//!
//! Monotonic counters plus a running latency average, updated incrementally
//! on every request and never recomputed from history.

use serde::Serialize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
struct LatencyAverage {
    count: u64,
    avg_ms: f64,
}

/// Request and cache counters for one service instance
#[derive(Debug, Default)]
pub struct ServiceMetrics {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    latency: Mutex<LatencyAverage>,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub avg_latency_ms: f64,
}

impl ServiceMetrics {
    /// Create zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold one observed latency into the running average
    pub fn record_latency(&self, latency: Duration) {
        if let Ok(mut avg) = self.latency.lock() {
            avg.count += 1;
            let ms = latency.as_secs_f64() * 1000.0;
            avg.avg_ms += (ms - avg.avg_ms) / avg.count as f64;
        }
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        let avg_latency_ms = self.latency.lock().map(|avg| avg.avg_ms).unwrap_or(0.0);
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            avg_latency_ms,
        }
    }
}
