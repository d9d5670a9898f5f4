// SPDX-License-Identifier: MIT OR Apache-2.0
//! Latency and throughput metrics for stress tests.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use hdrhistogram::Histogram;

/// Highest latency tracked, in microseconds (one minute).
const MAX_TRACKED_MICROS: u64 = 60_000_000;

/// Per-thread latency histogram, merged after the threads join.
pub struct LatencyHistogram {
    histogram: Histogram<u64>,
}

impl LatencyHistogram {
    /// # Panics
    ///
    /// Never in practice: the bounds are constant and valid.
    pub fn new() -> Self {
        Self {
            histogram: Histogram::new_with_bounds(1, MAX_TRACKED_MICROS, 3)
                .expect("constant histogram bounds"),
        }
    }

    /// Record one operation; values past the tracked range are clamped.
    #[allow(clippy::cast_possible_truncation)]
    pub fn record(&mut self, duration: Duration) {
        self.histogram.saturating_record(duration.as_micros() as u64);
    }

    /// Record the time elapsed since `start`.
    pub fn record_since(&mut self, start: Instant) {
        self.record(start.elapsed());
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    /// Fold `other` into this histogram.
    pub fn merge(&mut self, other: &LatencyHistogram) {
        // Both sides share the same bounds, so adding cannot fail.
        let _ = self.histogram.add(&other.histogram);
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn snapshot(&self) -> LatencySnapshot {
        let at = |q| Duration::from_micros(self.histogram.value_at_quantile(q));
        LatencySnapshot {
            count: self.histogram.len(),
            p50: at(0.5),
            p95: at(0.95),
            p99: at(0.99),
            max: Duration::from_micros(self.histogram.max()),
            mean: Duration::from_micros(self.histogram.mean() as u64),
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time latency statistics.
#[derive(Debug, Clone)]
pub struct LatencySnapshot {
    pub count: u64,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub max: Duration,
    pub mean: Duration,
}

impl std::fmt::Display for LatencySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "n={} mean={:?} p50={:?} p95={:?} p99={:?} max={:?}",
            self.count, self.mean, self.p50, self.p95, self.p99, self.max
        )
    }
}

/// Operation counter shared across worker threads.
pub struct ThroughputCounter {
    ops: AtomicU64,
    started: Instant,
}

impl ThroughputCounter {
    pub fn new() -> Self {
        Self {
            ops: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn add(&self, n: u64) {
        self.ops.fetch_add(n, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.ops.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Operations per second since creation.
    #[allow(clippy::cast_precision_loss)]
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.count() as f64 / secs
        } else {
            0.0
        }
    }
}

impl Default for ThroughputCounter {
    fn default() -> Self {
        Self::new()
    }
}
