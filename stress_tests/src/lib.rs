// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stress test utilities for `semantic_store`.
//!
//! Provides corpus-shaped workload generators, latency histograms, and
//! scale presets for hammering the growable matrix and generator maps from
//! many threads at once.

pub mod config;
pub mod generators;
pub mod metrics;

pub use config::{endurance_config, full_config, quick_config, ScaleLevel, StressConfig};
pub use generators::{generate_cells, generate_documents, term_key};
pub use metrics::{LatencyHistogram, LatencySnapshot, ThroughputCounter};

/// Format an operation rate as a human-readable string.
#[must_use]
pub fn format_rate(ops: u64, secs: f64) -> String {
    if secs <= 0.0 {
        return "n/a".to_owned();
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = ops as f64 / secs;
    if rate >= 1_000_000.0 {
        format!("{:.2}M ops/s", rate / 1_000_000.0)
    } else if rate >= 1_000.0 {
        format!("{:.1}K ops/s", rate / 1_000.0)
    } else {
        format!("{rate:.0} ops/s")
    }
}
