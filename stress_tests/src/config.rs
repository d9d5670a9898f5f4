// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scale presets for stress tests.

use std::env;

/// Scale level for stress tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleLevel {
    /// 10K-term vocabulary, ~1 min
    Quick,
    /// 100K-term vocabulary, ~5 min
    Full,
    /// Sustained load for long runs
    Endurance,
}

/// Workload shape for a stress run.
#[derive(Debug, Clone)]
pub struct StressConfig {
    pub scale: ScaleLevel,
    /// Distinct terms (matrix rows, generator map keys).
    pub vocabulary: usize,
    pub thread_count: usize,
    /// Documents processed by each thread.
    pub documents_per_thread: usize,
    pub document_length: usize,
    /// Co-occurrence window on each side of a focus term.
    pub window: usize,
    /// Length of generated index vectors.
    pub vector_length: usize,
}

fn env_override<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl StressConfig {
    /// Thread count, respecting the `STRESS_THREADS` override.
    #[must_use]
    pub fn effective_thread_count(&self) -> usize {
        env_override("STRESS_THREADS", self.thread_count)
    }

    /// Vocabulary size, respecting the `STRESS_VOCABULARY` override.
    #[must_use]
    pub fn effective_vocabulary(&self) -> usize {
        env_override("STRESS_VOCABULARY", self.vocabulary)
    }

    /// Documents per thread, respecting the `STRESS_DOCUMENTS` override.
    #[must_use]
    pub fn effective_documents_per_thread(&self) -> usize {
        env_override("STRESS_DOCUMENTS", self.documents_per_thread)
    }
}

/// Quick preset: 10K terms, 8 threads.
#[must_use]
pub const fn quick_config() -> StressConfig {
    StressConfig {
        scale: ScaleLevel::Quick,
        vocabulary: 10_000,
        thread_count: 8,
        documents_per_thread: 200,
        document_length: 500,
        window: 2,
        vector_length: 2_000,
    }
}

/// Full preset: 100K terms, 16 threads.
#[must_use]
pub const fn full_config() -> StressConfig {
    StressConfig {
        scale: ScaleLevel::Full,
        vocabulary: 100_000,
        thread_count: 16,
        documents_per_thread: 1_000,
        document_length: 1_000,
        window: 4,
        vector_length: 20_000,
    }
}

/// Endurance preset: moderate vocabulary, many documents.
#[must_use]
pub const fn endurance_config() -> StressConfig {
    StressConfig {
        scale: ScaleLevel::Endurance,
        vocabulary: 50_000,
        thread_count: 8,
        documents_per_thread: 20_000,
        document_length: 500,
        window: 2,
        vector_length: 4_000,
    }
}
