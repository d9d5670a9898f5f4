//! Growable matrix stress tests: co-occurrence counting from many threads.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use semantic_store::GrowingMatrix;
use stress_tests::{
    format_rate, generate_cells, generate_documents, quick_config, LatencyHistogram,
    ThroughputCounter,
};

/// Stress test: windowed co-occurrence counts over a skewed corpus.
///
/// Every thread processes its own documents but all of them hit the same
/// frequent-term rows. The final total must equal the number of counted
/// pairs exactly.
#[test]
#[ignore]
fn stress_matrix_cooccurrence_counts() {
    let config = quick_config();
    let threads = config.effective_thread_count();
    let vocabulary = config.effective_vocabulary();
    let docs_per_thread = config.effective_documents_per_thread();
    let window = config.window;

    println!("\n=== Matrix Co-occurrence ===");
    println!("Threads: {threads}, vocabulary: {vocabulary}, docs/thread: {docs_per_thread}");

    let matrix = Arc::new(GrowingMatrix::new());
    let counter = Arc::new(ThroughputCounter::new());

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let matrix = Arc::clone(&matrix);
            let counter = Arc::clone(&counter);
            let docs = generate_documents(
                docs_per_thread,
                config.document_length,
                vocabulary,
                t as u64,
            );
            thread::spawn(move || {
                let mut latencies = LatencyHistogram::new();
                let mut pairs = 0_u64;
                for doc in docs {
                    for (i, &focus) in doc.iter().enumerate() {
                        let end = (i + window + 1).min(doc.len());
                        for &neighbor in &doc[i + 1..end] {
                            let start = Instant::now();
                            matrix.add_and_get(focus, neighbor, 1.0).unwrap();
                            latencies.record_since(start);
                            pairs += 1;
                        }
                    }
                }
                counter.add(pairs);
                (pairs, latencies)
            })
        })
        .collect();

    let mut total_pairs = 0_u64;
    let mut merged = LatencyHistogram::new();
    for h in handles {
        let (pairs, latencies) = h.join().unwrap();
        total_pairs += pairs;
        merged.merge(&latencies);
    }

    let secs = counter.elapsed().as_secs_f64();
    println!("Pairs: {total_pairs} ({})", format_rate(total_pairs, secs));
    println!("add_and_get: {}", merged.snapshot());

    let dense_total: f64 = matrix.to_dense_array().iter().flatten().sum();
    #[allow(clippy::cast_precision_loss)]
    let expected = total_pairs as f64;
    assert_eq!(dense_total, expected);
    assert!(matrix.rows() <= vocabulary);
    assert!(matrix.columns() <= vocabulary);
}

/// Stress test: random writes while an exporter repeatedly snapshots.
#[test]
#[ignore]
fn stress_matrix_writes_during_export() {
    let config = quick_config();
    let threads = config.effective_thread_count();
    let rows = 2_000;
    let cols = 500;
    let per_thread = 50_000;

    println!("\n=== Matrix Writes During Export ===");

    let matrix = Arc::new(GrowingMatrix::new());
    let writers: Vec<_> = (0..threads)
        .map(|t| {
            let matrix = Arc::clone(&matrix);
            let cells = generate_cells(per_thread, rows, cols, 100 + t as u64);
            thread::spawn(move || {
                let mut latencies = LatencyHistogram::new();
                for (row, col, value) in cells {
                    let start = Instant::now();
                    matrix.set(row, col, value).unwrap();
                    latencies.record_since(start);
                }
                latencies
            })
        })
        .collect();

    let exporter = {
        let matrix = Arc::clone(&matrix);
        thread::spawn(move || {
            let mut latencies = LatencyHistogram::new();
            let mut last_rows = 0;
            for _ in 0..50 {
                let start = Instant::now();
                let dense = matrix.to_dense_array();
                latencies.record_since(start);
                assert!(dense.len() >= last_rows);
                let width = dense.first().map_or(0, Vec::len);
                assert!(dense.iter().all(|r| r.len() == width));
                last_rows = dense.len();
            }
            latencies
        })
    };

    let mut writes = LatencyHistogram::new();
    for h in writers {
        writes.merge(&h.join().unwrap());
    }
    let exports = exporter.join().unwrap();

    println!("set: {}", writes.snapshot());
    println!("to_dense_array: {}", exports.snapshot());
    assert!(matrix.rows() <= rows);
    assert!(matrix.columns() <= cols);
    assert!(matrix.non_zero_count() <= rows * cols);
}
