// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reproducible corpus-shaped workloads.
//!
//! Term ids follow a log-uniform skew so a few terms are very frequent, as
//! in natural text. That concentrates writes on a few matrix rows and a few
//! generator map keys, which is the contention the stress tests are after.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Draw a term id in `0..vocabulary`, skewed toward small ids.
fn skewed_term<R: Rng>(rng: &mut R, vocabulary: usize) -> usize {
    #[allow(clippy::cast_precision_loss)]
    let upper = (vocabulary as f64 + 1.0).ln();
    let draw = rng.random_range(0.0..upper).exp();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let id = draw as usize;
    id.saturating_sub(1).min(vocabulary - 1)
}

/// Key used for term `id` in generator maps.
#[must_use]
pub fn term_key(id: usize) -> String {
    format!("term:{id}")
}

/// `count` documents of `length` term ids each.
///
/// # Panics
///
/// Panics if `vocabulary` is zero.
#[must_use]
pub fn generate_documents(
    count: usize,
    length: usize,
    vocabulary: usize,
    seed: u64,
) -> Vec<Vec<usize>> {
    assert!(vocabulary > 0, "vocabulary must be positive");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..length).map(|_| skewed_term(&mut rng, vocabulary)).collect())
        .collect()
}

/// `count` random `(row, col, value)` writes inside `rows` x `cols`.
#[must_use]
pub fn generate_cells(count: usize, rows: usize, cols: usize, seed: u64) -> Vec<(usize, usize, f64)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let row = rng.random_range(0..rows);
            let col = rng.random_range(0..cols);
            // Never zero, so every write stores a cell.
            let value = f64::from(rng.random_range(1..=9_u32));
            (row, col, value)
        })
        .collect()
}
