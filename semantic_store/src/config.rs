// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration for the matrix and the vector generators.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Default row limit for a growable matrix (100 million).
pub const DEFAULT_MAX_ROWS: usize = 100_000_000;

/// Default column limit for a growable matrix (`u32` positions).
pub const DEFAULT_MAX_COLUMNS: usize = u32::MAX as usize;

/// Bounds and sizing for [`GrowingMatrix`](crate::GrowingMatrix).
///
/// A limit of 0 means unlimited (columns are still capped by the `u32`
/// positions of sparse rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// Writes to `row >= max_rows` are rejected.
    pub max_rows: usize,
    /// Writes to `col >= max_columns` are rejected.
    pub max_columns: usize,
    /// Capacity hint for the row table.
    pub initial_row_capacity: usize,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            max_columns: DEFAULT_MAX_COLUMNS,
            initial_row_capacity: 0,
        }
    }
}

impl MatrixConfig {
    /// No row limit; columns limited only by sparse row positions.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_rows: 0,
            max_columns: 0,
            initial_row_capacity: 0,
        }
    }

    #[must_use]
    pub const fn with_limits(max_rows: usize, max_columns: usize) -> Self {
        Self {
            max_rows,
            max_columns,
            initial_row_capacity: 0,
        }
    }

    #[must_use]
    pub const fn with_row_capacity(mut self, capacity: usize) -> Self {
        self.initial_row_capacity = capacity;
        self
    }

    /// Effective row limit, with 0 meaning unlimited.
    pub(crate) const fn row_limit(&self) -> usize {
        if self.max_rows == 0 {
            usize::MAX
        } else {
            self.max_rows
        }
    }

    /// Effective column limit, never beyond what a sparse row can store.
    pub(crate) const fn column_limit(&self) -> usize {
        if self.max_columns == 0 || self.max_columns > DEFAULT_MAX_COLUMNS {
            DEFAULT_MAX_COLUMNS
        } else {
            self.max_columns
        }
    }
}

/// Default length of random index vectors.
pub const DEFAULT_INDEX_VECTOR_LENGTH: usize = 20_000;

/// Default number of non-zero positions in a random index vector.
pub const DEFAULT_INDEX_VECTOR_VALUES: usize = 4;

/// Settings for [`RandomIndexGenerator`](crate::RandomIndexGenerator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomIndexConfig {
    /// Length used when a map asks for the default length.
    pub vector_length: usize,
    /// Expected number of non-zero (+1/-1) positions per vector.
    pub non_zero_values: usize,
    /// Maximum random deviation from `non_zero_values`.
    pub variance: usize,
    /// Seed for reproducible vectors; `None` draws from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for RandomIndexConfig {
    fn default() -> Self {
        Self {
            vector_length: DEFAULT_INDEX_VECTOR_LENGTH,
            non_zero_values: DEFAULT_INDEX_VECTOR_VALUES,
            variance: 0,
            seed: None,
        }
    }
}

impl RandomIndexConfig {
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` if the vector length is zero or cannot hold
    /// the requested number of non-zero values.
    pub fn validate(&self) -> Result<()> {
        if self.vector_length == 0 {
            return Err(StoreError::InvalidConfig(
                "vector_length must be positive".into(),
            ));
        }
        let most = self.non_zero_values + self.variance;
        if most > self.vector_length {
            return Err(StoreError::InvalidConfig(format!(
                "{most} non-zero values do not fit in length {}",
                self.vector_length
            )));
        }
        Ok(())
    }
}

/// Settings for [`GaussianGenerator`](crate::GaussianGenerator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianConfig {
    /// Standard deviation of every sampled value.
    pub stdev: f64,
    pub seed: Option<u64>,
}

impl Default for GaussianConfig {
    fn default() -> Self {
        Self {
            stdev: 1.0,
            seed: None,
        }
    }
}

impl GaussianConfig {
    /// # Errors
    ///
    /// Returns `InvalidConfig` unless `stdev` is finite and positive.
    pub fn validate(&self) -> Result<()> {
        if !(self.stdev.is_finite() && self.stdev > 0.0) {
            return Err(StoreError::InvalidConfig(format!(
                "stdev must be finite and positive, got {}",
                self.stdev
            )));
        }
        Ok(())
    }
}
