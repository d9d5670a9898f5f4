// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sparse storage where zero is never stored.
//!
//! A [`SparseRow`] is the storage unit: two parallel arrays, strictly
//! increasing positions and their non-zero values. It has no length of its
//! own, which is what lets a matrix row grow with the matrix. A
//! [`SparseVector`] pins a row to a fixed dimension and implements
//! [`Vector`].
//!
//! Neither type locks anything. Shared mutation goes through the matrix's
//! per-row locks or an [`AtomicVector`](crate::AtomicVector).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
    error::{check_index, Result, StoreError},
    vector::Vector,
};

/// Convert a logical index into a stored position.
#[inline]
fn position(index: usize) -> Result<u32> {
    u32::try_from(index).map_err(|_| StoreError::out_of_bounds(index, u32::MAX as usize + 1))
}

/// Sorted sparse storage of non-zero values.
///
/// Invariants: `positions` is strictly increasing, `values.len() ==
/// positions.len()`, and no stored value is `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseRow {
    positions: Vec<u32>,
    values: Vec<f64>,
}

impl SparseRow {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            positions: Vec::new(),
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Build a row from a dense slice, keeping only non-zero values.
    #[must_use]
    pub fn from_dense(dense: &[f64]) -> Self {
        let mut row = Self::new();
        row.set_dense(dense);
        row
    }

    /// Number of stored (non-zero) values.
    #[inline]
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the storage invariants hold. Rows built through this API
    /// always pass; deserialized rows may not.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.positions.len() == self.values.len()
            && self.positions.windows(2).all(|w| w[0] < w[1])
            && self.values.iter().all(|&v| v != 0.0)
    }

    /// One past the highest stored position, or 0 for an empty row.
    #[must_use]
    pub fn extent(&self) -> usize {
        self.positions.last().map_or(0, |&p| p as usize + 1)
    }

    /// Value at `index`, or 0 when nothing is stored there. O(log nnz).
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> f64 {
        let Ok(pos) = u32::try_from(index) else {
            return 0.0;
        };
        match self.positions.binary_search(&pos) {
            Ok(i) => self.values[i],
            Err(_) => 0.0,
        }
    }

    /// Store `value` at `index`.
    ///
    /// Zero removes the entry (a no-op when nothing is stored). A non-zero
    /// value overwrites in place or is inserted at its sorted position.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `index` does not fit a stored position.
    pub fn set(&mut self, index: usize, value: f64) -> Result<()> {
        let pos = position(index)?;
        match self.positions.binary_search(&pos) {
            Ok(i) => {
                if value == 0.0 {
                    self.positions.remove(i);
                    self.values.remove(i);
                } else {
                    self.values[i] = value;
                }
            },
            Err(i) => {
                if value != 0.0 {
                    self.positions.insert(i, pos);
                    self.values.insert(i, value);
                }
            },
        }
        Ok(())
    }

    /// Add `delta` at `index` in one search and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `index` does not fit a stored position.
    pub fn add(&mut self, index: usize, delta: f64) -> Result<f64> {
        let pos = position(index)?;
        match self.positions.binary_search(&pos) {
            Ok(i) => {
                let value = self.values[i] + delta;
                if value == 0.0 {
                    self.positions.remove(i);
                    self.values.remove(i);
                } else {
                    self.values[i] = value;
                }
                Ok(value)
            },
            Err(i) => {
                if delta != 0.0 {
                    self.positions.insert(i, pos);
                    self.values.insert(i, delta);
                }
                Ok(delta)
            },
        }
    }

    /// Replace the whole row with the non-zero values of `dense`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_dense(&mut self, dense: &[f64]) {
        self.positions.clear();
        self.values.clear();
        for (i, &val) in dense.iter().enumerate() {
            if val != 0.0 {
                self.positions.push(i as u32);
                self.values.push(val);
            }
        }
    }

    /// Copy of the stored positions, in increasing order.
    #[must_use]
    pub fn non_zero_indices(&self) -> Vec<usize> {
        self.positions.iter().map(|&p| p as usize).collect()
    }

    /// Dense copy of logical length `length`.
    ///
    /// Stored positions at or beyond `length` are left out.
    #[must_use]
    pub fn to_array(&self, length: usize) -> Vec<f64> {
        let mut dense = vec![0.0; length];
        for (pos, val) in self.iter() {
            if pos < length {
                dense[pos] = val;
            }
        }
        dense
    }

    /// Iterate over `(position, value)` pairs in position order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.positions
            .iter()
            .map(|&p| p as usize)
            .zip(self.values.iter().copied())
    }

    #[must_use]
    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Sparse dot product, O(nnz_a + nnz_b).
    #[must_use]
    pub fn dot(&self, other: &SparseRow) -> f64 {
        let mut result = 0.0;
        let mut i = 0;
        let mut j = 0;

        while i < self.positions.len() && j < other.positions.len() {
            match self.positions[i].cmp(&other.positions[j]) {
                Ordering::Equal => {
                    result += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                },
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
            }
        }

        result
    }

    /// L2 norm.
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Approximate heap footprint in bytes.
    #[must_use]
    pub fn memory_bytes(&self) -> usize {
        self.positions.capacity() * std::mem::size_of::<u32>()
            + self.values.capacity() * std::mem::size_of::<f64>()
    }
}

/// A [`SparseRow`] with a fixed logical dimension.
///
/// ```
/// use semantic_store::{SparseVector, Vector};
///
/// let mut v = SparseVector::new(5);
/// v.set(3, 5.0).unwrap();
/// v.set(1, 2.0).unwrap();
/// v.set(3, 0.0).unwrap();
///
/// assert_eq!(v.non_zero_indices(), Some(vec![1]));
/// assert_eq!(v.get(3).unwrap(), 0.0);
/// assert_eq!(v.to_dense(), vec![0.0, 2.0, 0.0, 0.0, 0.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    dimension: usize,
    row: SparseRow,
}

impl SparseVector {
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self {
            dimension,
            row: SparseRow::new(),
        }
    }

    /// Create from a dense slice; zeros are not stored.
    #[must_use]
    pub fn from_dense(dense: &[f64]) -> Self {
        Self {
            dimension: dense.len(),
            row: SparseRow::from_dense(dense),
        }
    }

    /// Create from unsorted `(index, value)` pairs.
    ///
    /// Zeros are dropped and later pairs win over earlier ones for the same
    /// index.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if any index is `>= dimension`.
    pub fn from_pairs<I>(dimension: usize, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let mut v = Self::new(dimension);
        for (index, value) in pairs {
            v.set(index, value)?;
        }
        Ok(v)
    }

    /// Build from strictly increasing positions below `dimension` and their
    /// non-zero values.
    pub(crate) fn from_sorted_parts(
        dimension: usize,
        positions: Vec<u32>,
        values: Vec<f64>,
    ) -> Self {
        let row = SparseRow { positions, values };
        debug_assert!(row.is_well_formed() && row.extent() <= dimension);
        Self { dimension, row }
    }

    /// Wrap an existing row.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if the row stores a position at or beyond
    /// `dimension`.
    pub fn from_row(dimension: usize, row: SparseRow) -> Result<Self> {
        let extent = row.extent();
        if extent > dimension {
            return Err(StoreError::out_of_bounds(extent - 1, dimension));
        }
        Ok(Self { dimension, row })
    }

    #[inline]
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.row.nnz()
    }

    /// Fraction of positions that hold zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn sparsity(&self) -> f64 {
        if self.dimension == 0 {
            0.0
        } else {
            1.0 - (self.nnz() as f64 / self.dimension as f64)
        }
    }

    #[must_use]
    pub fn row(&self) -> &SparseRow {
        &self.row
    }

    #[must_use]
    pub fn into_row(self) -> SparseRow {
        self.row
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.row.iter()
    }

    /// # Errors
    ///
    /// Returns `DimensionMismatch` if the dimensions differ.
    pub fn dot(&self, other: &SparseVector) -> Result<f64> {
        crate::error::check_lengths(self.dimension, other.dimension)?;
        Ok(self.row.dot(&other.row))
    }

    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.row.magnitude()
    }
}

impl Default for SparseVector {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Vector for SparseVector {
    #[inline]
    fn length(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn get(&self, index: usize) -> Result<f64> {
        check_index(index, self.dimension)?;
        Ok(self.row.get(index))
    }

    fn set(&mut self, index: usize, value: f64) -> Result<()> {
        check_index(index, self.dimension)?;
        self.row.set(index, value)
    }

    fn add(&mut self, index: usize, delta: f64) -> Result<f64> {
        check_index(index, self.dimension)?;
        self.row.add(index, delta)
    }

    fn non_zero_indices(&self) -> Option<Vec<usize>> {
        Some(self.row.non_zero_indices())
    }

    fn to_dense(&self) -> Vec<f64> {
        self.row.to_array(self.dimension)
    }
}
