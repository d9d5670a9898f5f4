// SPDX-License-Identifier: MIT OR Apache-2.0
//! The vector capability trait and dense storage.
//!
//! Every storage type and every decorator implements [`Vector`]. Decorators
//! hold their inner vector by value, so wrapping a `&mut V` (or a `&V` for
//! read-only views) gives a view that borrows the data instead of owning it.

use serde::{Deserialize, Serialize};

use crate::error::{check_index, Result};

/// A fixed-length sequence of `f64` values addressed by a zero-based index.
///
/// Every index-taking method fails with
/// [`StoreError::IndexOutOfBounds`](crate::StoreError::IndexOutOfBounds) when
/// `index >= length()`, without modifying the vector.
pub trait Vector {
    /// Logical length of the vector.
    fn length(&self) -> usize;

    fn get(&self, index: usize) -> Result<f64>;

    fn set(&mut self, index: usize, value: f64) -> Result<()>;

    /// Add `delta` to the value at `index` and return the new value.
    fn add(&mut self, index: usize, delta: f64) -> Result<f64> {
        let value = self.get(index)? + delta;
        self.set(index, value)?;
        Ok(value)
    }

    /// Positions that may hold non-zero values, in increasing order.
    ///
    /// `None` means the vector is dense and every position has to be
    /// inspected.
    fn non_zero_indices(&self) -> Option<Vec<usize>> {
        None
    }

    /// Materialize the vector as a dense array of `length()` values.
    fn to_dense(&self) -> Vec<f64> {
        // Every index below length() is readable.
        (0..self.length())
            .map(|i| self.get(i).unwrap_or(0.0))
            .collect()
    }
}

impl<V: Vector + ?Sized> Vector for &mut V {
    fn length(&self) -> usize {
        (**self).length()
    }

    fn get(&self, index: usize) -> Result<f64> {
        (**self).get(index)
    }

    fn set(&mut self, index: usize, value: f64) -> Result<()> {
        (**self).set(index, value)
    }

    fn add(&mut self, index: usize, delta: f64) -> Result<f64> {
        (**self).add(index, delta)
    }

    fn non_zero_indices(&self) -> Option<Vec<usize>> {
        (**self).non_zero_indices()
    }

    fn to_dense(&self) -> Vec<f64> {
        (**self).to_dense()
    }
}

impl<V: Vector + ?Sized> Vector for Box<V> {
    fn length(&self) -> usize {
        (**self).length()
    }

    fn get(&self, index: usize) -> Result<f64> {
        (**self).get(index)
    }

    fn set(&mut self, index: usize, value: f64) -> Result<()> {
        (**self).set(index, value)
    }

    fn add(&mut self, index: usize, delta: f64) -> Result<f64> {
        (**self).add(index, delta)
    }

    fn non_zero_indices(&self) -> Option<Vec<usize>> {
        (**self).non_zero_indices()
    }

    fn to_dense(&self) -> Vec<f64> {
        (**self).to_dense()
    }
}

/// A vector whose every position is materialized in a contiguous buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseVector {
    values: Vec<f64>,
}

impl DenseVector {
    /// Create an all-zero vector of the given length.
    #[must_use]
    pub fn new(length: usize) -> Self {
        Self {
            values: vec![0.0; length],
        }
    }

    #[must_use]
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }

    /// L2 norm.
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

impl From<Vec<f64>> for DenseVector {
    fn from(values: Vec<f64>) -> Self {
        Self::from_vec(values)
    }
}

impl Vector for DenseVector {
    #[inline]
    fn length(&self) -> usize {
        self.values.len()
    }

    #[inline]
    fn get(&self, index: usize) -> Result<f64> {
        check_index(index, self.values.len())?;
        Ok(self.values[index])
    }

    #[inline]
    fn set(&mut self, index: usize, value: f64) -> Result<()> {
        check_index(index, self.values.len())?;
        self.values[index] = value;
        Ok(())
    }

    fn add(&mut self, index: usize, delta: f64) -> Result<f64> {
        check_index(index, self.values.len())?;
        self.values[index] += delta;
        Ok(self.values[index])
    }

    fn to_dense(&self) -> Vec<f64> {
        self.values.clone()
    }
}
