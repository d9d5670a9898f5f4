// SPDX-License-Identifier: MIT OR Apache-2.0
//! Read-only windows onto another vector.

use crate::{
    error::{check_index, Result, StoreError},
    vector::Vector,
};

/// An immutable view of a borrowed vector.
///
/// The view has its own logical length. Position `i` of the view reads
/// position `i - offset` of the backing vector; positions that fall outside
/// `[offset, offset + backing.length())` read as zero. Every mutator fails
/// with [`StoreError::Unsupported`].
///
/// ```
/// use semantic_store::{DenseVector, Vector, VectorView};
///
/// let base = DenseVector::from(vec![1.0, 2.0]);
/// let view = VectorView::with_range(&base, 3, 6);
/// assert_eq!(view.to_dense(), vec![0.0, 0.0, 0.0, 1.0, 2.0, 0.0]);
/// ```
#[derive(Debug)]
pub struct VectorView<'a, V: ?Sized> {
    backing: &'a V,
    offset: usize,
    length: usize,
}

impl<'a, V: Vector + ?Sized> VectorView<'a, V> {
    /// Read-only view of the whole vector.
    pub fn new(backing: &'a V) -> Self {
        Self {
            backing,
            offset: 0,
            length: backing.length(),
        }
    }

    /// View of logical length `length` whose position `offset` lines up with
    /// position 0 of `backing`.
    pub fn with_range(backing: &'a V, offset: usize, length: usize) -> Self {
        Self {
            backing,
            offset,
            length,
        }
    }

    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn backing(&self) -> &'a V {
        self.backing
    }

    /// Backing position for a view position, if it maps inside the backing
    /// vector.
    fn map(&self, index: usize) -> Option<usize> {
        let inner = index.checked_sub(self.offset)?;
        (inner < self.backing.length()).then_some(inner)
    }
}

impl<V: Vector + ?Sized> Vector for VectorView<'_, V> {
    fn length(&self) -> usize {
        self.length
    }

    fn get(&self, index: usize) -> Result<f64> {
        check_index(index, self.length)?;
        match self.map(index) {
            Some(inner) => self.backing.get(inner),
            None => Ok(0.0),
        }
    }

    fn set(&mut self, _index: usize, _value: f64) -> Result<()> {
        Err(StoreError::Unsupported("set on a read-only vector view"))
    }

    fn add(&mut self, _index: usize, _delta: f64) -> Result<f64> {
        Err(StoreError::Unsupported("add on a read-only vector view"))
    }

    fn non_zero_indices(&self) -> Option<Vec<usize>> {
        let inner = self.backing.non_zero_indices()?;
        Some(
            inner
                .into_iter()
                .map(|i| i + self.offset)
                .filter(|&i| i < self.length)
                .collect(),
        )
    }
}

/// Read-only view of the whole of `vector`.
pub fn immutable<V: Vector + ?Sized>(vector: &V) -> VectorView<'_, V> {
    VectorView::new(vector)
}
