// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reader-writer locked vector decorator.
//!
//! [`AtomicVector`] puts one reader-writer lock in front of any [`Vector`].
//! Reads share the lock, writes take it exclusively, and every compound
//! read-modify-write (`add`, `get_and_add`, closures passed to
//! [`AtomicVector::with_write`]) runs inside a single critical section.

use serde::{Serialize, Serializer};

use crate::{
    error::{check_lengths, Result},
    sync_compat::RwLock,
    vector::Vector,
};

/// A [`Vector`] that is safe to share between threads.
///
/// All methods take `&self`; wrap it in an `Arc` to hand it to workers.
///
/// ```
/// use std::sync::Arc;
/// use semantic_store::{AtomicVector, DenseVector};
///
/// let counts = Arc::new(AtomicVector::new(DenseVector::new(4)));
/// let worker = Arc::clone(&counts);
/// std::thread::spawn(move || worker.add(2, 1.0).unwrap()).join().unwrap();
/// assert_eq!(counts.get(2).unwrap(), 1.0);
/// ```
pub struct AtomicVector<V> {
    inner: RwLock<V>,
}

impl<V: Vector> AtomicVector<V> {
    pub fn new(vector: V) -> Self {
        Self {
            inner: RwLock::new(vector),
        }
    }

    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `index >= length()`.
    pub fn get(&self, index: usize) -> Result<f64> {
        self.inner.read().get(index)
    }

    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `index >= length()`.
    pub fn set(&self, index: usize, value: f64) -> Result<()> {
        self.inner.write().set(index, value)
    }

    /// Add `delta` and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `index >= length()`.
    pub fn add(&self, index: usize, delta: f64) -> Result<f64> {
        self.inner.write().add(index, delta)
    }

    /// Same as [`add`](Self::add).
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `index >= length()`.
    pub fn add_and_get(&self, index: usize, delta: f64) -> Result<f64> {
        self.add(index, delta)
    }

    /// Add `delta` and return the value held before the addition.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `index >= length()`.
    pub fn get_and_add(&self, index: usize, delta: f64) -> Result<f64> {
        let mut guard = self.inner.write();
        let previous = guard.get(index)?;
        guard.set(index, previous + delta)?;
        Ok(previous)
    }

    /// Overwrite every position from `values` under one write lock.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `values.len() != length()`.
    pub fn set_all(&self, values: &[f64]) -> Result<()> {
        let mut guard = self.inner.write();
        check_lengths(guard.length(), values.len())?;
        for (i, &value) in values.iter().enumerate() {
            guard.set(i, value)?;
        }
        Ok(())
    }

    pub fn length(&self) -> usize {
        self.inner.read().length()
    }

    pub fn non_zero_indices(&self) -> Option<Vec<usize>> {
        self.inner.read().non_zero_indices()
    }

    /// Consistent dense copy taken under one read lock.
    pub fn to_dense(&self) -> Vec<f64> {
        self.inner.read().to_dense()
    }

    /// Run `f` with shared access to the wrapped vector.
    pub fn with_read<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run `f` with exclusive access to the wrapped vector.
    ///
    /// Use this for compound updates that must not interleave with other
    /// writers.
    pub fn with_write<R>(&self, f: impl FnOnce(&mut V) -> R) -> R {
        f(&mut self.inner.write())
    }

    pub fn into_inner(self) -> V {
        self.inner.into_inner()
    }
}

impl<V: Vector> From<V> for AtomicVector<V> {
    fn from(vector: V) -> Self {
        Self::new(vector)
    }
}

/// Serializes the wrapped vector as it stands under one read lock, in the
/// same encoding as `V` itself.
impl<V: Serialize> Serialize for AtomicVector<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.inner.read().serialize(serializer)
    }
}

impl<V: Vector + std::fmt::Debug> std::fmt::Debug for AtomicVector<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicVector")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<V: Vector> Vector for AtomicVector<V> {
    fn length(&self) -> usize {
        AtomicVector::length(self)
    }

    fn get(&self, index: usize) -> Result<f64> {
        AtomicVector::get(self, index)
    }

    fn set(&mut self, index: usize, value: f64) -> Result<()> {
        AtomicVector::set(self, index, value)
    }

    fn add(&mut self, index: usize, delta: f64) -> Result<f64> {
        AtomicVector::add(self, index, delta)
    }

    fn non_zero_indices(&self) -> Option<Vec<usize>> {
        AtomicVector::non_zero_indices(self)
    }

    fn to_dense(&self) -> Vec<f64> {
        AtomicVector::to_dense(self)
    }
}

/// A shared reference is enough to write through the lock, so `&AtomicVector`
/// can itself be handed to other decorators.
impl<V: Vector> Vector for &AtomicVector<V> {
    fn length(&self) -> usize {
        AtomicVector::length(*self)
    }

    fn get(&self, index: usize) -> Result<f64> {
        AtomicVector::get(*self, index)
    }

    fn set(&mut self, index: usize, value: f64) -> Result<()> {
        AtomicVector::set(*self, index, value)
    }

    fn add(&mut self, index: usize, delta: f64) -> Result<f64> {
        AtomicVector::add(*self, index, delta)
    }

    fn non_zero_indices(&self) -> Option<Vec<usize>> {
        AtomicVector::non_zero_indices(*self)
    }

    fn to_dense(&self) -> Vec<f64> {
        AtomicVector::to_dense(*self)
    }
}
