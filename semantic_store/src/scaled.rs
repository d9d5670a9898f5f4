// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scaling decorator.

use crate::{
    error::{Result, StoreError},
    ops,
    vector::Vector,
};

/// Presents `backing * scale` without copying the backing vector.
///
/// Reads multiply by the scale, writes divide by it before delegating, so
/// `ScaledVector::new(&mut base, 2.0)?.set(0, 10.0)` leaves `5.0` in `base`.
#[derive(Debug, Clone)]
pub struct ScaledVector<V> {
    backing: V,
    scale: f64,
}

impl<V: Vector> ScaledVector<V> {
    /// # Errors
    ///
    /// Returns `ZeroScale` if `scale == 0`.
    pub fn new(backing: V, scale: f64) -> Result<Self> {
        if scale == 0.0 {
            return Err(StoreError::ZeroScale);
        }
        Ok(Self { backing, scale })
    }

    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    pub fn backing(&self) -> &V {
        &self.backing
    }

    pub fn into_backing(self) -> V {
        self.backing
    }

    pub fn magnitude(&self) -> f64 {
        ops::magnitude(&self.backing) * self.scale.abs()
    }
}

impl<V: Vector> Vector for ScaledVector<V> {
    fn length(&self) -> usize {
        self.backing.length()
    }

    fn get(&self, index: usize) -> Result<f64> {
        Ok(self.backing.get(index)? * self.scale)
    }

    fn set(&mut self, index: usize, value: f64) -> Result<()> {
        self.backing.set(index, value / self.scale)
    }

    fn add(&mut self, index: usize, delta: f64) -> Result<f64> {
        Ok(self.backing.add(index, delta / self.scale)? * self.scale)
    }

    fn non_zero_indices(&self) -> Option<Vec<usize>> {
        self.backing.non_zero_indices()
    }

    fn to_dense(&self) -> Vec<f64> {
        let mut values = self.backing.to_dense();
        for v in &mut values {
            *v *= self.scale;
        }
        values
    }
}
