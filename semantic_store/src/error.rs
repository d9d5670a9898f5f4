// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types shared by every storage component.

use thiserror::Error;

use crate::snapshot::SnapshotFormatError;

/// Errors returned by vectors, decorators, the growable matrix and the
/// generator map.
///
/// Precondition violations (`IndexOutOfBounds`, `DimensionMismatch`,
/// `ZeroScale`) are detected before any state is mutated or any lock is
/// taken, so a failed call leaves the target untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("index {index} out of bounds for length {length}")]
    IndexOutOfBounds { index: usize, length: usize },

    #[error("vector length mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("cannot scale a vector by 0")]
    ZeroScale,

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotFormatError),
}

impl StoreError {
    /// Shorthand used by every bounds check in the crate.
    #[inline]
    pub(crate) const fn out_of_bounds(index: usize, length: usize) -> Self {
        Self::IndexOutOfBounds { index, length }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Fail with `IndexOutOfBounds` unless `index < length`.
#[inline]
pub(crate) fn check_index(index: usize, length: usize) -> Result<()> {
    if index < length {
        Ok(())
    } else {
        Err(StoreError::out_of_bounds(index, length))
    }
}

/// Fail with `DimensionMismatch` unless both lengths agree.
#[inline]
pub(crate) fn check_lengths(expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(StoreError::DimensionMismatch { expected, got })
    }
}
