// SPDX-License-Identifier: MIT OR Apache-2.0
//! Concurrent sparse vector and matrix storage for distributional semantics.
//!
//! Worker threads, one per document or shard, accumulate co-occurrence
//! statistics into shared structures:
//!
//! - [`SparseRow`] / [`SparseVector`]: sorted sparse storage that never
//!   stores zero.
//! - [`GrowingMatrix`]: a sparse matrix that grows as cells are written,
//!   with a row table lock, a structural lock for whole-matrix exports, and
//!   one lock per row.
//! - [`GeneratorMap`]: one lazily generated vector per key (for example one
//!   random index vector per term), generated exactly once under races.
//! - Decorators over any [`Vector`]: [`AtomicVector`] for shared mutation,
//!   [`VectorView`] for read-only windows, [`ScaledVector`] for a scaled
//!   presentation of another vector.
//!
//! Everything is in memory. The matrix and the generator map can be saved
//! to and restored from whole-structure snapshot files.

pub mod atomic;
pub mod config;
pub mod error;
pub mod generator;
pub mod generator_map;
pub mod matrix;
pub mod ops;
pub mod scaled;
pub mod snapshot;
pub mod sparse_vector;
mod sync_compat;
pub mod vector;
pub mod view;

pub use atomic::AtomicVector;
pub use config::{GaussianConfig, MatrixConfig, RandomIndexConfig};
pub use error::{Result, StoreError};
pub use generator::{GaussianGenerator, RandomIndexGenerator, VectorGenerator};
pub use generator_map::{GeneratorMap, SharedVector};
pub use matrix::GrowingMatrix;
pub use scaled::ScaledVector;
pub use snapshot::{SnapshotFormatError, SnapshotHeader, SnapshotKind};
pub use sparse_vector::{SparseRow, SparseVector};
pub use vector::{DenseVector, Vector};
pub use view::{immutable, VectorView};
