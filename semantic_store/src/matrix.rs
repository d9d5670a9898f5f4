// SPDX-License-Identifier: MIT OR Apache-2.0
//! Concurrent growable sparse matrix.
//!
//! # Locking
//!
//! Three kinds of lock, always taken in this order:
//!
//! 1. `structure`: read side held by every row mutation, write side held
//!    by whole-matrix exports ([`GrowingMatrix::to_dense_array`],
//!    [`GrowingMatrix::save_snapshot`]). An export therefore never observes
//!    a half-applied write and blocks row creation while it runs.
//! 2. `table`: guards the row map and the `rows`/`columns` bounds. Lookups
//!    take the read side and release it before touching a row. Growth takes
//!    the write side, re-checks, then inserts the row and bumps both bounds
//!    inside the same critical section, so a bound is never visible before
//!    the row it covers.
//! 3. One reader-writer lock per row. Writers to the same row exclude each
//!    other; readers of a row share it.
//!
//! No method holds a row lock while waiting for `table` or `structure`.

use std::{collections::HashMap, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    config::MatrixConfig,
    error::{Result, StoreError},
    snapshot::{self, SnapshotFormatError, SnapshotKind},
    sparse_vector::{SparseRow, SparseVector},
    sync_compat::RwLock,
    vector::Vector,
};

type SharedRow = Arc<RwLock<SparseRow>>;

#[derive(Default)]
struct RowTable {
    rows: HashMap<usize, SharedRow>,
    rows_bound: usize,
    cols_bound: usize,
}

impl RowTable {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: HashMap::with_capacity(capacity),
            rows_bound: 0,
            cols_bound: 0,
        }
    }

    /// Row handles in ascending row order.
    fn sorted_rows(&self) -> Vec<(usize, SharedRow)> {
        let mut rows: Vec<_> = self
            .rows
            .iter()
            .map(|(&idx, row)| (idx, Arc::clone(row)))
            .collect();
        rows.sort_unstable_by_key(|(idx, _)| *idx);
        rows
    }
}

/// On-disk form of a matrix.
#[derive(Serialize, Deserialize)]
struct MatrixSnapshot {
    rows_bound: usize,
    cols_bound: usize,
    rows: Vec<(usize, SparseRow)>,
}

/// A sparse matrix whose dimensions grow as cells are written.
///
/// Every method takes `&self`; share the matrix between worker threads with
/// an `Arc`. Cells that were never written read as `0.0` whatever the
/// current bounds, and [`rows`](Self::rows) / [`columns`](Self::columns)
/// never decrease.
///
/// ```
/// use semantic_store::GrowingMatrix;
///
/// let m = GrowingMatrix::new();
/// m.set(4, 2, 9.0).unwrap();
/// assert_eq!((m.rows(), m.columns()), (5, 3));
/// assert_eq!(m.get(4, 2).unwrap(), 9.0);
/// assert_eq!(m.get(0, 0).unwrap(), 0.0);
/// ```
pub struct GrowingMatrix {
    config: MatrixConfig,
    structure: RwLock<()>,
    table: RwLock<RowTable>,
}

impl GrowingMatrix {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MatrixConfig::default())
    }

    #[must_use]
    pub fn with_config(config: MatrixConfig) -> Self {
        Self {
            config,
            structure: RwLock::new(()),
            table: RwLock::new(RowTable::with_capacity(config.initial_row_capacity)),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &MatrixConfig {
        &self.config
    }

    fn check_row(&self, row: usize) -> Result<()> {
        let limit = self.config.row_limit();
        if row >= limit {
            return Err(StoreError::out_of_bounds(row, limit));
        }
        Ok(())
    }

    fn check_cell(&self, row: usize, col: usize) -> Result<()> {
        self.check_row(row)?;
        let limit = self.config.column_limit();
        if col >= limit {
            return Err(StoreError::out_of_bounds(col, limit));
        }
        Ok(())
    }

    fn lookup(&self, row: usize) -> Option<SharedRow> {
        self.table.read().rows.get(&row).map(Arc::clone)
    }

    /// Find `row`, creating it if needed, and make sure the bounds cover
    /// `row` and `width` columns.
    fn locate(&self, row: usize, width: usize) -> SharedRow {
        {
            let table = self.table.read();
            if let Some(existing) = table.rows.get(&row) {
                if width <= table.cols_bound {
                    return Arc::clone(existing);
                }
            }
        }

        let mut table = self.table.write();
        // Another writer may have created the row or grown the bounds while
        // we waited.
        let shared = match table.rows.get(&row) {
            Some(existing) => Arc::clone(existing),
            None => {
                let created = Arc::new(RwLock::new(SparseRow::new()));
                table.rows.insert(row, Arc::clone(&created));
                table.rows_bound = table.rows_bound.max(row + 1);
                tracing::trace!(row, rows = table.rows_bound, "published matrix row");
                created
            },
        };
        table.cols_bound = table.cols_bound.max(width);
        shared
    }

    /// Value at `(row, col)`, or `0.0` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `row` or `col` is beyond the configured
    /// limits.
    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        self.check_cell(row, col)?;
        Ok(self.lookup(row).map_or(0.0, |r| r.read().get(col)))
    }

    /// Store `value` at `(row, col)`, growing the bounds to cover it.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `row` or `col` is beyond the configured
    /// limits. Nothing is locked or changed in that case.
    pub fn set(&self, row: usize, col: usize, value: f64) -> Result<()> {
        self.check_cell(row, col)?;
        let _structure = self.structure.read();
        let shared = self.locate(row, col + 1);
        let mut guard = shared.write();
        guard.set(col, value)
    }

    /// Add `delta` to `(row, col)` and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `row` or `col` is beyond the configured
    /// limits.
    pub fn add_and_get(&self, row: usize, col: usize, delta: f64) -> Result<f64> {
        self.check_cell(row, col)?;
        let _structure = self.structure.read();
        let shared = self.locate(row, col + 1);
        let mut guard = shared.write();
        guard.add(col, delta)
    }

    /// Add `delta` to `(row, col)` and return the value held before.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `row` or `col` is beyond the configured
    /// limits.
    pub fn get_and_add(&self, row: usize, col: usize, delta: f64) -> Result<f64> {
        self.check_cell(row, col)?;
        let _structure = self.structure.read();
        let shared = self.locate(row, col + 1);
        let mut guard = shared.write();
        let previous = guard.get(col);
        guard.add(col, delta)?;
        Ok(previous)
    }

    /// Replace row `row` with the non-zero values of `values`.
    ///
    /// The column bound grows to `values.len()` if needed; positions past
    /// the end of `values` are cleared.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `row` or `values.len()` exceeds the
    /// configured limits.
    pub fn set_row(&self, row: usize, values: &[f64]) -> Result<()> {
        self.check_row(row)?;
        let limit = self.config.column_limit();
        if values.len() > limit {
            return Err(StoreError::out_of_bounds(values.len() - 1, limit));
        }
        let _structure = self.structure.read();
        let shared = self.locate(row, values.len());
        shared.write().set_dense(values);
        Ok(())
    }

    /// Dense copy of row `row`, `columns()` long.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `row` is beyond the configured limit.
    pub fn get_row(&self, row: usize) -> Result<Vec<f64>> {
        Ok(self.get_row_vector(row)?.to_dense())
    }

    /// Sparse copy of row `row` with dimension `columns()`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `row` is beyond the configured limit.
    pub fn get_row_vector(&self, row: usize) -> Result<SparseVector> {
        self.check_row(row)?;
        let copy = self
            .lookup(row)
            .map(|r| r.read().clone())
            .unwrap_or_default();
        // Bounds grow before a cell is written, so reading them after the
        // copy covers every stored position.
        SparseVector::from_row(self.columns(), copy)
    }

    /// Dense copy of column `col`, `rows()` long.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `col` is beyond the configured limit.
    pub fn get_column(&self, col: usize) -> Result<Vec<f64>> {
        Ok(self.get_column_vector(col)?.to_dense())
    }

    /// Sparse copy of column `col` with dimension `rows()`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `col` is beyond the configured limit.
    pub fn get_column_vector(&self, col: usize) -> Result<SparseVector> {
        let limit = self.config.column_limit();
        if col >= limit {
            return Err(StoreError::out_of_bounds(col, limit));
        }
        let (rows_bound, rows) = {
            let table = self.table.read();
            (table.rows_bound, table.sorted_rows())
        };
        let pairs = rows
            .into_iter()
            .map(|(idx, row)| (idx, row.read().get(col)))
            .filter(|&(_, value)| value != 0.0);
        SparseVector::from_pairs(rows_bound, pairs)
    }

    /// Number of rows; one more than the highest row ever written.
    pub fn rows(&self) -> usize {
        self.table.read().rows_bound
    }

    /// Number of columns; one more than the highest column ever written.
    pub fn columns(&self) -> usize {
        self.table.read().cols_bound
    }

    /// Total stored non-zero cells. Not a consistent snapshot while writers
    /// are running.
    pub fn non_zero_count(&self) -> usize {
        let rows: Vec<SharedRow> = self.table.read().rows.values().map(Arc::clone).collect();
        rows.iter().map(|row| row.read().nnz()).sum()
    }

    /// Consistent dense copy of the whole matrix, `rows()` by `columns()`.
    ///
    /// Blocks every writer for the duration of the copy.
    pub fn to_dense_array(&self) -> Vec<Vec<f64>> {
        let _structure = self.structure.write();
        let table = self.table.write();
        let mut dense = vec![vec![0.0; table.cols_bound]; table.rows_bound];
        for (&idx, row) in &table.rows {
            dense[idx] = row.read().to_array(table.cols_bound);
        }
        dense
    }

    /// Write the whole matrix to `path` as one snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Snapshot` if the file cannot be written.
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let body = {
            let _structure = self.structure.write();
            let table = self.table.read();
            MatrixSnapshot {
                rows_bound: table.rows_bound,
                cols_bound: table.cols_bound,
                rows: table
                    .sorted_rows()
                    .into_iter()
                    .map(|(idx, row)| (idx, row.read().clone()))
                    .collect(),
            }
        };
        snapshot::write(path, SnapshotKind::Matrix, body.rows.len() as u64, &body)?;
        Ok(())
    }

    /// Restore a matrix saved by [`save_snapshot`](Self::save_snapshot)
    /// using the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `Snapshot` if the file is missing or malformed.
    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_snapshot_with_config(path, MatrixConfig::default())
    }

    /// # Errors
    ///
    /// Returns `Snapshot` if the file is missing or malformed, and
    /// `IndexOutOfBounds` if the stored matrix does not fit `config`.
    pub fn load_snapshot_with_config<P: AsRef<Path>>(
        path: P,
        config: MatrixConfig,
    ) -> Result<Self> {
        let (header, body): (_, MatrixSnapshot) = snapshot::read(path, SnapshotKind::Matrix)?;
        header.check_entry_count(body.rows.len())?;

        if body.rows_bound > config.row_limit() {
            return Err(StoreError::out_of_bounds(body.rows_bound - 1, config.row_limit()));
        }
        if body.cols_bound > config.column_limit() {
            return Err(StoreError::out_of_bounds(
                body.cols_bound - 1,
                config.column_limit(),
            ));
        }

        let mut table = RowTable::with_capacity(body.rows.len().max(config.initial_row_capacity));
        table.rows_bound = body.rows_bound;
        table.cols_bound = body.cols_bound;
        for (idx, row) in body.rows {
            if !row.is_well_formed() {
                return Err(SnapshotFormatError::SerializationError(format!(
                    "row {idx} violates sparse storage invariants"
                ))
                .into());
            }
            if idx >= body.rows_bound {
                return Err(StoreError::out_of_bounds(idx, body.rows_bound));
            }
            if row.extent() > body.cols_bound {
                return Err(StoreError::out_of_bounds(row.extent() - 1, body.cols_bound));
            }
            table.rows.insert(idx, Arc::new(RwLock::new(row)));
        }

        Ok(Self {
            config,
            structure: RwLock::new(()),
            table: RwLock::new(table),
        })
    }
}

impl Default for GrowingMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GrowingMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.read();
        f.debug_struct("GrowingMatrix")
            .field("rows", &table.rows_bound)
            .field("columns", &table.cols_bound)
            .field("stored_rows", &table.rows.len())
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn fresh_matrix_grows_on_write() {
        let m = GrowingMatrix::new();
        assert_eq!((m.rows(), m.columns()), (0, 0));
        m.set(4, 2, 9.0).unwrap();
        assert_eq!(m.rows(), 5);
        assert_eq!(m.columns(), 3);
        assert_eq!(m.get(4, 2).unwrap(), 9.0);
        assert_eq!(m.get(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn unwritten_cells_read_zero_beyond_bounds() {
        let m = GrowingMatrix::new();
        m.set(1, 1, 1.0).unwrap();
        assert_eq!(m.get(50, 70).unwrap(), 0.0);
        assert_eq!((m.rows(), m.columns()), (2, 2));
    }

    #[test]
    fn growth_keeps_earlier_cells() {
        let m = GrowingMatrix::new();
        m.set(0, 0, 1.0).unwrap();
        m.set(2, 1, 2.0).unwrap();
        m.set(10, 20, 3.0).unwrap();
        m.set(0, 30, 4.0).unwrap();
        assert_eq!(m.get(0, 0).unwrap(), 1.0);
        assert_eq!(m.get(2, 1).unwrap(), 2.0);
        assert_eq!(m.get(10, 20).unwrap(), 3.0);
        assert_eq!((m.rows(), m.columns()), (11, 31));
    }

    #[test]
    fn bounds_never_shrink() {
        let m = GrowingMatrix::new();
        m.set(3, 3, 1.0).unwrap();
        m.set(3, 3, 0.0).unwrap();
        m.set(0, 0, 5.0).unwrap();
        assert_eq!((m.rows(), m.columns()), (4, 4));
        assert_eq!(m.non_zero_count(), 1);
    }

    #[test]
    fn limits_reject_before_locking() {
        let m = GrowingMatrix::with_config(MatrixConfig::with_limits(4, 8));
        assert_eq!(
            m.set(4, 0, 1.0),
            Err(StoreError::IndexOutOfBounds {
                index: 4,
                length: 4
            })
        );
        assert!(m.set(0, 8, 1.0).is_err());
        assert!(m.get(9, 0).is_err());
        assert!(m.set_row(0, &[1.0; 9]).is_err());
        assert!(m.get_column_vector(8).is_err());
        assert_eq!((m.rows(), m.columns()), (0, 0));
    }

    #[test]
    fn add_and_get_and_get_and_add() {
        let m = GrowingMatrix::new();
        assert_eq!(m.add_and_get(1, 1, 2.0).unwrap(), 2.0);
        assert_eq!(m.get_and_add(1, 1, 3.0).unwrap(), 2.0);
        assert_eq!(m.get(1, 1).unwrap(), 5.0);
        assert_eq!(m.add_and_get(1, 1, -5.0).unwrap(), 0.0);
        assert_eq!(m.non_zero_count(), 0);
    }

    #[test]
    fn set_row_replaces_and_grows() {
        let m = GrowingMatrix::new();
        m.set(0, 5, 7.0).unwrap();
        m.set_row(0, &[1.0, 0.0, 2.0]).unwrap();
        assert_eq!(m.get(0, 5).unwrap(), 0.0);
        assert_eq!(m.columns(), 6);
        assert_eq!(m.get_row(0).unwrap(), vec![1.0, 0.0, 2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn rows_and_columns_are_copies() {
        let m = GrowingMatrix::new();
        m.set(0, 1, 1.0).unwrap();
        m.set(2, 1, 3.0).unwrap();
        m.set(2, 0, 4.0).unwrap();

        let mut row = m.get_row_vector(2).unwrap();
        assert_eq!(row.dimension(), 2);
        assert_eq!(row.to_dense(), vec![4.0, 3.0]);
        row.set(0, 100.0).unwrap();
        assert_eq!(m.get(2, 0).unwrap(), 4.0);

        let col = m.get_column_vector(1).unwrap();
        assert_eq!(col.dimension(), 3);
        assert_eq!(col.to_dense(), vec![1.0, 0.0, 3.0]);
        assert_eq!(m.get_column(0).unwrap(), vec![0.0, 0.0, 4.0]);
        assert_eq!(m.get_row(1).unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn to_dense_array_shape() {
        let m = GrowingMatrix::new();
        assert!(m.to_dense_array().is_empty());
        m.set(1, 2, 5.0).unwrap();
        m.set(0, 0, 1.0).unwrap();
        assert_eq!(
            m.to_dense_array(),
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 5.0]]
        );
    }

    // Every thread inserts distinct columns into the same row. Each insert
    // shifts the row's arrays, so without a per-row lock entries are lost or
    // the sorted order breaks.
    #[test]
    fn concurrent_inserts_into_one_row_are_all_kept() {
        let m = Arc::new(GrowingMatrix::new());
        let threads = 8;
        let per_thread = 500;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let m = Arc::clone(&m);
                thread::spawn(move || {
                    for i in 0..per_thread {
                        let col = i * threads + t;
                        m.set(0, col, (col + 1) as f64).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let row = m.get_row_vector(0).unwrap();
        assert_eq!(row.nnz(), threads * per_thread);
        let positions = row.row().non_zero_indices();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        for (col, value) in row.iter() {
            assert_eq!(value, (col + 1) as f64);
        }
    }

    #[test]
    fn concurrent_adds_to_one_cell_are_not_lost() {
        let m = Arc::new(GrowingMatrix::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&m);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        m.add_and_get(3, 3, 1.0).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(m.get(3, 3).unwrap(), 8_000.0);
    }

    #[test]
    fn concurrent_row_creation_publishes_bounds_with_rows() {
        let m = Arc::new(GrowingMatrix::new());
        let writers: Vec<_> = (0..4)
            .map(|t| {
                let m = Arc::clone(&m);
                thread::spawn(move || {
                    for r in 0..250 {
                        let row = r * 4 + t;
                        m.set(row, row % 17, 1.0).unwrap();
                    }
                })
            })
            .collect();
        let reader = {
            let m = Arc::clone(&m);
            thread::spawn(move || {
                for _ in 0..200 {
                    let dense = m.to_dense_array();
                    for row in &dense {
                        assert_eq!(row.len(), dense[0].len());
                    }
                }
            })
        };
        for h in writers {
            h.join().unwrap();
        }
        reader.join().unwrap();
        assert_eq!(m.rows(), 1_000);
        assert_eq!(m.columns(), 17);
        assert_eq!(m.non_zero_count(), 1_000);
    }
}
