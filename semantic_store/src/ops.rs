// SPDX-License-Identifier: MIT OR Apache-2.0
//! Whole-vector operations over any [`Vector`].
//!
//! Sparse sources are walked through their non-zero positions only; dense
//! sources are walked position by position. Every operation checks lengths
//! up front and fails with `DimensionMismatch` before touching `dest`.

use crate::{
    error::{check_lengths, Result},
    sparse_vector::SparseVector,
    vector::Vector,
};

/// Positions of `v` worth visiting: its non-zero indices when it is sparse,
/// otherwise every position.
fn visit_order<V: Vector + ?Sized>(v: &V) -> Vec<usize> {
    v.non_zero_indices()
        .unwrap_or_else(|| (0..v.length()).collect())
}

/// Overwrite every position of `dest` with the value in `src`.
///
/// # Errors
///
/// Returns `DimensionMismatch` if the lengths differ.
pub fn copy<D, S>(dest: &mut D, src: &S) -> Result<()>
where
    D: Vector + ?Sized,
    S: Vector + ?Sized,
{
    check_lengths(dest.length(), src.length())?;
    for i in 0..src.length() {
        dest.set(i, src.get(i)?)?;
    }
    Ok(())
}

/// Add `src` into `dest` in place.
///
/// # Errors
///
/// Returns `DimensionMismatch` if the lengths differ.
pub fn add_into<D, S>(dest: &mut D, src: &S) -> Result<()>
where
    D: Vector + ?Sized,
    S: Vector + ?Sized,
{
    check_lengths(dest.length(), src.length())?;
    for i in visit_order(src) {
        let value = src.get(i)?;
        if value != 0.0 {
            dest.add(i, value)?;
        }
    }
    Ok(())
}

/// Sum of two vectors as a new sparse vector, leaving both inputs untouched.
///
/// # Errors
///
/// Returns `DimensionMismatch` if the lengths differ.
pub fn add_unmodified<A, B>(a: &A, b: &B) -> Result<SparseVector>
where
    A: Vector + ?Sized,
    B: Vector + ?Sized,
{
    check_lengths(a.length(), b.length())?;
    let mut result = SparseVector::new(a.length());
    add_into(&mut result, a)?;
    add_into(&mut result, b)?;
    Ok(result)
}

/// Element-wise product, stored into `dest`.
///
/// # Errors
///
/// Returns `DimensionMismatch` if the lengths differ.
pub fn multiply_into<D, S>(dest: &mut D, src: &S) -> Result<()>
where
    D: Vector + ?Sized,
    S: Vector + ?Sized,
{
    check_lengths(dest.length(), src.length())?;
    for i in visit_order(dest) {
        let product = dest.get(i)? * src.get(i)?;
        dest.set(i, product)?;
    }
    Ok(())
}

/// Dot product of two equal-length vectors.
///
/// # Errors
///
/// Returns `DimensionMismatch` if the lengths differ.
pub fn dot<A, B>(a: &A, b: &B) -> Result<f64>
where
    A: Vector + ?Sized,
    B: Vector + ?Sized,
{
    check_lengths(a.length(), b.length())?;
    // Walk whichever side is sparse.
    let positions = match (a.non_zero_indices(), b.non_zero_indices()) {
        (Some(x), Some(y)) => {
            if x.len() <= y.len() {
                x
            } else {
                y
            }
        },
        (Some(x), None) | (None, Some(x)) => x,
        (None, None) => (0..a.length()).collect(),
    };
    let mut sum = 0.0;
    for i in positions {
        sum += a.get(i)? * b.get(i)?;
    }
    Ok(sum)
}

/// L2 norm of any vector.
pub fn magnitude<V: Vector + ?Sized>(v: &V) -> f64 {
    visit_order(v)
        .into_iter()
        .filter_map(|i| v.get(i).ok())
        .map(|x| x * x)
        .sum::<f64>()
        .sqrt()
}

/// Cosine similarity; 0 when either vector is all zero.
///
/// # Errors
///
/// Returns `DimensionMismatch` if the lengths differ.
pub fn cosine_similarity<A, B>(a: &A, b: &B) -> Result<f64>
where
    A: Vector + ?Sized,
    B: Vector + ?Sized,
{
    let dot = dot(a, b)?;
    let mag_a = magnitude(a);
    let mag_b = magnitude(b);
    if mag_a == 0.0 || mag_b == 0.0 {
        Ok(0.0)
    } else {
        Ok(dot / (mag_a * mag_b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{vector::DenseVector, StoreError};

    #[test]
    fn copy_dense_into_sparse() {
        let src = DenseVector::from(vec![1.0, 0.0, 3.0]);
        let mut dest = SparseVector::from_dense(&[9.0, 9.0, 9.0]);
        copy(&mut dest, &src).unwrap();
        assert_eq!(dest.to_dense(), vec![1.0, 0.0, 3.0]);
        assert_eq!(dest.nnz(), 2);
    }

    #[test]
    fn copy_rejects_mismatched_lengths() {
        let src = DenseVector::new(3);
        let mut dest = DenseVector::from(vec![5.0, 5.0]);
        assert_eq!(
            copy(&mut dest, &src),
            Err(StoreError::DimensionMismatch {
                expected: 2,
                got: 3
            })
        );
        assert_eq!(dest.as_slice(), &[5.0, 5.0]);
    }

    #[test]
    fn add_into_sparse_source() {
        let src = SparseVector::from_dense(&[0.0, 2.0, 0.0, -1.0]);
        let mut dest = DenseVector::from(vec![1.0, 1.0, 1.0, 1.0]);
        add_into(&mut dest, &src).unwrap();
        assert_eq!(dest.as_slice(), &[1.0, 3.0, 1.0, 0.0]);
    }

    #[test]
    fn add_into_mismatch_leaves_dest() {
        let src = SparseVector::from_dense(&[1.0]);
        let mut dest = DenseVector::new(2);
        assert!(add_into(&mut dest, &src).is_err());
        assert_eq!(dest.as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn add_unmodified_keeps_inputs() {
        let a = DenseVector::from(vec![1.0, 2.0, 0.0]);
        let b = SparseVector::from_dense(&[-1.0, 0.0, 4.0]);
        let sum = add_unmodified(&a, &b).unwrap();
        assert_eq!(sum.to_dense(), vec![0.0, 2.0, 4.0]);
        assert_eq!(sum.nnz(), 2);
        assert_eq!(a.as_slice(), &[1.0, 2.0, 0.0]);
    }

    #[test]
    fn multiply_into_elementwise() {
        let mut a = SparseVector::from_dense(&[2.0, 0.0, 3.0]);
        let b = DenseVector::from(vec![4.0, 7.0, 0.0]);
        multiply_into(&mut a, &b).unwrap();
        assert_eq!(a.to_dense(), vec![8.0, 0.0, 0.0]);
        assert_eq!(a.nnz(), 1);
    }

    #[test]
    fn dot_mixed_storage() {
        let a = SparseVector::from_dense(&[1.0, 0.0, 2.0]);
        let b = DenseVector::from(vec![3.0, 5.0, 4.0]);
        assert_eq!(dot(&a, &b).unwrap(), 11.0);
        assert_eq!(dot(&b, &b).unwrap(), 50.0);
    }

    #[test]
    fn cosine_identical_and_orthogonal() {
        let a = DenseVector::from(vec![1.0, 2.0, 0.0]);
        let b = SparseVector::from_dense(&[0.0, 0.0, 5.0]);
        assert!((cosine_similarity(&a, &a).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&a, &b).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&a, &DenseVector::new(3)).unwrap(), 0.0);
    }

    #[test]
    fn magnitude_any_storage() {
        let a = SparseVector::from_dense(&[0.0, 3.0, 4.0]);
        assert!((magnitude(&a) - 5.0).abs() < 1e-12);
        assert!((magnitude(&DenseVector::from(vec![6.0, 8.0])) - 10.0).abs() < 1e-12);
    }
}
