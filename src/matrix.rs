//! Owned row-major matrix used for datasets, queries and results.

use crate::error::{KnnError, Result};

/// Numeric sample type a dataset can be widened into.
pub trait Scalar: Copy + Send + Sync + PartialEq + std::fmt::Debug + 'static {
    fn from_u8(b: u8) -> Self;
    fn to_f64(self) -> f64;
}

impl Scalar for f32 {
    #[inline] fn from_u8(b: u8) -> Self { b as f32 }
    #[inline] fn to_f64(self) -> f64 { self as f64 }
}

impl Scalar for f64 {
    #[inline] fn from_u8(b: u8) -> Self { b as f64 }
    #[inline] fn to_f64(self) -> f64 { self }
}

impl Scalar for i32 {
    #[inline] fn from_u8(b: u8) -> Self { b as i32 }
    #[inline] fn to_f64(self) -> f64 { self as f64 }
}

impl Scalar for u8 {
    #[inline] fn from_u8(b: u8) -> Self { b }
    #[inline] fn to_f64(self) -> f64 { self as f64 }
}

/// Single-owner, row-major storage with a fixed column count.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix<T> {
    data: Vec<T>, // concatenated rows of length `cols`
    rows: usize,
    cols: usize,
}

/// Reserve exactly `n` elements, reporting failure instead of aborting.
pub(crate) fn alloc<T>(n: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(n).map_err(|_| KnnError::Allocation { elements: n })?;
    Ok(v)
}

impl<T: Copy> Matrix<T> {
    /// Takes ownership of `data`; a trailing partial row is dropped.
    pub fn from_vec(mut data: Vec<T>, cols: usize) -> Result<Self> {
        if cols == 0 {
            return Err(KnnError::config("column count must be positive"));
        }
        let rows = data.len() / cols;
        data.truncate(rows * cols);
        Ok(Self { data, rows, cols })
    }

    pub fn filled(rows: usize, cols: usize, value: T) -> Result<Self> {
        let n = rows
            .checked_mul(cols)
            .ok_or(KnnError::Allocation { elements: usize::MAX })?;
        let mut data = alloc(n)?;
        data.resize(n, value);
        Ok(Self { data, rows, cols })
    }

    #[inline] pub fn rows(&self) -> usize { self.rows }
    #[inline] pub fn cols(&self) -> usize { self.cols }
    #[inline] pub fn is_empty(&self) -> bool { self.rows == 0 }
    #[inline] pub fn as_slice(&self) -> &[T] { &self.data }

    #[inline]
    pub fn row(&self, i: usize) -> &[T] {
        let start = i * self.cols; &self.data[start..start + self.cols]
    }

    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [T] {
        let start = i * self.cols; &mut self.data[start..start + self.cols]
    }

    pub fn rows_iter(&self) -> impl Iterator<Item = &[T]> + '_ {
        self.data.chunks_exact(self.cols)
    }

    /// Copy the listed rows, in order, into a new matrix.
    pub fn select_rows(&self, ids: &[usize]) -> Result<Self> {
        let mut data = alloc(ids.len() * self.cols)?;
        for &id in ids {
            if id >= self.rows {
                return Err(KnnError::config(format!("row {id} out of range (rows = {})", self.rows)));
            }
            data.extend_from_slice(self.row(id));
        }
        Ok(Self { data, rows: ids.len(), cols: self.cols })
    }

    pub fn into_vec(self) -> Vec<T> { self.data }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_drops_partial_row() {
        let m = Matrix::from_vec(vec![1, 2, 3, 4, 5, 6, 7], 3).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.row(1), &[4, 5, 6]);
        assert_eq!(m.as_slice().len(), 6);
    }

    #[test]
    fn zero_columns_rejected() {
        assert!(matches!(Matrix::<f32>::from_vec(vec![], 0), Err(KnnError::InvalidConfig(_))));
    }

    #[test]
    fn select_rows_in_order() {
        let m = Matrix::from_vec((0..12).collect::<Vec<i32>>(), 4).unwrap();
        let s = m.select_rows(&[2, 0]).unwrap();
        assert_eq!(s.rows(), 2);
        assert_eq!(s.row(0), &[8, 9, 10, 11]);
        assert_eq!(s.row(1), &[0, 1, 2, 3]);
        assert!(m.select_rows(&[3]).is_err());
    }

    #[test]
    fn filled_and_rows_iter() {
        let mut m = Matrix::filled(3, 2, -1i32).unwrap();
        m.row_mut(1)[0] = 7;
        let rows: Vec<&[i32]> = m.rows_iter().collect();
        assert_eq!(rows, vec![&[-1, -1][..], &[7, -1][..], &[-1, -1][..]]);
    }

    #[test]
    fn oversized_request_is_allocation_error() {
        match Matrix::<f32>::filled(usize::MAX / 8, 2, 0.0) {
            Err(KnnError::Allocation { elements }) => assert_eq!(elements, (usize::MAX / 8) * 2),
            other => panic!("expected Allocation, got {other:?}"),
        }
    }

    #[test]
    fn shape_overflow_is_allocation_error() {
        assert!(matches!(
            Matrix::<u8>::filled(usize::MAX, 2, 0),
            Err(KnnError::Allocation { elements: usize::MAX })
        ));
    }
}
