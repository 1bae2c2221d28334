//! # CV Matrix
//!
//! A small row-major dense matrix used for the least-squares fits in `cv-fisheye`.
//! It is deliberately simple: a contiguous `Vec` of elements plus a shape. The
//! numeric routines ([`Matrix::lu`], [`Matrix::inverse`], [`Matrix::checked_mul`])
//! always accumulate in `f64`, even for narrower element types, and convert the
//! result back at the end.
//!
//! Every operation that can fail returns a [`Result`] with a [`MatrixError`]. An
//! empty (`0x0`) matrix is a regular value: transposing it or scaling it gives
//! back another empty matrix, but it is never used to signal that something
//! went wrong.
//!
//! ```
//! use cv_matrix::Matrix;
//! let a: Matrix<f64> = Matrix::from_rows(vec![vec![4.0, 7.0], vec![2.0, 6.0]]).unwrap();
//! let a_inv = a.inverse().unwrap();
//! let eye = a.checked_mul(&a_inv).unwrap();
//! assert!((eye[0][0] - 1.0).abs() < 1e-12);
//! assert!(eye[0][1].abs() < 1e-12);
//! ```

mod decompose;
mod error;
mod io;
mod ops;

pub use decompose::*;
pub use error::*;
pub use io::*;

use core::fmt::Debug;
use core::ops::{Index, IndexMut};
use num_traits::{Num, NumCast};

/// Element types a [`Matrix`] can hold.
///
/// This is blanket implemented for every primitive integer and float type.
pub trait Element: Num + NumCast + Copy + PartialOrd + Debug {}

impl<T> Element for T where T: Num + NumCast + Copy + PartialOrd + Debug {}

/// Widens an element to `f64` for the numeric kernels.
#[inline]
pub(crate) fn widen<T: Element>(value: T) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

/// Narrows an `f64` back into the element type.
///
/// Values that do not fit (NaN into an integer type) become zero.
#[inline]
pub(crate) fn narrow<T: Element>(value: f64) -> T {
    T::from(value).unwrap_or_else(T::zero)
}

/// A dense, row-major matrix.
#[derive(Clone, PartialEq, Debug)]
pub struct Matrix<T = f64> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T> Default for Matrix<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            rows: 0,
            cols: 0,
        }
    }
}

impl<T: Element> Matrix<T> {
    /// Creates an empty `0x0` matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `rows x cols` matrix filled with zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        let mut m = Self::new();
        m.resize_zeroed(rows, cols);
        m
    }

    /// Creates the `n x n` identity matrix.
    pub fn identity(n: usize) -> Self {
        Self::from_fn(n, n, |i, j| if i == j { T::one() } else { T::zero() })
    }

    /// Creates a matrix by calling `f(row, col)` for every cell.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let cols = if rows == 0 { 0 } else { cols };
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { data, rows, cols }
    }

    /// Creates a matrix from row-major data.
    pub fn from_slice(rows: usize, cols: usize, data: &[T]) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(MatrixError::DimensionMismatch {
                lhs: (rows, cols),
                rhs: (1, data.len()),
            });
        }
        Ok(Self::from_fn(rows, cols, |i, j| data[i * cols + j]))
    }

    /// Creates a matrix from a list of rows, which must all have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let mut m = Self::new();
        for row in rows {
            m.push_row(&row)?;
        }
        Ok(m)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// A matrix is square when it is non-empty and has as many rows as columns.
    pub fn is_square(&self) -> bool {
        !self.is_empty() && self.rows == self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Iterates over the rows as slices.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }

    /// Row-major iterator over all elements.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.data.iter().copied()
    }

    /// Row-major element storage.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Changes the shape in place.
    ///
    /// Cells that exist in both shapes keep their value, new cells are zero.
    /// Resizing to zero rows leaves an empty `0x0` matrix.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        let cols = if rows == 0 { 0 } else { cols };
        if (rows, cols) == self.shape() {
            return;
        }
        let old = core::mem::take(self);
        *self = Self::from_fn(rows, cols, |i, j| old.get(i, j).unwrap_or_else(T::zero));
    }

    /// Resizes and then zeroes every cell.
    pub fn resize_zeroed(&mut self, rows: usize, cols: usize) {
        self.resize(rows, cols);
        self.fill(T::zero());
    }

    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|v| *v = value);
    }

    /// Appends a row.
    ///
    /// This fails unless the matrix is empty or `row.len()` equals the column count.
    pub fn push_row(&mut self, row: &[T]) -> Result<()> {
        if self.is_empty() {
            self.cols = row.len();
        } else if row.len() != self.cols {
            return Err(MatrixError::DimensionMismatch {
                lhs: self.shape(),
                rhs: (1, row.len()),
            });
        }
        self.data.extend_from_slice(row);
        self.rows += 1;
        Ok(())
    }

    /// Swaps two rows. Does nothing when `a == b` or either index is out of bounds.
    pub fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b || a >= self.rows || b >= self.rows {
            return;
        }
        for k in 0..self.cols {
            self.data.swap(a * self.cols + k, b * self.cols + k);
        }
    }

    pub fn transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |i, j| self[(j, i)])
    }

    /// Extracts the block spanning the inclusive ranges `row_begin..=row_end`
    /// and `col_begin..=col_end`.
    pub fn submatrix(
        &self,
        row_begin: usize,
        row_end: usize,
        col_begin: usize,
        col_end: usize,
    ) -> Result<Self> {
        if row_begin > row_end
            || row_end >= self.rows
            || col_begin > col_end
            || col_end >= self.cols
        {
            return Err(MatrixError::OutOfBounds {
                rows: (row_begin, row_end),
                cols: (col_begin, col_end),
                shape: self.shape(),
            });
        }
        Ok(Self::from_fn(
            row_end - row_begin + 1,
            col_end - col_begin + 1,
            |i, j| self[(row_begin + i, col_begin + j)],
        ))
    }

    /// Converts every element to another element type.
    pub fn cast<U: Element>(&self) -> Matrix<U> {
        Matrix::from_fn(self.rows, self.cols, |i, j| narrow(widen(self[(i, j)])))
    }

    /// Elementwise absolute value.
    pub fn abs(&self) -> Self {
        self.map(|v| if v < T::zero() { T::zero() - v } else { v })
    }

    /// Applies `f` to every element.
    pub fn map(&self, f: impl Fn(T) -> T) -> Self {
        Self {
            data: self.data.iter().map(|&v| f(v)).collect(),
            rows: self.rows,
            cols: self.cols,
        }
    }

    /// Largest element and its `(row, col)`, or `None` for an empty matrix.
    pub fn argmax(&self) -> Option<(T, (usize, usize))> {
        self.extremum(|candidate, best| candidate > best)
    }

    /// Smallest element and its `(row, col)`, or `None` for an empty matrix.
    pub fn argmin(&self) -> Option<(T, (usize, usize))> {
        self.extremum(|candidate, best| candidate < best)
    }

    pub fn max(&self) -> Option<T> {
        self.argmax().map(|(v, _)| v)
    }

    pub fn min(&self) -> Option<T> {
        self.argmin().map(|(v, _)| v)
    }

    /// Sum of all elements, accumulated in `f64`.
    pub fn sum(&self) -> f64 {
        self.data.iter().map(|&v| widen(v)).sum()
    }

    fn extremum(&self, better: impl Fn(T, T) -> bool) -> Option<(T, (usize, usize))> {
        let mut best: Option<(T, usize)> = None;
        for (ix, &v) in self.data.iter().enumerate() {
            match best {
                Some((b, _)) if !better(v, b) => {}
                _ => best = Some((v, ix)),
            }
        }
        best.map(|(v, ix)| (v, (ix / self.cols, ix % self.cols)))
    }
}

impl<T: Element> Index<usize> for Matrix<T> {
    type Output = [T];

    fn index(&self, row: usize) -> &[T] {
        self.row(row)
    }
}

impl<T: Element> IndexMut<usize> for Matrix<T> {
    fn index_mut(&mut self, row: usize) -> &mut [T] {
        self.row_mut(row)
    }
}

impl<T: Element> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        assert!(col < self.cols, "column {} out of bounds", col);
        &self.data[row * self.cols + col]
    }
}

impl<T: Element> IndexMut<(usize, usize)> for Matrix<T> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        assert!(col < self.cols, "column {} out of bounds", col);
        &mut self.data[row * self.cols + col]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting(rows: usize, cols: usize) -> Matrix {
        Matrix::from_fn(rows, cols, |i, j| (i * cols + j) as f64)
    }

    #[test]
    fn push_row_requires_matching_width() {
        let mut m = Matrix::<i32>::new();
        m.push_row(&[1, 2, 3]).unwrap();
        m.push_row(&[4, 5, 6]).unwrap();
        assert!(matches!(
            m.push_row(&[7, 8]),
            Err(MatrixError::DimensionMismatch { .. })
        ));
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m[1], [4, 5, 6]);
    }

    #[test]
    fn resize_keeps_overlap() {
        let mut m = counting(2, 2);
        m.resize(3, 3);
        assert_eq!(m.row(0), &[0.0, 1.0, 0.0]);
        assert_eq!(m.row(1), &[2.0, 3.0, 0.0]);
        assert_eq!(m.row(2), &[0.0, 0.0, 0.0]);
        m.resize(1, 2);
        assert_eq!(m.shape(), (1, 2));
        assert_eq!(m.row(0), &[0.0, 1.0]);
        m.resize(0, 4);
        assert!(m.is_empty());
        assert_eq!(m.cols(), 0);
    }

    #[test]
    fn resize_zeroed_clears_everything() {
        let mut m = counting(2, 3);
        m.resize_zeroed(3, 3);
        assert!(m.iter().all(|v| v == 0.0));
    }

    #[test]
    fn swap_rows_ignores_bad_indices() {
        let mut m = counting(3, 2);
        let before = m.clone();
        m.swap_rows(1, 1);
        m.swap_rows(0, 3);
        assert_eq!(m, before);
        m.swap_rows(0, 2);
        assert_eq!(m[0], [4.0, 5.0]);
        assert_eq!(m[2], [0.0, 1.0]);
    }

    #[test]
    fn transpose_shape() {
        let m = counting(2, 3);
        let t = m.transpose();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t[(2, 1)], m[(1, 2)]);
        assert!(Matrix::<f64>::new().transpose().is_empty());
    }

    #[test]
    fn submatrix_inclusive_bounds() {
        let m = counting(4, 4);
        let s = m.submatrix(1, 2, 2, 3).unwrap();
        assert_eq!(s.shape(), (2, 2));
        assert_eq!(s[0], [6.0, 7.0]);
        assert_eq!(s[1], [10.0, 11.0]);
        assert!(m.submatrix(2, 1, 0, 0).is_err());
        assert!(m.submatrix(0, 4, 0, 0).is_err());
    }

    #[test]
    fn extrema_and_sum() {
        let m = Matrix::from_rows(vec![vec![3.0, -7.0], vec![9.0, 0.5]]).unwrap();
        assert_eq!(m.argmax(), Some((9.0, (1, 0))));
        assert_eq!(m.argmin(), Some((-7.0, (0, 1))));
        assert_eq!(m.abs().max(), Some(9.0));
        assert_eq!(m.sum(), 5.5);
        assert_eq!(Matrix::<f64>::new().max(), None);
    }

    #[test]
    fn cast_truncates_to_integers() {
        let m = Matrix::from_rows(vec![vec![1.9f64, -2.5]]).unwrap();
        let i: Matrix<i32> = m.cast();
        assert_eq!(i[0], [1, -2]);
    }
}
