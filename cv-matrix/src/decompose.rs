use crate::{narrow, widen, Element, Matrix, MatrixError, Result};
use derive_more::{AsRef, Into};
use log::*;

/// Pivots smaller than this in magnitude make [`Matrix::inverse`] fail.
pub const INVERSE_PIVOT_EPSILON: f64 = 1e-20;

/// Packed result of [`Matrix::lu`].
///
/// For an `n x n` input this wraps an `(n + 1) x n` matrix:
///
/// * Rows `0..n` hold `L` strictly below the diagonal (its unit diagonal is not
///   stored) and `U` on and above the diagonal.
/// * Row `n` holds, for elimination step `k`, the index of the row that was
///   swapped into position `k`. The last column is always `-1` since no
///   elimination happens at step `n - 1`.
///
/// Applying the recorded swaps in order to the input gives `P·A = L·U`.
#[derive(Debug, Clone, PartialEq, AsRef, Into)]
pub struct LuDecomposition(Matrix<f64>);

impl LuDecomposition {
    /// Size of the decomposed square matrix.
    pub fn n(&self) -> usize {
        self.0.cols()
    }

    /// The packed `(n + 1) x n` representation.
    pub fn packed(&self) -> &Matrix<f64> {
        &self.0
    }

    /// Pivot row used at every elimination step, `None` for the final column.
    pub fn pivots(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.0
            .row(self.n())
            .iter()
            .map(|&p| if p >= 0.0 { Some(p as usize) } else { None })
    }

    /// Number of row exchanges performed.
    pub fn swaps(&self) -> usize {
        self.pivots()
            .enumerate()
            .filter(|&(k, p)| matches!(p, Some(p) if p != k))
            .count()
    }

    /// Unit lower triangular factor.
    pub fn l(&self) -> Matrix<f64> {
        Matrix::from_fn(self.n(), self.n(), |i, j| match i.cmp(&j) {
            core::cmp::Ordering::Greater => self.0[(i, j)],
            core::cmp::Ordering::Equal => 1.0,
            core::cmp::Ordering::Less => 0.0,
        })
    }

    /// Upper triangular factor.
    pub fn u(&self) -> Matrix<f64> {
        Matrix::from_fn(self.n(), self.n(), |i, j| {
            if i <= j {
                self.0[(i, j)]
            } else {
                0.0
            }
        })
    }

    /// Applies the recorded row exchanges to `m`, computing `P·m`.
    pub fn permute<T: Element>(&self, m: &Matrix<T>) -> Matrix<T> {
        let mut out = m.clone();
        for (k, p) in self.pivots().enumerate() {
            if let Some(p) = p {
                out.swap_rows(k, p);
            }
        }
        out
    }

    /// Product of the diagonal of `U`, negated for an odd number of row exchanges.
    pub fn determinant(&self) -> f64 {
        let product: f64 = (0..self.n()).map(|i| self.0[(i, i)]).product();
        if self.swaps() % 2 == 1 {
            -product
        } else {
            product
        }
    }
}

impl<T: Element> Matrix<T> {
    /// Doolittle LU decomposition with partial pivoting.
    ///
    /// At every step the remaining row with the largest absolute value in the
    /// current column becomes the pivot. A pivot that is exactly zero after
    /// selection makes the decomposition fail.
    pub fn lu(&self) -> Result<LuDecomposition> {
        if !self.is_square() {
            return Err(MatrixError::NotSquare {
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        let n = self.rows();
        let mut lu = Matrix::<f64>::from_fn(n + 1, n, |i, j| {
            if i < n {
                widen(self[(i, j)])
            } else {
                -1.0
            }
        });

        for k in 0..n - 1 {
            let p = (k + 1..n).fold(k, |p, i| {
                if lu[(p, k)].abs() < lu[(i, k)].abs() {
                    i
                } else {
                    p
                }
            });
            lu.swap_rows(k, p);
            lu[(n, k)] = p as f64;

            let pivot = lu[(k, k)];
            if pivot == 0.0 {
                return Err(MatrixError::Singular { column: k, pivot });
            }
            for i in k + 1..n {
                lu[(i, k)] /= pivot;
                let factor = lu[(i, k)];
                for j in k + 1..n {
                    lu[(i, j)] -= factor * lu[(k, j)];
                }
            }
        }

        Ok(LuDecomposition(lu))
    }

    /// Determinant through [`Matrix::lu`].
    ///
    /// Empty, non-square and LU-singular matrices have a determinant of `0.0`.
    pub fn det(&self) -> f64 {
        if !self.is_square() {
            return 0.0;
        }
        self.lu().map(|lu| lu.determinant()).unwrap_or(0.0)
    }

    /// Determinant of the square block `start..=end` on the diagonal.
    pub fn det_range(&self, start: usize, end: usize) -> f64 {
        self.submatrix(start, end, start, end)
            .map(|m| m.det())
            .unwrap_or(0.0)
    }

    /// Inverse through Gauss-Jordan elimination with partial pivoting.
    ///
    /// The system `[A | I]` is reduced in `f64`. If the largest candidate pivot
    /// of a column is below [`INVERSE_PIVOT_EPSILON`] the matrix is singular.
    pub fn inverse(&self) -> Result<Self> {
        if !self.is_square() {
            return Err(MatrixError::NotSquare {
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        let n = self.rows();
        let mut a: Matrix<f64> = self.cast();
        let mut inv = Matrix::<f64>::identity(n);

        for j in 0..n {
            let (p, max) = (j + 1..n).fold((j, a[(j, j)].abs()), |(p, max), i| {
                let v = a[(i, j)].abs();
                if max < v {
                    (i, v)
                } else {
                    (p, max)
                }
            });
            // Also catches NaN pivots.
            if !(max >= INVERSE_PIVOT_EPSILON) {
                trace!("inverse: column {} has no usable pivot ({:e})", j, max);
                return Err(MatrixError::Singular {
                    column: j,
                    pivot: max,
                });
            }
            a.swap_rows(j, p);
            inv.swap_rows(j, p);

            let d = a[(j, j)];
            a.row_mut(j)[j..].iter_mut().for_each(|v| *v /= d);
            inv.row_mut(j).iter_mut().for_each(|v| *v /= d);

            for i in (0..n).filter(|&i| i != j) {
                let q = a[(i, j)];
                for k in j..n {
                    a[(i, k)] -= q * a[(j, k)];
                }
                for k in 0..n {
                    inv[(i, k)] -= q * inv[(j, k)];
                }
            }
        }

        Ok(Matrix::from_fn(n, n, |i, j| narrow(inv[(i, j)])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> Matrix {
        Matrix::from_rows(vec![
            vec![2.0, 1.0, 1.0],
            vec![4.0, -6.0, 0.0],
            vec![-2.0, 7.0, 2.0],
        ])
        .unwrap()
    }

    #[test]
    fn lu_packs_pivots() {
        let lu = sample().lu().unwrap();
        assert_eq!(lu.packed().shape(), (4, 3));
        let pivots: Vec<_> = lu.pivots().collect();
        // Ties keep the current row, so step 1 pivots on itself.
        assert_eq!(pivots, vec![Some(1), Some(1), None]);
        assert_eq!(lu.swaps(), 1);
    }

    #[test]
    fn lu_reproduces_permuted_input() {
        let m = sample();
        let lu = m.lu().unwrap();
        let pa = lu.permute(&m);
        let product = lu.l().checked_mul(&lu.u()).unwrap();
        for (x, y) in pa.iter().zip(product.iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-12);
        }
    }

    #[test]
    fn determinant_matches_cofactor_expansion() {
        assert_relative_eq!(sample().det(), -16.0, epsilon = 1e-12);
    }

    #[test]
    fn determinant_sign_follows_swaps() {
        assert_eq!(Matrix::<f64>::identity(3).det(), 1.0);
        for (a, b) in [(0, 1), (0, 2), (1, 2)] {
            let mut m = Matrix::<f64>::identity(3);
            m.swap_rows(a, b);
            assert_eq!(m.det(), -1.0, "swap {} {}", a, b);
        }
        let mut cycle = Matrix::<f64>::identity(3);
        cycle.swap_rows(0, 1);
        cycle.swap_rows(1, 2);
        assert_eq!(cycle.det(), 1.0);
    }

    #[test]
    fn determinant_degenerate_inputs() {
        assert_eq!(Matrix::<f64>::new().det(), 0.0);
        assert_eq!(Matrix::<f64>::zeros(2, 3).det(), 0.0);
        let zero_column = Matrix::from_rows(vec![vec![0.0, 1.0], vec![0.0, 2.0]]).unwrap();
        assert!(matches!(
            zero_column.lu(),
            Err(MatrixError::Singular { column: 0, .. })
        ));
        assert_eq!(zero_column.det(), 0.0);
    }

    #[test]
    fn det_range_uses_diagonal_block() {
        let m = sample();
        assert_relative_eq!(m.det_range(1, 2), -12.0, epsilon = 1e-12);
        assert_eq!(m.det_range(2, 3), 0.0);
    }

    #[test]
    fn single_element() {
        let m = Matrix::from_rows(vec![vec![4.0]]).unwrap();
        assert_eq!(m.det(), 4.0);
        assert_eq!(m.inverse().unwrap()[(0, 0)], 0.25);
    }

    #[test]
    fn inverse_of_sample() {
        let m = sample();
        let inv = m.inverse().unwrap();
        let eye = m.checked_mul(&inv).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(eye[(i, j)], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn inverse_rejects_zero_row() {
        let m = Matrix::from_rows(vec![
            vec![1.0, 2.0, 3.0],
            vec![0.0, 0.0, 0.0],
            vec![7.0, 8.0, 10.0],
        ])
        .unwrap();
        assert!(matches!(m.inverse(), Err(MatrixError::Singular { .. })));
    }

    #[test]
    fn inverse_rejects_non_square() {
        assert!(matches!(
            Matrix::<f64>::zeros(2, 3).inverse(),
            Err(MatrixError::NotSquare { rows: 2, cols: 3 })
        ));
        assert!(matches!(
            Matrix::<f64>::new().inverse(),
            Err(MatrixError::NotSquare { rows: 0, cols: 0 })
        ));
    }

    #[test]
    fn inverse_of_float_matrix_uses_double_internally() {
        let m = Matrix::from_rows(vec![vec![3.0f32, 1.0], vec![2.0, 1.0]]).unwrap();
        let inv = m.inverse().unwrap();
        assert_eq!(inv[0], [1.0, -1.0]);
        assert_eq!(inv[1], [-2.0, 3.0]);
    }
}
