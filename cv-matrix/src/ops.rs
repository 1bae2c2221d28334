use crate::{narrow, widen, Element, Matrix, MatrixError, Result};
use core::ops::{Add, Div, Mul, Sub};

impl<T: Element> Matrix<T> {
    /// Elementwise sum. Both matrices must have the same shape.
    pub fn checked_add(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, |a, b| a + b)
    }

    /// Elementwise difference. Both matrices must have the same shape.
    pub fn checked_sub(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, |a, b| a - b)
    }

    /// Matrix product. Requires `self.cols() == rhs.rows()`.
    ///
    /// Every dot product is accumulated in `f64` regardless of `T`.
    pub fn checked_mul(&self, rhs: &Self) -> Result<Self> {
        if self.cols() != rhs.rows() {
            return Err(MatrixError::DimensionMismatch {
                lhs: self.shape(),
                rhs: rhs.shape(),
            });
        }
        let inner = self.cols();
        Ok(Self::from_fn(self.rows(), rhs.cols(), |i, j| {
            let sum: f64 = (0..inner)
                .map(|k| widen(self[(i, k)]) * widen(rhs[(k, j)]))
                .sum();
            narrow(sum)
        }))
    }

    /// Right division, `self * rhs^-1`.
    pub fn checked_div(&self, rhs: &Self) -> Result<Self> {
        self.checked_mul(&rhs.inverse()?)
    }

    fn zip_with(&self, rhs: &Self, f: impl Fn(T, T) -> T) -> Result<Self> {
        if self.shape() != rhs.shape() {
            return Err(MatrixError::DimensionMismatch {
                lhs: self.shape(),
                rhs: rhs.shape(),
            });
        }
        Ok(Self::from_fn(self.rows(), self.cols(), |i, j| {
            f(self[(i, j)], rhs[(i, j)])
        }))
    }
}

macro_rules! scalar_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl<T: Element> $trait<T> for &Matrix<T> {
            type Output = Matrix<T>;

            fn $method(self, rhs: T) -> Matrix<T> {
                self.map(|v| v $op rhs)
            }
        }

        impl<T: Element> $trait<T> for Matrix<T> {
            type Output = Matrix<T>;

            fn $method(self, rhs: T) -> Matrix<T> {
                (&self).$method(rhs)
            }
        }
    };
}

scalar_op!(Add, add, +);
scalar_op!(Sub, sub, -);
scalar_op!(Mul, mul, *);
scalar_op!(Div, div, /);

// Scalars on the left only make sense for the commutative operations.
macro_rules! scalar_lhs {
    ($($t:ty),*) => {
        $(
            impl Add<&Matrix<$t>> for $t {
                type Output = Matrix<$t>;

                fn add(self, rhs: &Matrix<$t>) -> Matrix<$t> {
                    rhs + self
                }
            }

            impl Mul<&Matrix<$t>> for $t {
                type Output = Matrix<$t>;

                fn mul(self, rhs: &Matrix<$t>) -> Matrix<$t> {
                    rhs * self
                }
            }
        )*
    };
}

scalar_lhs!(f32, f64, i32, i64);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn a() -> Matrix {
        Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap()
    }

    #[test]
    fn scalar_ops() {
        let m = a();
        assert_eq!((&m + 1.0)[1], [4.0, 5.0]);
        assert_eq!((&m - 1.0)[0], [0.0, 1.0]);
        assert_eq!((2.0 * &m)[1], [6.0, 8.0]);
        assert_eq!((m / 2.0)[0], [0.5, 1.0]);
        assert!((Matrix::<f64>::new() * 3.0).is_empty());
    }

    #[test]
    fn elementwise_requires_same_shape() {
        let m = a();
        let sum = m.checked_add(&m).unwrap();
        assert_eq!(sum[1], [6.0, 8.0]);
        assert!(m.checked_sub(&m).unwrap().iter().all(|v| v == 0.0));
        let wide = Matrix::<f64>::zeros(2, 3);
        assert!(matches!(
            m.checked_add(&wide),
            Err(MatrixError::DimensionMismatch { lhs: (2, 2), rhs: (2, 3) })
        ));
    }

    #[test]
    fn product() {
        let m = a();
        let v = Matrix::from_rows(vec![vec![1.0], vec![-1.0]]).unwrap();
        let p = m.checked_mul(&v).unwrap();
        assert_eq!(p.shape(), (2, 1));
        assert_eq!(p.as_slice(), &[-1.0, -1.0]);
        assert!(v.checked_mul(&v).is_err());
    }

    #[test]
    fn product_accumulates_in_double() {
        let big = 16_777_216.0f32;
        let lhs = Matrix::from_rows(vec![vec![big, 1.0, 1.0]]).unwrap();
        let rhs = Matrix::from_rows(vec![vec![1.0], vec![1.0], vec![1.0]]).unwrap();
        let p = lhs.checked_mul(&rhs).unwrap();
        assert_eq!(p[(0, 0)], 16_777_218.0f32);
    }

    #[test]
    fn division_by_inverse() {
        let m = a();
        let q = m.checked_div(&m).unwrap();
        assert_relative_eq!(q[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(q[(0, 1)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(q[(1, 1)], 1.0, epsilon = 1e-12);
        let singular = Matrix::from_rows(vec![vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
        assert!(matches!(
            m.checked_div(&singular),
            Err(MatrixError::Singular { .. })
        ));
    }
}
