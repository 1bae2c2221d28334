use thiserror::Error;

/// Failures reported by matrix operations.
///
/// An empty matrix is a legitimate value and never stands in for an error.
#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("dimension mismatch: {lhs:?} is incompatible with {rhs:?}")]
    DimensionMismatch {
        lhs: (usize, usize),
        rhs: (usize, usize),
    },
    #[error("expected a non-empty square matrix, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
    #[error("matrix is singular: pivot {pivot:e} in column {column}")]
    Singular { column: usize, pivot: f64 },
    #[error("range rows {rows:?} cols {cols:?} is outside of a {shape:?} matrix")]
    OutOfBounds {
        rows: (usize, usize),
        cols: (usize, usize),
        shape: (usize, usize),
    },
    #[error("invalid matrix data: {0}")]
    InvalidFormat(String),
    #[error("matrix i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MatrixError>;
