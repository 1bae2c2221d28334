use crate::{widen, Element, Matrix, MatrixError, Result};
use core::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Tag at the start of every binary matrix dump.
pub const BINARY_MAGIC: [u8; 12] = *b"MATRIX_DATA\0";

/// Digits printed after the decimal point by the [`fmt::Display`] impl.
const DISPLAY_PRECISION: usize = 4;

/// Most elements reserved up front when reading a binary dump.
const MAX_PREALLOCATED: usize = 1 << 16;

impl<T: Element> fmt::Display for Matrix<T> {
    /// Prints right aligned fixed point columns wide enough for the largest magnitude.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut max = self
            .iter()
            .map(widen)
            .filter(|v| v.is_finite())
            .map(f64::abs)
            .fold(0.0, f64::max);
        let mut digits = 0;
        while max >= 1.0 {
            max /= 10.0;
            digits += 1;
        }
        // sign, leading digit and decimal point
        let width = digits.max(1) + DISPLAY_PRECISION + 3;
        for row in self.iter_rows() {
            for &v in row {
                write!(f, "{:>width$.prec$}", widen(v), width = width, prec = DISPLAY_PRECISION)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Matrix<f64> {
    /// Parses a matrix from text, one row per line.
    ///
    /// Values may be separated by whitespace, `,` or `;`. Blank lines are skipped.
    /// Unparsable values and rows of differing length are rejected.
    ///
    /// ```
    /// use cv_matrix::Matrix;
    /// let m = Matrix::read_text("1, 2, 3\n\n4 5 6;\n".as_bytes()).unwrap();
    /// assert_eq!(m.shape(), (2, 3));
    /// assert_eq!(m[1], [4.0, 5.0, 6.0]);
    /// ```
    pub fn read_text<R: BufRead>(reader: R) -> Result<Self> {
        let mut m = Self::new();
        for (line_number, line) in reader.lines().enumerate() {
            let line = line?;
            let row = line
                .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
                .filter(|token| !token.is_empty())
                .map(|token| {
                    token.parse::<f64>().map_err(|_| {
                        MatrixError::InvalidFormat(format!(
                            "line {}: `{}` is not a number",
                            line_number + 1,
                            token
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            if !row.is_empty() {
                m.push_row(&row)?;
            }
        }
        Ok(m)
    }

    /// Reads a text matrix from a file, see [`Matrix::read_text`].
    pub fn load_text(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_text(BufReader::new(File::open(path)?))
    }

    /// Reads a matrix written by [`Matrix::write_binary`].
    pub fn read_binary<R: Read>(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 12];
        reader.read_exact(&mut magic)?;
        if magic != BINARY_MAGIC {
            return Err(MatrixError::InvalidFormat(
                "missing MATRIX_DATA header".to_owned(),
            ));
        }
        let mut word = [0u8; 4];
        reader.read_exact(&mut word)?;
        let rows = i32::from_le_bytes(word);
        reader.read_exact(&mut word)?;
        let cols = i32::from_le_bytes(word);
        if rows <= 0 || cols <= 0 {
            return Err(MatrixError::InvalidFormat(format!(
                "bad dimensions {}x{}",
                rows, cols
            )));
        }
        let (rows, cols) = (rows as usize, cols as usize);
        let len = rows.checked_mul(cols).ok_or_else(|| {
            MatrixError::InvalidFormat(format!("dimensions {}x{} overflow", rows, cols))
        })?;
        // The header is not trusted for the allocation, a short file fails in `read_exact`.
        let mut data = Vec::with_capacity(len.min(MAX_PREALLOCATED));
        let mut value = [0u8; 8];
        for _ in 0..len {
            reader.read_exact(&mut value)?;
            data.push(f64::from_le_bytes(value));
        }
        Self::from_slice(rows, cols, &data)
    }

    /// Loads a binary matrix dump from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_binary(BufReader::new(File::open(path)?))
    }
}

impl<T: Element> Matrix<T> {
    /// Writes the binary dump format.
    ///
    /// The layout is [`BINARY_MAGIC`], the row and column counts as
    /// little endian `i32`, then every element as a little endian `f64` in
    /// row-major order. Empty matrices cannot be written.
    pub fn write_binary<W: Write>(&self, mut writer: W) -> Result<()> {
        if self.is_empty() {
            return Err(MatrixError::InvalidFormat(
                "cannot write an empty matrix".to_owned(),
            ));
        }
        let dim = |d: usize| {
            i32::try_from(d)
                .map_err(|_| MatrixError::InvalidFormat(format!("dimension {} too large", d)))
        };
        writer.write_all(&BINARY_MAGIC)?;
        writer.write_all(&dim(self.rows())?.to_le_bytes())?;
        writer.write_all(&dim(self.cols())?.to_le_bytes())?;
        for v in self.iter() {
            writer.write_all(&widen(v).to_le_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Saves the binary dump format to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.write_binary(BufWriter::new(File::create(path)?))
    }
}
