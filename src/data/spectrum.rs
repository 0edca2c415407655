//! Spectrum containers: a single (optionally complex) 1D spectrum, a
//! row-major matrix of spectra, and the index intervals used to address
//! contiguous regions of them.
//!
//! Indices are 0-based and intervals are closed `[start, end]`; every public
//! entry point validates its bounds once, so the numeric kernels can index
//! without further checks.

use serde::{Deserialize, Serialize};

use crate::error::{ProcessError, Result};

/// A contiguous, closed index interval `[start, end]` within a spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn new(start: usize, end: usize) -> Self {
        Segment { start, end }
    }

    /// Number of samples covered (closed interval, never zero).
    pub fn width(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index <= self.end
    }

    /// Check `start <= end < len`.
    pub fn validate(&self, len: usize) -> Result<()> {
        crate::error::check_range(self.start, self.end, len)
    }
}

/// One spectrum: real intensities, optionally paired with an imaginary part
/// of the same length for phase-sensitive operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spectrum {
    pub real: Vec<f64>,
    pub imag: Option<Vec<f64>>,
}

impl Spectrum {
    pub fn from_real(real: Vec<f64>) -> Result<Self> {
        if real.is_empty() {
            return Err(ProcessError::EmptyInput);
        }
        Ok(Spectrum { real, imag: None })
    }

    pub fn from_complex(real: Vec<f64>, imag: Vec<f64>) -> Result<Self> {
        if real.is_empty() {
            return Err(ProcessError::EmptyInput);
        }
        if real.len() != imag.len() {
            return Err(ProcessError::LengthMismatch {
                left: real.len(),
                right: imag.len(),
            });
        }
        Ok(Spectrum {
            real,
            imag: Some(imag),
        })
    }

    pub fn len(&self) -> usize {
        self.real.len()
    }

    pub fn is_empty(&self) -> bool {
        self.real.is_empty()
    }

    /// Maximum absolute intensity of the real part.
    pub fn max_abs(&self) -> f64 {
        self.real.iter().map(|v| v.abs()).fold(0.0f64, f64::max)
    }
}

/// A set of spectra sharing one length, stored row-major in a single
/// allocation. Rows are independent for every operation except alignment,
/// which reads one shared reference row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrumMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl SpectrumMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(ProcessError::EmptyInput);
        }
        Ok(SpectrumMatrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        })
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let nrows = rows.len();
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if nrows == 0 || cols == 0 {
            return Err(ProcessError::EmptyInput);
        }
        let mut data = Vec::with_capacity(nrows * cols);
        for row in &rows {
            if row.len() != cols {
                return Err(ProcessError::LengthMismatch {
                    left: cols,
                    right: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(SpectrumMatrix {
            rows: nrows,
            cols,
            data,
        })
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn row_mut(&mut self, r: usize) -> &mut [f64] {
        &mut self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn check_row(&self, r: usize) -> Result<()> {
        if r >= self.rows {
            return Err(ProcessError::InvalidRange {
                n1: r,
                n2: r,
                len: self.rows,
            });
        }
        Ok(())
    }

    pub fn iter_rows(&self) -> std::slice::ChunksExact<'_, f64> {
        self.data.chunks_exact(self.cols)
    }

    /// Parallel read-only row iterator (rayon).
    pub fn par_rows(&self) -> rayon::slice::ChunksExact<'_, f64> {
        use rayon::prelude::*;
        self.data.par_chunks_exact(self.cols)
    }

    /// Parallel mutable row iterator (rayon). Each worker owns its row
    /// exclusively, so matrix-wide passes need no locking.
    pub fn par_rows_mut(&mut self) -> rayon::slice::ChunksExactMut<'_, f64> {
        use rayon::prelude::*;
        self.data.par_chunks_exact_mut(self.cols)
    }
}

/// Mapping between sample index and chemical shift for one axis.
///
/// The spectrum runs from `reference_ppm` at index 0 down to
/// `reference_ppm - sw_ppm` at the last index (high field on the right).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PpmAxis {
    pub reference_ppm: f64,
    pub sw_ppm: f64,
    pub num_points: usize,
}

impl PpmAxis {
    pub fn index_to_ppm(&self, index: usize) -> f64 {
        if self.num_points == 0 {
            return 0.0;
        }
        let frac = index as f64 / self.num_points as f64;
        self.reference_ppm - frac * self.sw_ppm
    }

    pub fn ppm_scale(&self) -> Vec<f64> {
        (0..self.num_points).map(|i| self.index_to_ppm(i)).collect()
    }
}
