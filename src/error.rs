//! Error taxonomy for the processing pipeline.
//!
//! Malformed inputs (bad ranges, shape mismatches, out-of-domain parameters)
//! fail fast with a [`ProcessError`]. Numeric degeneracies found mid-run
//! (flat windows, near-zero sums, optimizer hitting its iteration cap) are
//! not errors; they come back as status flags on the `Ok` result so a batch
//! over many spectra keeps going.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessError {
    /// A closed index interval `[n1, n2]` that is inverted or reaches past
    /// the end of the buffer.
    #[error("invalid range [{n1}, {n2}] for length {len}")]
    InvalidRange { n1: usize, n2: usize, len: usize },

    /// Smoothing windows must be odd and nonzero.
    #[error("invalid smoothing window {window}: must be odd and nonzero")]
    WindowSize { window: usize },

    /// A scalar parameter outside its documented domain.
    #[error("invalid parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: String },

    /// Two buffers that must share a length do not.
    #[error("length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    /// A bucket definition that is inverted, out of range, or overlaps its
    /// neighbor.
    #[error("invalid bucket at index {index}")]
    BucketBounds { index: usize },

    /// A phase-sensitive operation was handed a real-only spectrum.
    #[error("operation requires an imaginary part")]
    MissingImaginary,

    /// An empty signal or matrix where at least one sample is required.
    #[error("empty input")]
    EmptyInput,
}

impl ProcessError {
    pub fn invalid_parameter(name: &'static str, value: impl std::fmt::Display) -> Self {
        ProcessError::InvalidParameter {
            name,
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProcessError>;

/// Validate the closed interval `[n1, n2]` against a buffer of length `len`.
pub fn check_range(n1: usize, n2: usize, len: usize) -> Result<()> {
    if n1 > n2 || n2 >= len {
        return Err(ProcessError::InvalidRange { n1, n2, len });
    }
    Ok(())
}
