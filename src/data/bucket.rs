//! Bucket definitions and the integration table they produce.
//!
//! Bucket boundaries are defined once (in sample indices) and applied
//! read-only to every row of a spectrum matrix; the table owns the per-row
//! integrals plus a status vector so degenerate rows can be detected without
//! aborting the batch.

use serde::{Deserialize, Serialize};

use crate::error::{ProcessError, Result};

/// One integration interval `[start, end]` in sample indices, closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketDef {
    pub start: usize,
    pub end: usize,
}

impl BucketDef {
    pub fn new(start: usize, end: usize) -> Self {
        BucketDef { start, end }
    }

    pub fn width(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Validate a bucket list against a spectrum length: every bucket must have
/// monotonic in-range bounds, and buckets must be sorted and non-overlapping.
pub fn validate_buckets(defs: &[BucketDef], len: usize) -> Result<()> {
    if defs.is_empty() {
        return Err(ProcessError::EmptyInput);
    }
    for (i, b) in defs.iter().enumerate() {
        if b.start > b.end || b.end >= len {
            return Err(ProcessError::BucketBounds { index: i });
        }
        if i > 0 && b.start <= defs[i - 1].end {
            return Err(ProcessError::BucketBounds { index: i });
        }
    }
    Ok(())
}

/// Per-row outcome of a batch operation over a bucket table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowStatus {
    Ok,
    /// Row sum was zero or near-zero; the row was left unscaled.
    DegenerateSum,
}

/// rows × buckets table of integration values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketTable {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl BucketTable {
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(ProcessError::EmptyInput);
        }
        Ok(BucketTable {
            rows,
            cols,
            values: vec![0.0; rows * cols],
        })
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, r: usize) -> &[f64] {
        &self.values[r * self.cols..(r + 1) * self.cols]
    }

    pub fn row_mut(&mut self, r: usize) -> &mut [f64] {
        &mut self.values[r * self.cols..(r + 1) * self.cols]
    }

    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.values[r * self.cols + c]
    }

    pub fn set(&mut self, r: usize, c: usize, v: f64) {
        self.values[r * self.cols + c] = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_buckets_ordering() {
        let defs = vec![BucketDef::new(0, 4), BucketDef::new(5, 9)];
        assert!(validate_buckets(&defs, 10).is_ok());

        let overlapping = vec![BucketDef::new(0, 5), BucketDef::new(5, 9)];
        assert_eq!(
            validate_buckets(&overlapping, 10),
            Err(ProcessError::BucketBounds { index: 1 })
        );

        let reversed = vec![BucketDef::new(4, 2)];
        assert_eq!(
            validate_buckets(&reversed, 10),
            Err(ProcessError::BucketBounds { index: 0 })
        );

        let out_of_range = vec![BucketDef::new(0, 10)];
        assert_eq!(
            validate_buckets(&out_of_range, 10),
            Err(ProcessError::BucketBounds { index: 0 })
        );
    }

    #[test]
    fn test_table_access() {
        let mut t = BucketTable::zeros(2, 3).unwrap();
        t.set(1, 2, 7.5);
        assert_eq!(t.get(1, 2), 7.5);
        assert_eq!(t.row(0), &[0.0, 0.0, 0.0]);
    }
}
