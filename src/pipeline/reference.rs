//! Reference-spectrum construction for alignment.
//!
//! Alignment compares every row against one reference; besides picking an
//! actual row, callers can synthesize one as the mean of selected rows or
//! the per-column median of the whole matrix.

use crate::data::{Segment, SpectrumMatrix};
use crate::error::{ProcessError, Result};

/// Mean of the selected rows over the full spectrum width.
pub fn mean_spectrum(matrix: &SpectrumMatrix, rows: &[usize]) -> Result<Vec<f64>> {
    mean_spectrum_interval(matrix, rows, Segment::new(0, matrix.ncols() - 1))
}

/// Mean of the selected rows over `seg` (length `seg.width()`).
pub fn mean_spectrum_interval(
    matrix: &SpectrumMatrix,
    rows: &[usize],
    seg: Segment,
) -> Result<Vec<f64>> {
    if rows.is_empty() {
        return Err(ProcessError::EmptyInput);
    }
    seg.validate(matrix.ncols())?;
    for &r in rows {
        matrix.check_row(r)?;
    }
    let mut out = vec![0.0; seg.width()];
    for &r in rows {
        let row = matrix.row(r);
        for (o, &v) in out.iter_mut().zip(row[seg.start..=seg.end].iter()) {
            *o += v;
        }
    }
    let scale = 1.0 / rows.len() as f64;
    for o in out.iter_mut() {
        *o *= scale;
    }
    Ok(out)
}

/// Per-column median across all rows. With an even row count the two middle
/// values are averaged.
pub fn median_spectrum(matrix: &SpectrumMatrix) -> Result<Vec<f64>> {
    let nrows = matrix.nrows();
    let ncols = matrix.ncols();
    use rayon::prelude::*;
    let out: Vec<f64> = (0..ncols)
        .into_par_iter()
        .map(|c| {
            let mut column: Vec<f64> = (0..nrows).map(|r| matrix.row(r)[c]).collect();
            column.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            if nrows % 2 == 1 {
                column[nrows / 2]
            } else {
                (column[nrows / 2 - 1] + column[nrows / 2]) / 2.0
            }
        })
        .collect();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> SpectrumMatrix {
        SpectrumMatrix::from_rows(vec![
            vec![1.0, 2.0, 3.0, 4.0],
            vec![3.0, 4.0, 5.0, 6.0],
            vec![100.0, 0.0, 1.0, 2.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_mean_spectrum_of_selected_rows() {
        let m = matrix();
        let mean = mean_spectrum(&m, &[0, 1]).unwrap();
        assert_eq!(mean, vec![2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_mean_spectrum_interval() {
        let m = matrix();
        let mean = mean_spectrum_interval(&m, &[0, 1], Segment::new(1, 2)).unwrap();
        assert_eq!(mean, vec![3.0, 4.0]);
    }

    #[test]
    fn test_mean_rejects_bad_rows() {
        let m = matrix();
        assert!(mean_spectrum(&m, &[]).is_err());
        assert!(mean_spectrum(&m, &[3]).is_err());
    }

    #[test]
    fn test_median_resists_outlier_row() {
        let m = matrix();
        let median = median_spectrum(&m).unwrap();
        assert_eq!(median, vec![3.0, 2.0, 3.0, 4.0]);
    }
}
