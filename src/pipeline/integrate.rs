//! Bucket and interval integration plus constant-sum normalization.
//!
//! Integration convention: `integrate` sums the samples of the closed
//! interval, so the degenerate interval `[i, i]` yields the sample itself.
//! Bucket boundaries are defined once and applied read-only to every row;
//! per-row degeneracies (zero-sum rows under CSN) are isolated to their row
//! and reported through the status vector, never as errors.

use serde::{Deserialize, Serialize};

use crate::data::{validate_buckets, BucketDef, BucketTable, PpmAxis, RowStatus, SpectrumMatrix};
use crate::error::{check_range, ProcessError, Result};

/// Row sums with magnitude at or below this are treated as degenerate under
/// constant-sum normalization.
const CSN_EPSILON: f64 = 1e-12;

/// How a bucket's value is computed from its samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationMode {
    /// Plain sum of the intensities.
    Sum,
    /// Trapezoidal area: the sum minus half the two boundary samples.
    Trapezoid,
    /// Peak height: the maximum intensity in the bucket.
    PeakMax,
}

/// Sum of the samples over the closed interval `[n1, n2]`.
pub fn integrate(signal: &[f64], n1: usize, n2: usize) -> Result<f64> {
    check_range(n1, n2, signal.len())?;
    Ok(signal[n1..=n2].iter().sum())
}

/// Row-wise [`integrate`] over a matrix, one value per spectrum.
pub fn integrate_matrix(matrix: &SpectrumMatrix, n1: usize, n2: usize) -> Result<Vec<f64>> {
    check_range(n1, n2, matrix.ncols())?;
    use rayon::prelude::*;
    Ok(matrix
        .par_rows()
        .map(|row| row[n1..=n2].iter().sum())
        .collect())
}

fn bucket_value(row: &[f64], bucket: &BucketDef, mode: IntegrationMode) -> f64 {
    let samples = &row[bucket.start..=bucket.end];
    match mode {
        IntegrationMode::Sum => samples.iter().sum(),
        IntegrationMode::Trapezoid => {
            let sum: f64 = samples.iter().sum();
            sum - (samples[0] + samples[samples.len() - 1]) / 2.0
        }
        IntegrationMode::PeakMax => samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
    }
}

/// Integrate one spectrum over every bucket.
pub fn integrate_buckets(
    row: &[f64],
    defs: &[BucketDef],
    mode: IntegrationMode,
) -> Result<Vec<f64>> {
    validate_buckets(defs, row.len())?;
    Ok(defs.iter().map(|b| bucket_value(row, b, mode)).collect())
}

/// Integrate every (spectrum, bucket) pair at once: rows = spectra,
/// columns = buckets.
pub fn integrate_all_buckets(
    matrix: &SpectrumMatrix,
    defs: &[BucketDef],
    mode: IntegrationMode,
) -> Result<BucketTable> {
    validate_buckets(defs, matrix.ncols())?;
    let mut table = BucketTable::zeros(matrix.nrows(), defs.len())?;
    use rayon::prelude::*;
    // Row-parallel fill through the table's own rows.
    let values: Vec<Vec<f64>> = matrix
        .par_rows()
        .map(|row| defs.iter().map(|b| bucket_value(row, b, mode)).collect())
        .collect();
    for (r, row_values) in values.into_iter().enumerate() {
        table.row_mut(r).copy_from_slice(&row_values);
    }
    Ok(table)
}

/// Maximum intensity per (spectrum, bucket).
pub fn max_value_per_bucket(matrix: &SpectrumMatrix, defs: &[BucketDef]) -> Result<BucketTable> {
    integrate_all_buckets(matrix, defs, IntegrationMode::PeakMax)
}

/// Chemical shift of the maximum intensity per (spectrum, bucket).
///
/// The caller owns the index-to-ppm mapping and passes it explicitly.
pub fn ppm_of_max_per_bucket(
    matrix: &SpectrumMatrix,
    defs: &[BucketDef],
    axis: &PpmAxis,
) -> Result<BucketTable> {
    validate_buckets(defs, matrix.ncols())?;
    if axis.num_points != matrix.ncols() {
        return Err(ProcessError::LengthMismatch {
            left: axis.num_points,
            right: matrix.ncols(),
        });
    }
    let mut table = BucketTable::zeros(matrix.nrows(), defs.len())?;
    for r in 0..matrix.nrows() {
        let row = matrix.row(r);
        for (c, b) in defs.iter().enumerate() {
            let mut argmax = b.start;
            for i in b.start..=b.end {
                if row[i] > row[argmax] {
                    argmax = i;
                }
            }
            table.set(r, c, axis.index_to_ppm(argmax));
        }
    }
    Ok(table)
}

/// Constant-sum normalization: scale each row of the table so its bucket
/// values sum to `total`.
///
/// Rows whose sum magnitude is at or below an absolute epsilon are left
/// unscaled and flagged `DegenerateSum`; the rest of the table is still
/// normalized. Applying the normalization twice is idempotent.
pub fn normalize_csn(table: &mut BucketTable, total: f64) -> Result<Vec<RowStatus>> {
    if !(total > 0.0) {
        return Err(ProcessError::invalid_parameter("total", total));
    }
    let mut statuses = Vec::with_capacity(table.nrows());
    for r in 0..table.nrows() {
        let row = table.row_mut(r);
        let sum: f64 = row.iter().sum();
        if sum.abs() <= CSN_EPSILON {
            log::warn!("CSN: row {} has a degenerate sum {:.3e}, left unscaled", r, sum);
            statuses.push(RowStatus::DegenerateSum);
            continue;
        }
        let scale = total / sum;
        for v in row.iter_mut() {
            *v *= scale;
        }
        statuses.push(RowStatus::Ok);
    }
    Ok(statuses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_interval_is_the_sample() {
        let x = vec![1.0, -2.5, 4.0];
        assert_eq!(integrate(&x, 1, 1).unwrap(), -2.5);
        assert!(integrate(&x, 2, 1).is_err());
        assert!(integrate(&x, 0, 3).is_err());
    }

    #[test]
    fn test_integrate_matrix_rowwise() {
        let m = SpectrumMatrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(integrate_matrix(&m, 0, 2).unwrap(), vec![6.0, 15.0]);
        assert_eq!(integrate_matrix(&m, 1, 2).unwrap(), vec![5.0, 11.0]);
    }

    #[test]
    fn test_bucket_modes() {
        let row = vec![1.0, 3.0, 2.0, 0.0];
        let defs = vec![BucketDef::new(0, 2)];
        assert_eq!(
            integrate_buckets(&row, &defs, IntegrationMode::Sum).unwrap(),
            vec![6.0]
        );
        assert_eq!(
            integrate_buckets(&row, &defs, IntegrationMode::Trapezoid).unwrap(),
            vec![4.5]
        );
        assert_eq!(
            integrate_buckets(&row, &defs, IntegrationMode::PeakMax).unwrap(),
            vec![3.0]
        );
    }

    #[test]
    fn test_covering_buckets_match_full_integral() {
        let rows: Vec<Vec<f64>> = (0..3)
            .map(|r| (0..100).map(|i| ((i + r * 37) as f64 * 0.13).sin()).collect())
            .collect();
        let m = SpectrumMatrix::from_rows(rows).unwrap();
        let defs = vec![
            BucketDef::new(0, 24),
            BucketDef::new(25, 60),
            BucketDef::new(61, 99),
        ];
        let table = integrate_all_buckets(&m, &defs, IntegrationMode::Sum).unwrap();
        let full = integrate_matrix(&m, 0, 99).unwrap();
        for r in 0..3 {
            let bucket_sum: f64 = table.row(r).iter().sum();
            assert!(
                (bucket_sum - full[r]).abs() < 1e-10,
                "row {}: {} vs {}",
                r,
                bucket_sum,
                full[r]
            );
        }
    }

    #[test]
    fn test_ppm_of_max() {
        let m = SpectrumMatrix::from_rows(vec![vec![0.0, 5.0, 1.0, 0.0, 9.0]]).unwrap();
        let defs = vec![BucketDef::new(0, 2), BucketDef::new(3, 4)];
        let axis = PpmAxis {
            reference_ppm: 10.0,
            sw_ppm: 5.0,
            num_points: 5,
        };
        let table = ppm_of_max_per_bucket(&m, &defs, &axis).unwrap();
        assert!((table.get(0, 0) - axis.index_to_ppm(1)).abs() < 1e-12);
        assert!((table.get(0, 1) - axis.index_to_ppm(4)).abs() < 1e-12);
    }

    #[test]
    fn test_csn_rows_sum_to_total_and_idempotent() {
        let m = SpectrumMatrix::from_rows(vec![
            vec![1.0, 3.0, 4.0, 2.0],
            vec![0.0, 0.0, 0.0, 0.0],
            vec![2.0, 2.0, 2.0, 2.0],
        ])
        .unwrap();
        let defs = vec![BucketDef::new(0, 1), BucketDef::new(2, 3)];
        let mut table = integrate_all_buckets(&m, &defs, IntegrationMode::Sum).unwrap();

        let statuses = normalize_csn(&mut table, 100.0).unwrap();
        assert_eq!(
            statuses,
            vec![RowStatus::Ok, RowStatus::DegenerateSum, RowStatus::Ok]
        );
        assert!((table.row(0).iter().sum::<f64>() - 100.0).abs() < 1e-9);
        assert_eq!(table.row(1), &[0.0, 0.0]); // untouched

        let before: Vec<f64> = table.row(0).to_vec();
        normalize_csn(&mut table, 100.0).unwrap();
        for (a, b) in table.row(0).iter().zip(before.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_non_monotonic_buckets_fail_fast() {
        let m = SpectrumMatrix::from_rows(vec![vec![1.0; 10]]).unwrap();
        let defs = vec![BucketDef::new(5, 9), BucketDef::new(0, 4)];
        assert!(integrate_all_buckets(&m, &defs, IntegrationMode::Sum).is_err());
    }
}
