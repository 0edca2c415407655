//! Cross-correlation alignment of spectrum segments against a reference row.
//!
//! Every row of the matrix is compared to one shared reference row, so the
//! reference must be fully corrected before an alignment pass starts; the
//! rows themselves are independent and processed in parallel.
//!
//! Shift convention: a result of `-3` means the row's segment must move three
//! samples toward lower indices to line up with the reference (so a copy of
//! the reference delayed by `+3` yields a shift of `-3`).

use serde::{Deserialize, Serialize};

use crate::data::{Segment, SpectrumMatrix};
use crate::error::{ProcessError, Result};

/// Minimum normalized cross-correlation for a shift to be trusted, unless
/// the caller overrides it.
pub const DEFAULT_MIN_CORRELATION: f64 = 0.5;

/// Shift estimate for one (row, sub-segment) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShiftResult {
    /// Samples to translate the segment by (negative = toward index 0).
    pub shift: i64,
    /// Normalized cross-correlation at that shift.
    pub correlation: f64,
    /// Set when the segment (or the reference) is flat: no meaningful
    /// correlation exists and the shift defaults to zero.
    pub degenerate: bool,
}

impl ShiftResult {
    fn degenerate() -> Self {
        ShiftResult {
            shift: 0,
            correlation: 0.0,
            degenerate: true,
        }
    }
}

/// Split `seg` at the given absolute boundary indices.
///
/// Each boundary `b` starts a new sub-segment, so the split of `[s, e]` at
/// `[b]` is `[s, b-1]`, `[b, e]`. Boundaries must be strictly increasing and
/// lie inside `(s, e]`.
pub fn split_segment(seg: Segment, boundaries: &[usize]) -> Result<Vec<Segment>> {
    let mut subs = Vec::with_capacity(boundaries.len() + 1);
    let mut start = seg.start;
    for &b in boundaries {
        if b <= start || b > seg.end {
            return Err(ProcessError::InvalidRange {
                n1: b,
                n2: b,
                len: seg.end + 1,
            });
        }
        subs.push(Segment::new(start, b - 1));
        start = b;
    }
    subs.push(Segment::new(start, seg.end));
    Ok(subs)
}

/// For each row and each sub-segment of `[seg]`, find the integer shift in
/// `[-max_shift, max_shift]` that maximizes the normalized cross-correlation
/// against the reference row's matching sub-segment.
///
/// Ties are broken toward the smallest |shift|, then the lower signed value.
/// Flat segments yield a degenerate zero-shift result, never an error.
pub fn compute_shifts(
    matrix: &SpectrumMatrix,
    ref_index: usize,
    max_shift: usize,
    seg: Segment,
    boundaries: &[usize],
) -> Result<Vec<Vec<ShiftResult>>> {
    matrix.check_row(ref_index)?;
    seg.validate(matrix.ncols())?;
    let subs = split_segment(seg, boundaries)?;
    let reference = matrix.row(ref_index);

    use rayon::prelude::*;
    let results: Vec<Vec<ShiftResult>> = matrix
        .par_rows()
        .map(|row| {
            subs.iter()
                .map(|&sub| best_shift(row, reference, sub, max_shift))
                .collect()
        })
        .collect();
    Ok(results)
}

/// Apply previously computed shifts to every row's sub-segments in place.
///
/// Sub-segments whose correlation is below `min_corr` (or degenerate) are
/// left untouched and counted as failures; the return value is the number of
/// sub-segments actually aligned. With `apodize` set, a raised-cosine taper
/// over 5% of each sub-segment edge suppresses the discontinuities the
/// translation would otherwise introduce.
pub fn align_segments(
    matrix: &mut SpectrumMatrix,
    shifts: &[Vec<ShiftResult>],
    seg: Segment,
    apodize: bool,
    boundaries: &[usize],
    min_corr: f64,
) -> Result<usize> {
    seg.validate(matrix.ncols())?;
    let subs = split_segment(seg, boundaries)?;
    if shifts.len() != matrix.nrows() {
        return Err(ProcessError::LengthMismatch {
            left: shifts.len(),
            right: matrix.nrows(),
        });
    }
    for row_shifts in shifts {
        if row_shifts.len() != subs.len() {
            return Err(ProcessError::LengthMismatch {
                left: row_shifts.len(),
                right: subs.len(),
            });
        }
    }

    use rayon::prelude::*;
    let aligned = matrix
        .par_rows_mut()
        .zip(shifts.par_iter())
        .map(|(row, row_shifts)| {
            let mut count = 0usize;
            for (&sub, sr) in subs.iter().zip(row_shifts.iter()) {
                if sr.degenerate || sr.correlation < min_corr {
                    continue;
                }
                translate_segment(&mut row[sub.start..=sub.end], sr.shift, apodize);
                count += 1;
            }
            count
        })
        .sum();
    Ok(aligned)
}

/// Best integer shift for one sub-segment, by exhaustive search over the
/// bounded lag range.
fn best_shift(row: &[f64], reference: &[f64], sub: Segment, max_shift: usize) -> ShiftResult {
    let width = sub.width();
    if variance(&row[sub.start..=sub.end]) == 0.0
        || variance(&reference[sub.start..=sub.end]) == 0.0
    {
        return ShiftResult::degenerate();
    }
    // Keep at least two overlapping samples at the extreme lags.
    let reach = max_shift.min(width.saturating_sub(2)) as i64;

    let mut best: Option<ShiftResult> = None;
    for d in -reach..=reach {
        let Some(corr) = correlation_at(row, reference, sub, d) else {
            continue;
        };
        let candidate = ShiftResult {
            shift: d,
            correlation: corr,
            degenerate: false,
        };
        best = Some(match best {
            None => candidate,
            Some(b) => {
                let better = corr > b.correlation
                    || (corr == b.correlation
                        && (d.abs() < b.shift.abs()
                            || (d.abs() == b.shift.abs() && d < b.shift)));
                if better {
                    candidate
                } else {
                    b
                }
            }
        });
    }
    best.unwrap_or_else(ShiftResult::degenerate)
}

fn variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}

/// Normalized cross-correlation between `row` translated by `d` and the
/// reference, over the overlapping part of `sub`. `None` when the overlap is
/// too small or either side is flat over the overlap.
fn correlation_at(row: &[f64], reference: &[f64], sub: Segment, d: i64) -> Option<f64> {
    let lo = (sub.start as i64).max(sub.start as i64 + d) as usize;
    let hi = (sub.end as i64).min(sub.end as i64 + d) as usize;
    if hi <= lo {
        return None;
    }
    let n = (hi - lo + 1) as f64;

    let mut sum_t = 0.0;
    let mut sum_r = 0.0;
    for i in lo..=hi {
        sum_t += row[(i as i64 - d) as usize];
        sum_r += reference[i];
    }
    let mean_t = sum_t / n;
    let mean_r = sum_r / n;

    let mut cov = 0.0;
    let mut var_t = 0.0;
    let mut var_r = 0.0;
    for i in lo..=hi {
        let t = row[(i as i64 - d) as usize] - mean_t;
        let r = reference[i] - mean_r;
        cov += t * r;
        var_t += t * t;
        var_r += r * r;
    }
    if var_t <= 0.0 || var_r <= 0.0 {
        return None;
    }
    Some(cov / (var_t.sqrt() * var_r.sqrt()))
}

/// Translate a segment by `shift` samples in place; vacated samples take the
/// nearest surviving edge value. Optionally taper the edges first.
fn translate_segment(segment: &mut [f64], shift: i64, apodize: bool) {
    if shift == 0 && !apodize {
        return;
    }
    let w = segment.len();
    let mut src = segment.to_vec();
    if apodize {
        taper_edges(&mut src);
    }
    for (i, out) in segment.iter_mut().enumerate() {
        let j = (i as i64 - shift).clamp(0, w as i64 - 1) as usize;
        *out = src[j];
    }
}

/// Raised-cosine taper over 5% of each end (at least 2 samples).
fn taper_edges(segment: &mut [f64]) {
    let w = segment.len();
    let ntaper = (w / 20).max(2).min(w / 2);
    for k in 0..ntaper {
        let weight = 0.5 * (1.0 - (std::f64::consts::PI * (k + 1) as f64
            / (ntaper + 1) as f64)
            .cos());
        segment[k] *= weight;
        segment[w - 1 - k] *= weight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testutil::add_gaussian_peak;

    /// Reference row with two peaks plus a copy delayed by `delay` samples.
    fn two_row_matrix(n: usize, delay: usize) -> SpectrumMatrix {
        let mut reference = vec![0.0; n];
        add_gaussian_peak(&mut reference, 100, 5.0, 4.0);
        add_gaussian_peak(&mut reference, 200, 8.0, 4.0);
        let delayed: Vec<f64> = (0..n)
            .map(|i| {
                let j = (i as i64 - delay as i64).clamp(0, n as i64 - 1) as usize;
                reference[j]
            })
            .collect();
        SpectrumMatrix::from_rows(vec![reference, delayed]).unwrap()
    }

    #[test]
    fn test_self_alignment_returns_zero_shift() {
        let m = two_row_matrix(300, 0);
        let shifts = compute_shifts(&m, 0, 10, Segment::new(50, 250), &[]).unwrap();
        assert_eq!(shifts[0][0].shift, 0);
        assert!(shifts[0][0].correlation > 0.999);
    }

    #[test]
    fn test_delayed_copy_needs_negative_shift() {
        let m = two_row_matrix(300, 3);
        let shifts = compute_shifts(&m, 0, 10, Segment::new(50, 250), &[]).unwrap();
        assert_eq!(shifts[1][0].shift, -3, "{:?}", shifts[1][0]);
        assert!(shifts[1][0].correlation > 0.99);
    }

    #[test]
    fn test_align_restores_delayed_copy() {
        let mut m = two_row_matrix(300, 3);
        let seg = Segment::new(50, 250);
        let shifts = compute_shifts(&m, 0, 10, seg, &[]).unwrap();
        let aligned = align_segments(&mut m, &shifts, seg, false, &[], 0.5).unwrap();
        assert_eq!(aligned, 2); // reference (shift 0) and the delayed row

        let reference: Vec<f64> = m.row(0).to_vec();
        for i in 54..=246 {
            let diff = (m.row(1)[i] - reference[i]).abs();
            assert!(diff < 1e-9, "mismatch at {}: {}", i, diff);
        }
    }

    #[test]
    fn test_apodized_alignment_matches_in_interior() {
        let mut m = two_row_matrix(300, 3);
        let seg = Segment::new(50, 250);
        let shifts = compute_shifts(&m, 0, 10, seg, &[]).unwrap();
        align_segments(&mut m, &shifts, seg, true, &[], 0.5).unwrap();

        let reference: Vec<f64> = m.row(0).to_vec();
        // Taper spans w/20 = 10 samples per edge; stay clear of them plus
        // the 3-sample translation zone.
        for i in 70..=230 {
            let diff = (m.row(1)[i] - reference[i]).abs();
            assert!(diff < 1e-9, "mismatch at {}: {}", i, diff);
        }
    }

    #[test]
    fn test_boundaries_split_into_independent_subsegments() {
        let m = two_row_matrix(300, 3);
        let seg = Segment::new(50, 250);
        let shifts = compute_shifts(&m, 0, 10, seg, &[150]).unwrap();
        assert_eq!(shifts[1].len(), 2);
        assert_eq!(shifts[1][0].shift, -3);
        assert_eq!(shifts[1][1].shift, -3);
    }

    #[test]
    fn test_flat_segment_is_degenerate_zero_shift() {
        let mut rows = two_row_matrix(300, 0)
            .iter_rows()
            .map(|r| r.to_vec())
            .collect::<Vec<_>>();
        rows[1] = vec![0.0; 300]; // flat row
        let mut m = SpectrumMatrix::from_rows(rows).unwrap();
        let seg = Segment::new(50, 250);
        let shifts = compute_shifts(&m, 0, 10, seg, &[]).unwrap();
        assert!(shifts[1][0].degenerate);
        assert_eq!(shifts[1][0].shift, 0);

        // Degenerate segment is skipped, not fatal.
        let aligned = align_segments(&mut m, &shifts, seg, false, &[], 0.5).unwrap();
        assert_eq!(aligned, 1);
    }

    #[test]
    fn test_invalid_boundaries_rejected() {
        let m = two_row_matrix(300, 0);
        let seg = Segment::new(50, 250);
        assert!(compute_shifts(&m, 0, 10, seg, &[50]).is_err());
        assert!(compute_shifts(&m, 0, 10, seg, &[251]).is_err());
        assert!(compute_shifts(&m, 5, 10, seg, &[]).is_err());
    }

    #[test]
    fn test_shift_shape_mismatch_rejected() {
        let mut m = two_row_matrix(300, 0);
        let seg = Segment::new(50, 250);
        let shifts = vec![vec![ShiftResult::degenerate()]]; // only one row
        assert!(align_segments(&mut m, &shifts, seg, false, &[], 0.5).is_err());
    }
}
