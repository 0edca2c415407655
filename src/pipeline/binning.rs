//! Adaptive intelligent binning: derive bucket boundaries from the data
//! instead of a fixed grid.
//!
//! A region's bin value is, per spectrum, the geometric mean of the peak
//! prominence over the region's two ends, summed across spectra. The region
//! is recursively bisected wherever a split increases the combined value;
//! regions whose value never rises above the noise threshold are dropped, so
//! only signal-bearing buckets come back.

use serde::{Deserialize, Serialize};

use crate::data::{BucketDef, Segment, SpectrumMatrix};
use crate::error::{ProcessError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AibinConfig {
    /// Minimum bucket width in samples; no split produces a narrower side.
    pub min_width: usize,
    /// Bin-value threshold below which a region counts as noise and is not
    /// emitted as a bucket.
    pub noise_value: f64,
}

/// Compute data-adaptive bucket boundaries over `seg`.
///
/// Deterministic: exhaustive split search, no randomness. Returns an
/// ordered, non-overlapping bucket list (possibly empty when the region is
/// all noise).
pub fn aibin_buckets(
    matrix: &SpectrumMatrix,
    seg: Segment,
    cfg: &AibinConfig,
) -> Result<Vec<BucketDef>> {
    seg.validate(matrix.ncols())?;
    if cfg.min_width < 2 {
        return Err(ProcessError::invalid_parameter("min_width", cfg.min_width));
    }
    if !(cfg.noise_value >= 0.0) {
        return Err(ProcessError::invalid_parameter("noise_value", cfg.noise_value));
    }
    let mut out = Vec::new();
    recurse(matrix, seg.start, seg.end, cfg, &mut out);
    log::debug!(
        "aibin: [{}, {}] -> {} buckets",
        seg.start,
        seg.end,
        out.len()
    );
    Ok(out)
}

fn recurse(matrix: &SpectrumMatrix, s: usize, e: usize, cfg: &AibinConfig, out: &mut Vec<BucketDef>) {
    let width = e - s + 1;
    let whole = bin_value(matrix, s, e);

    if width >= 2 * cfg.min_width {
        // Best split: p is the last index of the left side.
        let mut best: Option<(usize, f64)> = None;
        for p in (s + cfg.min_width - 1)..=(e - cfg.min_width) {
            let combined = bin_value(matrix, s, p) + bin_value(matrix, p + 1, e);
            match best {
                Some((_, v)) if combined <= v => {}
                _ => best = Some((p, combined)),
            }
        }
        if let Some((p, combined)) = best {
            if combined > whole {
                recurse(matrix, s, p, cfg, out);
                recurse(matrix, p + 1, e, cfg, out);
                return;
            }
        }
    }

    if whole > cfg.noise_value {
        out.push(BucketDef::new(s, e));
    }
}

/// Summed per-row bin value of `[s, e]`: sqrt of the product of the maximum's
/// prominence over the two region ends.
fn bin_value(matrix: &SpectrumMatrix, s: usize, e: usize) -> f64 {
    let mut total = 0.0;
    for row in matrix.iter_rows() {
        let mx = row[s..=e].iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let left = (mx - row[s]).max(0.0);
        let right = (mx - row[e]).max(0.0);
        total += (left * right).sqrt();
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::validate_buckets;
    use crate::pipeline::testutil::add_gaussian_peak;

    #[test]
    fn test_two_peaks_get_separate_buckets() {
        let mut row = vec![0.0; 300];
        add_gaussian_peak(&mut row, 100, 10.0, 5.0);
        add_gaussian_peak(&mut row, 200, 10.0, 5.0);
        let m = SpectrumMatrix::from_rows(vec![row]).unwrap();
        let cfg = AibinConfig {
            min_width: 5,
            noise_value: 0.1,
        };
        let buckets = aibin_buckets(&m, Segment::new(0, 299), &cfg).unwrap();
        assert!(buckets.len() >= 2, "buckets {:?}", buckets);
        validate_buckets(&buckets, 300).unwrap();

        let holds_first = buckets.iter().position(|b| b.start <= 100 && 100 <= b.end);
        let holds_second = buckets.iter().position(|b| b.start <= 200 && 200 <= b.end);
        assert!(holds_first.is_some() && holds_second.is_some());
        assert_ne!(holds_first, holds_second, "peaks share a bucket: {:?}", buckets);
    }

    #[test]
    fn test_pure_noise_region_yields_no_buckets() {
        let m = SpectrumMatrix::from_rows(vec![vec![0.0; 200]]).unwrap();
        let cfg = AibinConfig {
            min_width: 5,
            noise_value: 0.1,
        };
        let buckets = aibin_buckets(&m, Segment::new(0, 199), &cfg).unwrap();
        assert!(buckets.is_empty(), "buckets {:?}", buckets);
    }

    #[test]
    fn test_config_validation() {
        let m = SpectrumMatrix::from_rows(vec![vec![0.0; 50]]).unwrap();
        let seg = Segment::new(0, 49);
        let bad_width = AibinConfig {
            min_width: 1,
            noise_value: 0.1,
        };
        assert!(aibin_buckets(&m, seg, &bad_width).is_err());
        let bad_noise = AibinConfig {
            min_width: 4,
            noise_value: -1.0,
        };
        assert!(aibin_buckets(&m, seg, &bad_noise).is_err());
    }
}
