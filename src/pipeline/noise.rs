//! Noise-level estimation over spectral regions.
//!
//! Two estimators: an amplitude-based standard deviation about the window
//! mean, and a derivative-based estimator (SD of first differences divided
//! by √2) that is insensitive to slow baseline drift. Both feed the
//! thresholding logic in segmentation and alignment.

use serde::{Deserialize, Serialize};

use crate::error::{check_range, ProcessError, Result};

/// Which statistic to derive the noise scale from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseMethod {
    /// Standard deviation of the raw amplitudes about the window mean.
    Amplitude,
    /// Standard deviation of first differences, scaled by 1/√2. Immune to
    /// linear baseline trends across the window.
    Derivative,
}

/// A noise scale plus a flag for windows too small to carry a meaningful
/// estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseEstimate {
    pub sigma: f64,
    pub degenerate: bool,
}

/// Estimate the noise standard deviation of `signal` over `[n1, n2]`.
///
/// Windows with fewer than 2 samples yield `sigma = 0` with the degenerate
/// flag set; invalid bounds are an error.
pub fn estimate_noise(
    signal: &[f64],
    n1: usize,
    n2: usize,
    method: NoiseMethod,
) -> Result<NoiseEstimate> {
    check_range(n1, n2, signal.len())?;
    let w = &signal[n1..=n2];
    if w.len() < 2 {
        log::debug!("noise window [{}, {}] has fewer than 2 samples", n1, n2);
        return Ok(NoiseEstimate {
            sigma: 0.0,
            degenerate: true,
        });
    }
    let sigma = match method {
        NoiseMethod::Amplitude => sd(w),
        NoiseMethod::Derivative => {
            let diffs: Vec<f64> = w.windows(2).map(|p| p[1] - p[0]).collect();
            sd(&diffs) / std::f64::consts::SQRT_2
        }
    };
    Ok(NoiseEstimate {
        sigma,
        degenerate: false,
    })
}

/// Robust spread estimate: sort by magnitude, discard the top `cut` fraction
/// of extreme values, take the SD of the remainder.
///
/// `cut` must lie in `[0, 1)`; at least two samples are always kept.
pub fn estimate_sd(signal: &[f64], cut: f64) -> Result<f64> {
    if signal.len() < 2 {
        return Err(ProcessError::EmptyInput);
    }
    if !(0.0..1.0).contains(&cut) {
        return Err(ProcessError::invalid_parameter("cut", cut));
    }
    let mut sorted: Vec<f64> = signal.to_vec();
    sorted.sort_by(|a, b| a.abs().partial_cmp(&b.abs()).unwrap_or(std::cmp::Ordering::Equal));
    let keep = (((signal.len() as f64) * (1.0 - cut)).floor() as usize).max(2);
    Ok(sd(&sorted[..keep]))
}

/// Sample standard deviation (n-1 denominator).
fn sd(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (ss / (n - 1.0)).sqrt()
}
