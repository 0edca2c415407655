//! Basic signal filters: exponential lowpass, windowed mean, centered
//! moving-average smoothing, discrete derivative, and Lorentzian
//! second-derivative peak sharpening.
//!
//! Derivative edge convention: `derivative1` returns a vector of the same
//! length as its input, where element `i` is the forward difference
//! `x[i+1] - x[i]` and the last element repeats the previous difference.

use std::f64::consts::PI;

use crate::data::SpectrumMatrix;
use crate::error::{check_range, ProcessError, Result};

/// Single-pole exponential lowpass, seeded with the first input sample.
///
/// `alpha` in (0, 1): small values smooth harder.
pub fn lowpass(signal: &[f64], alpha: f64) -> Result<Vec<f64>> {
    if signal.is_empty() {
        return Err(ProcessError::EmptyInput);
    }
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(ProcessError::invalid_parameter("alpha", alpha));
    }
    let mut out = Vec::with_capacity(signal.len());
    let mut y = signal[0];
    out.push(y);
    for &x in &signal[1..] {
        y += alpha * (x - y);
        out.push(y);
    }
    Ok(out)
}

/// Arithmetic mean of the samples in the closed range `[n1, n2]`.
pub fn windowed_mean(signal: &[f64], n1: usize, n2: usize) -> Result<f64> {
    check_range(n1, n2, signal.len())?;
    let w = &signal[n1..=n2];
    Ok(w.iter().sum::<f64>() / w.len() as f64)
}

/// Centered moving average with an odd window.
///
/// Near the edges the window shrinks symmetrically instead of wrapping or
/// zero-padding, so no boundary artifacts are introduced. `smooth(x, 1)` is
/// the identity.
pub fn smooth(signal: &[f64], window: usize) -> Result<Vec<f64>> {
    if signal.is_empty() {
        return Err(ProcessError::EmptyInput);
    }
    if window == 0 || window % 2 == 0 {
        return Err(ProcessError::WindowSize { window });
    }
    let n = signal.len();
    let half = window / 2;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let reach = half.min(i).min(n - 1 - i);
        let lo = i - reach;
        let hi = i + reach;
        let sum: f64 = signal[lo..=hi].iter().sum();
        out.push(sum / (hi - lo + 1) as f64);
    }
    Ok(out)
}

/// First-order discrete derivative, same length as the input.
///
/// `out[i] = x[i+1] - x[i]`; the last element repeats `out[n-2]`.
pub fn derivative1(signal: &[f64]) -> Result<Vec<f64>> {
    let n = signal.len();
    if n < 2 {
        return Err(ProcessError::EmptyInput);
    }
    let mut out = Vec::with_capacity(n);
    for i in 0..n - 1 {
        out.push(signal[i + 1] - signal[i]);
    }
    out.push(out[n - 2]);
    Ok(out)
}

/// Row-wise [`derivative1`] over a spectrum matrix.
pub fn derivative_matrix(matrix: &SpectrumMatrix) -> Result<SpectrumMatrix> {
    let mut out = matrix.clone();
    let src = matrix;
    use rayon::prelude::*;
    if src.ncols() < 2 {
        return Err(ProcessError::EmptyInput);
    }
    out.par_rows_mut()
        .enumerate()
        .for_each(|(r, row)| {
            let input = src.row(r);
            let n = input.len();
            for i in 0..n - 1 {
                row[i] = input[i + 1] - input[i];
            }
            row[n - 1] = row[n - 2];
        });
    Ok(out)
}

/// Peak sharpening by convolution with the negated second derivative of a
/// Lorentzian of half-width `sigma` (in samples), truncated at ±5σ.
///
/// The kernel integrates to zero, so constant offsets are removed while
/// narrow features are amplified relative to broad ones.
pub fn sdl(signal: &[f64], sigma: f64) -> Result<Vec<f64>> {
    if signal.is_empty() {
        return Err(ProcessError::EmptyInput);
    }
    if !(sigma > 0.0) {
        return Err(ProcessError::invalid_parameter("sigma", sigma));
    }
    let reach = (5.0 * sigma).ceil() as usize;
    let mut kernel: Vec<f64> = (-(reach as i64)..=reach as i64)
        .map(|k| {
            let t = k as f64;
            let s2 = sigma * sigma;
            // -d²/dt² [ σ / (π (σ² + t²)) ]
            -(2.0 * sigma * (3.0 * t * t - s2)) / (PI * (s2 + t * t).powi(3))
        })
        .collect();
    // Remove the truncation residue so the kernel sums exactly to zero and
    // constant offsets are fully rejected.
    let mean = kernel.iter().sum::<f64>() / kernel.len() as f64;
    for k in kernel.iter_mut() {
        *k -= mean;
    }

    let n = signal.len();
    let mut out = vec![0.0; n];
    for i in 0..n {
        let mut acc = 0.0;
        for (j, &k) in kernel.iter().enumerate() {
            let offset = j as i64 - reach as i64;
            let idx = i as i64 + offset;
            if idx >= 0 && (idx as usize) < n {
                acc += signal[idx as usize] * k;
            }
        }
        out[i] = acc;
    }
    Ok(out)
}
