//! Segment location and local baseline fitting.
//!
//! `global_segments` finds the signal-bearing regions of a spectrum by
//! thresholding against a robust noise floor; the resulting index intervals
//! drive alignment and integration. The baseline routines are the
//! line-fitting primitives used by the correction layer.

use crate::data::Segment;
use crate::error::{check_range, ProcessError, Result};
use crate::pipeline::filters::{lowpass, smooth};
use crate::pipeline::noise::estimate_sd;

/// Fraction of extreme magnitudes trimmed when deriving the noise floor for
/// segmentation. Peaks occupy a small share of a 1D spectrum, so trimming
/// the top quarter leaves essentially pure noise.
const NOISE_TRIM: f64 = 0.25;

/// Find the contiguous signal-bearing regions of a spectrum.
///
/// A sample belongs to a run when its amplitude exceeds
/// `sigma_mult × noise`, where the noise floor is the magnitude-trimmed SD
/// of the whole signal. Runs separated by fewer than `min_width` samples are
/// merged, then runs narrower than `min_width` are discarded. The result is
/// ordered and non-overlapping.
pub fn global_segments(
    signal: &[f64],
    min_width: usize,
    sigma_mult: f64,
) -> Result<Vec<Segment>> {
    if signal.len() < 2 {
        return Err(ProcessError::EmptyInput);
    }
    if min_width == 0 {
        return Err(ProcessError::invalid_parameter("min_width", min_width));
    }
    if !(sigma_mult > 0.0) {
        return Err(ProcessError::invalid_parameter("sigma_mult", sigma_mult));
    }

    let noise = estimate_sd(signal, NOISE_TRIM)?;
    let threshold = sigma_mult * noise;
    log::debug!(
        "global_segments: noise floor {:.4e}, threshold {:.4e}",
        noise,
        threshold
    );

    // Collect raw runs above threshold in one pass.
    let mut runs: Vec<Segment> = Vec::new();
    let mut start: Option<usize> = None;
    for (i, &v) in signal.iter().enumerate() {
        if v.abs() > threshold {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s) = start.take() {
            runs.push(Segment::new(s, i - 1));
        }
    }
    if let Some(s) = start {
        runs.push(Segment::new(s, signal.len() - 1));
    }

    // Merge runs closer than min_width, then enforce the width floor.
    let mut merged: Vec<Segment> = Vec::new();
    for run in runs {
        match merged.last_mut() {
            Some(prev) if run.start - prev.end <= min_width => prev.end = run.end,
            _ => merged.push(run),
        }
    }
    merged.retain(|s| s.width() >= min_width);
    Ok(merged)
}

/// Fit a least-squares straight line to `signal` over `[n1, n2]`, write the
/// fitted line into `baseline` over the same range, and subtract it from
/// `signal` in place.
pub fn fit_line_baseline(
    signal: &mut [f64],
    baseline: &mut [f64],
    n1: usize,
    n2: usize,
) -> Result<()> {
    check_range(n1, n2, signal.len())?;
    if signal.len() != baseline.len() {
        return Err(ProcessError::LengthMismatch {
            left: signal.len(),
            right: baseline.len(),
        });
    }
    let n = (n2 - n1 + 1) as f64;
    // Centered abscissa keeps the normal equations well conditioned.
    let t0 = (n1 + n2) as f64 / 2.0;
    let mut sy = 0.0;
    let mut sty = 0.0;
    let mut stt = 0.0;
    for i in n1..=n2 {
        let t = i as f64 - t0;
        sy += signal[i];
        sty += t * signal[i];
        stt += t * t;
    }
    let intercept = sy / n;
    let slope = if stt > 0.0 { sty / stt } else { 0.0 };
    for i in n1..=n2 {
        let fit = intercept + slope * (i as f64 - t0);
        baseline[i] = fit;
        signal[i] -= fit;
    }
    Ok(())
}

/// Estimate the local baseline of `signal` over `seg`.
///
/// The window is smoothed with `smooth_window`, samples whose smoothed
/// amplitude stays at or below `sigma` are taken as baseline anchors, the
/// anchor values are linearly interpolated across the signal-bearing spans,
/// and the result is lowpass-filtered with a cutoff derived from
/// `neighborhood`. The window endpoints always count as anchors so the
/// interpolation is total.
///
/// Returns the baseline for the segment (length `seg.width()`).
pub fn estimate_local_baseline(
    signal: &[f64],
    seg: Segment,
    smooth_window: usize,
    neighborhood: usize,
    sigma: f64,
) -> Result<Vec<f64>> {
    seg.validate(signal.len())?;
    if neighborhood == 0 {
        return Err(ProcessError::invalid_parameter("neighborhood", neighborhood));
    }
    if !(sigma >= 0.0) {
        return Err(ProcessError::invalid_parameter("sigma", sigma));
    }
    let window = &signal[seg.start..=seg.end];
    let smoothed = smooth(window, smooth_window)?;
    let w = smoothed.len();

    let mut anchors: Vec<usize> = Vec::new();
    for (i, &v) in smoothed.iter().enumerate() {
        if v.abs() <= sigma {
            anchors.push(i);
        }
    }
    if anchors.first() != Some(&0) {
        anchors.insert(0, 0);
    }
    if anchors.last() != Some(&(w - 1)) {
        anchors.push(w - 1);
    }

    let mut baseline = vec![0.0; w];
    for pair in anchors.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let (ya, yb) = (smoothed[a], smoothed[b]);
        let span = (b - a) as f64;
        for i in a..=b {
            let frac = if span > 0.0 { (i - a) as f64 / span } else { 0.0 };
            baseline[i] = ya + frac * (yb - ya);
        }
    }

    // Final lowpass pass so anchor-to-anchor joints do not leave kinks.
    let alpha = (1.0 / (neighborhood as f64 + 1.0)).clamp(0.01, 0.99);
    lowpass(&baseline, alpha)
}
