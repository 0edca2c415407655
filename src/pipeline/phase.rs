//! Phase and baseline correction for complex spectra.
//!
//! The corrector searches a small parameter vector (phase polynomial
//! coefficients, optionally a linear baseline) with a deterministic
//! Nelder-Mead simplex, minimizing either a negativity-penalized
//! least-squares cost or the Shannon entropy of the corrected spectrum's
//! first derivative (well-phased absorption peaks have a maximally peaked
//! derivative distribution, hence minimal entropy).
//!
//! Exhausting the iteration budget is not fatal: the best parameters found
//! are still applied and reported with `converged = false`.

use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::data::Spectrum;
use crate::error::{ProcessError, Result};

/// Which cost drives the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    /// Mean square of the negative part of the corrected real spectrum,
    /// plus the baseline penalty weighted by `baseline_weight`.
    LeastSquares,
    /// Shannon entropy of the normalized |first derivative| of the
    /// corrected real spectrum, plus `gamma` times the negativity penalty.
    Entropy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseConfig {
    pub objective: Objective,
    /// Order of the phase polynomial: 0 gives zero-order phase only,
    /// 1 adds the linear (first-order) term.
    pub order: usize,
    /// Fit a linear baseline (offset + slope) alongside the phase.
    pub baseline: bool,
    /// Weight `B` of the baseline penalty: the mean square of the corrected
    /// spectrum over its quietest samples, which should sit at zero once the
    /// baseline is right. Only active when `baseline` is set.
    pub baseline_weight: f64,
    /// Weight of the negativity penalty in the entropy objective.
    pub gamma: f64,
    /// Sample spacing of the derivative used by the entropy objective.
    pub neighborhood: usize,
    pub max_iter: usize,
    /// Convergence tolerance on the simplex objective spread.
    pub tol: f64,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        PhaseConfig {
            objective: Objective::Entropy,
            order: 1,
            baseline: false,
            baseline_weight: 1.0,
            gamma: 1000.0,
            neighborhood: 1,
            max_iter: 500,
            tol: 1e-10,
        }
    }
}

impl PhaseConfig {
    /// Total number of optimized parameters: phase coefficients plus the
    /// optional baseline offset/slope pair.
    pub fn num_params(&self) -> usize {
        self.order + 1 + if self.baseline { 2 } else { 0 }
    }

    fn validate(&self) -> Result<()> {
        // The parameter vector stays small: 2-4 coefficients.
        if self.num_params() > 4 {
            return Err(ProcessError::invalid_parameter("order", self.order));
        }
        if self.neighborhood == 0 {
            return Err(ProcessError::invalid_parameter(
                "neighborhood",
                self.neighborhood,
            ));
        }
        if self.max_iter == 0 {
            return Err(ProcessError::invalid_parameter("max_iter", self.max_iter));
        }
        if !(self.tol > 0.0) {
            return Err(ProcessError::invalid_parameter("tol", self.tol));
        }
        Ok(())
    }
}

/// Outcome of a correction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseCorrection {
    /// Optimized parameter vector: phase coefficients first, then the
    /// baseline offset/slope when fitted.
    pub params: Vec<f64>,
    pub objective_value: f64,
    pub iterations: usize,
    /// False when the iteration budget ran out before the simplex spread
    /// met the tolerance; the parameters are still the best found.
    pub converged: bool,
}

/// Reconstruct the corrected real part from a phase rotation polynomial.
///
/// The rotation angle at sample `i` is `Σ params[k] · t^k` (radians) with
/// `t = i / (n-1)`.
pub fn apply_phase(re: &[f64], im: &[f64], phase_params: &[f64]) -> Result<Vec<f64>> {
    if re.is_empty() {
        return Err(ProcessError::EmptyInput);
    }
    if re.len() != im.len() {
        return Err(ProcessError::LengthMismatch {
            left: re.len(),
            right: im.len(),
        });
    }
    if phase_params.is_empty() {
        return Err(ProcessError::EmptyInput);
    }
    let n = re.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let phi = phase_at(phase_params, i, n);
        let z = Complex::new(re[i], im[i]) * Complex::from_polar(1.0, phi);
        out.push(z.re);
    }
    Ok(out)
}

/// Optimize phase (and optionally baseline) parameters for a complex
/// spectrum and apply them.
///
/// Returns the corrected spectrum together with the optimizer report. The
/// search is fully deterministic: a fixed zero initial guess and a fixed
/// initial simplex step, no randomized restarts.
pub fn correct_phase_baseline(
    spectrum: &Spectrum,
    cfg: &PhaseConfig,
) -> Result<(Spectrum, PhaseCorrection)> {
    cfg.validate()?;
    let re = &spectrum.real;
    let im = spectrum.imag.as_ref().ok_or(ProcessError::MissingImaginary)?;
    if re.len() < 2 {
        return Err(ProcessError::EmptyInput);
    }

    let x0 = vec![0.0; cfg.num_params()];
    let (params, objective_value, iterations, converged) = nelder_mead(
        |p| objective_value(p, re, im, cfg),
        &x0,
        0.1,
        cfg.tol,
        cfg.max_iter,
    );
    if !converged {
        log::warn!(
            "phase optimization stopped after {} iterations without meeting tol {:.1e}",
            iterations,
            cfg.tol
        );
    }

    let n = re.len();
    let phase_params = &params[..cfg.order + 1];
    let mut real = Vec::with_capacity(n);
    let mut imag = Vec::with_capacity(n);
    for i in 0..n {
        let phi = phase_at(phase_params, i, n);
        let z = Complex::new(re[i], im[i]) * Complex::from_polar(1.0, phi);
        real.push(z.re - baseline_at(&params, cfg, i, n));
        imag.push(z.im);
    }

    Ok((
        Spectrum {
            real,
            imag: Some(imag),
        },
        PhaseCorrection {
            params,
            objective_value,
            iterations,
            converged,
        },
    ))
}

fn phase_at(phase_params: &[f64], i: usize, n: usize) -> f64 {
    let t = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
    let mut phi = 0.0;
    let mut tp = 1.0;
    for &c in phase_params {
        phi += c * tp;
        tp *= t;
    }
    phi
}

fn baseline_at(params: &[f64], cfg: &PhaseConfig, i: usize, n: usize) -> f64 {
    if !cfg.baseline {
        return 0.0;
    }
    let t = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
    let offset = params[cfg.order + 1];
    let slope = params[cfg.order + 2];
    offset + slope * t
}

/// Corrected real part under a candidate parameter vector.
fn corrected_real(params: &[f64], re: &[f64], im: &[f64], cfg: &PhaseConfig) -> Vec<f64> {
    let n = re.len();
    let phase_params = &params[..cfg.order + 1];
    (0..n)
        .map(|i| {
            let phi = phase_at(phase_params, i, n);
            let z = Complex::new(re[i], im[i]) * Complex::from_polar(1.0, phi);
            z.re - baseline_at(params, cfg, i, n)
        })
        .collect()
}

/// Mean square of the corrected spectrum over its quietest quarter of
/// samples (smallest magnitudes). Signal-free regions should sit at zero
/// after baseline subtraction, so this term anchors the baseline fit.
fn quiet_mean_square(r: &[f64]) -> f64 {
    let mut mags: Vec<f64> = r.to_vec();
    mags.sort_by(|a, b| a.abs().partial_cmp(&b.abs()).unwrap_or(std::cmp::Ordering::Equal));
    let keep = (mags.len() / 4).max(1);
    mags[..keep].iter().map(|v| v * v).sum::<f64>() / keep as f64
}

fn objective_value(params: &[f64], re: &[f64], im: &[f64], cfg: &PhaseConfig) -> f64 {
    let r = corrected_real(params, re, im, cfg);
    let n = r.len() as f64;

    let baseline_penalty = if cfg.baseline {
        cfg.baseline_weight * quiet_mean_square(&r)
    } else {
        0.0
    };

    match cfg.objective {
        Objective::LeastSquares => {
            let neg: f64 = r.iter().map(|&v| v.min(0.0).powi(2)).sum();
            neg / n + baseline_penalty
        }
        Objective::Entropy => {
            let scale = r.iter().map(|v| v.abs()).fold(0.0f64, f64::max);
            if scale == 0.0 {
                return baseline_penalty;
            }
            let m = cfg.neighborhood;
            let mut total = 0.0;
            let mut derivs = Vec::with_capacity(r.len().saturating_sub(m));
            for i in 0..r.len().saturating_sub(m) {
                let d = (r[i + m] - r[i]).abs();
                derivs.push(d);
                total += d;
            }
            let mut entropy = 0.0;
            if total > 0.0 {
                for d in derivs {
                    if d > 0.0 {
                        let h = d / total;
                        entropy -= h * h.ln();
                    }
                }
            }
            let neg: f64 = r
                .iter()
                .map(|&v| (v / scale).min(0.0).powi(2))
                .sum();
            entropy + cfg.gamma * neg / n + baseline_penalty
        }
    }
}

/// Deterministic Nelder-Mead simplex minimization.
///
/// Standard coefficients (reflection 1, expansion 2, contraction 0.5,
/// shrink 0.5), fixed initial simplex `x0 + step·e_k`. Converged when the
/// objective spread across the simplex drops below `tol`.
fn nelder_mead<F>(
    f: F,
    x0: &[f64],
    step: f64,
    tol: f64,
    max_iter: usize,
) -> (Vec<f64>, f64, usize, bool)
where
    F: Fn(&[f64]) -> f64,
{
    let dim = x0.len();
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
    simplex.push(x0.to_vec());
    for k in 0..dim {
        let mut p = x0.to_vec();
        p[k] += step;
        simplex.push(p);
    }
    let mut values: Vec<f64> = simplex.iter().map(|p| f(p)).collect();

    let mut iterations = 0;
    let mut converged = false;
    while iterations < max_iter {
        // Order simplex by objective value (stable: ties keep insertion order).
        let mut order: Vec<usize> = (0..=dim).collect();
        order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(std::cmp::Ordering::Equal));
        let best = order[0];
        let worst = order[dim];
        let second_worst = order[dim - 1];

        if (values[worst] - values[best]).abs() < tol {
            converged = true;
            break;
        }
        iterations += 1;

        // Centroid of all points but the worst.
        let mut centroid = vec![0.0; dim];
        for (idx, p) in simplex.iter().enumerate() {
            if idx == worst {
                continue;
            }
            for (c, &v) in centroid.iter_mut().zip(p.iter()) {
                *c += v;
            }
        }
        for c in centroid.iter_mut() {
            *c /= dim as f64;
        }

        let reflect: Vec<f64> = centroid
            .iter()
            .zip(simplex[worst].iter())
            .map(|(&c, &w)| c + (c - w))
            .collect();
        let f_reflect = f(&reflect);

        if f_reflect < values[best] {
            // Try expanding further along the same direction.
            let expand: Vec<f64> = centroid
                .iter()
                .zip(simplex[worst].iter())
                .map(|(&c, &w)| c + 2.0 * (c - w))
                .collect();
            let f_expand = f(&expand);
            if f_expand < f_reflect {
                simplex[worst] = expand;
                values[worst] = f_expand;
            } else {
                simplex[worst] = reflect;
                values[worst] = f_reflect;
            }
        } else if f_reflect < values[second_worst] {
            simplex[worst] = reflect;
            values[worst] = f_reflect;
        } else {
            let contract: Vec<f64> = centroid
                .iter()
                .zip(simplex[worst].iter())
                .map(|(&c, &w)| c + 0.5 * (w - c))
                .collect();
            let f_contract = f(&contract);
            if f_contract < values[worst] {
                simplex[worst] = contract;
                values[worst] = f_contract;
            } else {
                // Shrink every point toward the best.
                let best_point = simplex[best].clone();
                for (idx, p) in simplex.iter_mut().enumerate() {
                    if idx == best {
                        continue;
                    }
                    for (v, &b) in p.iter_mut().zip(best_point.iter()) {
                        *v = b + 0.5 * (*v - b);
                    }
                    values[idx] = f(p);
                }
            }
        }
    }

    let mut best_idx = 0;
    for (idx, &v) in values.iter().enumerate() {
        if v < values[best_idx] {
            best_idx = idx;
        }
    }
    (
        simplex.swap_remove(best_idx),
        values[best_idx],
        iterations,
        converged,
    )
}
