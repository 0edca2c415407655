//! 1D NMR spectral processing core.
//!
//! Numeric pipeline for preparing spectra for multivariate statistical
//! analysis: phase/baseline correction by entropy or least-squares
//! minimization, noise estimation, segment location, cross-correlation
//! alignment against a reference spectrum, and bucket integration with
//! constant-sum normalization.
//!
//! The crate works on caller-supplied in-memory buffers and holds no state
//! between calls; raw-data loading, persistence, and reporting live outside
//! it. Matrix-wide passes run row-parallel via rayon, with the reference
//! spectrum and bucket definitions as the only shared (read-only) inputs.

pub mod data;
pub mod error;
pub mod pipeline;

pub use data::{BucketDef, BucketTable, PpmAxis, RowStatus, Segment, Spectrum, SpectrumMatrix};
pub use error::{ProcessError, Result};

pub use pipeline::align::{align_segments, compute_shifts, ShiftResult, DEFAULT_MIN_CORRELATION};
pub use pipeline::binning::{aibin_buckets, AibinConfig};
pub use pipeline::filters::{derivative1, derivative_matrix, lowpass, sdl, smooth, windowed_mean};
pub use pipeline::integrate::{
    integrate, integrate_all_buckets, integrate_buckets, integrate_matrix, max_value_per_bucket,
    normalize_csn, ppm_of_max_per_bucket, IntegrationMode,
};
pub use pipeline::noise::{estimate_noise, estimate_sd, NoiseEstimate, NoiseMethod};
pub use pipeline::phase::{
    apply_phase, correct_phase_baseline, Objective, PhaseConfig, PhaseCorrection,
};
pub use pipeline::reference::{mean_spectrum, mean_spectrum_interval, median_spectrum};
pub use pipeline::segment::{estimate_local_baseline, fit_line_baseline, global_segments};
