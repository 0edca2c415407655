pub mod align;
pub mod binning;
pub mod filters;
pub mod integrate;
pub mod noise;
pub mod phase;
pub mod reference;
pub mod segment;


/// Synthetic-signal builders shared by the module tests.
#[cfg(test)]
pub(crate) mod testutil {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// Reproducible Gaussian noise (Box-Muller over a seeded ChaCha stream).
    pub fn gaussian_noise(n: usize, sigma: f64, seed: u64) -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let u1: f64 = rng.gen_range(1e-12..1.0);
                let u2: f64 = rng.gen_range(0.0..1.0);
                sigma * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
            })
            .collect()
    }

    /// Add a Gaussian peak of the given amplitude and width (in samples).
    pub fn add_gaussian_peak(signal: &mut [f64], center: usize, amplitude: f64, width: f64) {
        for (i, v) in signal.iter_mut().enumerate() {
            let d = i as f64 - center as f64;
            *v += amplitude * (-d * d / (2.0 * width * width)).exp();
        }
    }
}
