//! Deterministic synthetic inputs.
//!
//! Everything here is seeded (`StdRng::seed_from_u64`) so demo runs and tests are
//! reproducible.

use ndarray::{Array1, Array3, ArrayD};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{CoordinateGrid, GaussianParams};
use crate::error::FitError;
use crate::models::evaluate;

/// Noisy samples of a known Gaussian.
#[derive(Debug, Clone)]
pub struct GaussianSample {
    pub grid: CoordinateGrid,
    pub samples: ArrayD<f64>,
    pub truth: GaussianParams,
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    Array1::linspace(start, stop, n).to_vec()
}

/// `ndim` copies of the axis `start, start + step, ...` with `n` points.
pub fn regular_axes(ndim: usize, n: usize, start: f64, step: f64) -> Vec<Vec<f64>> {
    let axis: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
    vec![axis; ndim]
}

/// Evaluate `truth` on the mesh spanned by `axes` and add white noise of standard
/// deviation `noise`.
pub fn gaussian_sample(
    truth: &GaussianParams,
    axes: &[Vec<f64>],
    noise: f64,
    seed: u64,
) -> Result<GaussianSample, FitError> {
    if axes.len() != truth.ndim() || truth.center.len() != truth.ndim() {
        return Err(FitError::ShapeMismatch {
            context: "synthetic axes vs parameters",
            expected: vec![truth.ndim()],
            found: vec![axes.len()],
        });
    }
    let normal = noise_distribution(noise)?;
    let mut rng = StdRng::seed_from_u64(seed);

    let grid = CoordinateGrid::from_axes(axes);
    let mut samples = evaluate(&grid, truth);
    samples.mapv_inplace(|v| v + normal.sample(&mut rng));

    Ok(GaussianSample {
        grid,
        samples,
        truth: truth.clone(),
    })
}

/// Stack of `levels.len()` frames: `level × sky pattern + noise`.
///
/// The sky pattern is a gentle gradient shared by every frame, so after
/// normalization all frames agree up to noise.
pub fn frame_stack(
    levels: &[f64],
    rows: usize,
    cols: usize,
    noise: f64,
    seed: u64,
) -> Result<Array3<f64>, FitError> {
    let normal = noise_distribution(noise)?;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut stack = Array3::<f64>::zeros((levels.len(), rows, cols));
    for ((f, r, c), v) in stack.indexed_iter_mut() {
        *v = levels[f] * sky_pattern(r, c, rows, cols) + normal.sample(&mut rng);
    }
    Ok(stack)
}

fn sky_pattern(r: usize, c: usize, rows: usize, cols: usize) -> f64 {
    let fy = r as f64 / rows.max(1) as f64;
    let fx = c as f64 / cols.max(1) as f64;
    1.0 + 0.1 * fy - 0.05 * fx
}

fn noise_distribution(noise: f64) -> Result<Normal<f64>, FitError> {
    if !(noise.is_finite() && noise >= 0.0) {
        return Err(FitError::InvalidOptions(format!(
            "noise must be finite and >= 0 (got {noise})"
        )));
    }
    Normal::new(0.0, noise).map_err(|e| FitError::InvalidOptions(format!("Noise distribution error: {e}")))
}
