//! Reporting utilities: residual statistics and formatted terminal output.

use ndarray::ArrayViewD;

use crate::domain::{CoordinateGrid, GaussianParams};
use crate::error::FitError;
use crate::models::evaluate;

pub mod format;

pub use format::*;

/// Summary of `samples − model` over a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualStats {
    pub n: usize,
    pub sse: f64,
    pub rms: f64,
    pub max_abs: f64,
}

/// Compare `samples` against the Gaussian `params` on `grid`.
pub fn compute_residuals(
    samples: ArrayViewD<'_, f64>,
    grid: &CoordinateGrid,
    params: &GaussianParams,
) -> Result<ResidualStats, FitError> {
    if samples.is_empty() {
        return Err(FitError::EmptySamples);
    }
    grid.check_samples(samples.shape())?;

    let model = evaluate(grid, params);
    let mut sse = 0.0;
    let mut max_abs: f64 = 0.0;
    for (&y, &m) in samples.iter().zip(model.iter()) {
        let r = y - m;
        sse += r * r;
        max_abs = max_abs.max(r.abs());
    }
    let n = samples.len();
    Ok(ResidualStats {
        n,
        sse,
        rms: (sse / n as f64).sqrt(),
        max_abs,
    })
}
