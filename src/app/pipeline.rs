//! Shared pipeline logic behind the `gfit` subcommands.
//!
//! Keeping this separate from printing keeps the workflows testable:
//! - fit: synthetic sample -> guess -> least-squares fit -> residuals
//! - combine: synthetic sky stack -> normalized median -> sky subtraction -> star fit

use ndarray::{Array2, Axis, Ix2};

use crate::combine::{denormalize_and_subtract, normalize_and_combine};
use crate::data::{GaussianSample, frame_stack, gaussian_sample, regular_axes};
use crate::domain::{CombineConfig, Combined, CoordinateGrid, FitConfig, GaussianFit, GaussianParams};
use crate::error::AppError;
use crate::fit::{FitOptions, fit_gaussian, guess_params};
use crate::models::evaluate;
use crate::report::{ResidualStats, compute_residuals};

/// All computed outputs of a single `gfit fit` run.
#[derive(Debug, Clone)]
pub struct FitRun {
    pub sample: GaussianSample,
    pub guess: GaussianParams,
    /// `None` when only the guess was requested.
    pub fit: Option<(GaussianFit, ResidualStats)>,
}

/// All computed outputs of a single `gfit combine` run.
#[derive(Debug, Clone)]
pub struct CombineRun {
    pub combined: Combined,
    pub subtracted: Array2<f64>,
    pub star: GaussianFit,
    pub star_stats: ResidualStats,
}

/// Generate the sample described by `config` and fit it.
pub fn run_fit(config: &FitConfig) -> Result<FitRun, AppError> {
    let ndim = config.truth.ndim();
    let axes = regular_axes(ndim, config.samples_per_axis, config.axis_start, config.axis_step);
    let sample = gaussian_sample(&config.truth, &axes, config.noise, config.seed)?;

    let guess = guess_params(sample.samples.view(), Some(&sample.grid))?;
    if config.guess_only {
        return Ok(FitRun {
            sample,
            guess,
            fit: None,
        });
    }

    let fit = fit_gaussian(
        sample.samples.view(),
        Some(&sample.grid),
        Some(&guess),
        &config.options,
        true,
    )?;
    let stats = compute_residuals(sample.samples.view(), &sample.grid, &fit.params)?;

    Ok(FitRun {
        sample,
        guess,
        fit: Some((fit, stats)),
    })
}

/// Combine the synthetic sky stack, clean an object frame with it and fit the star.
pub fn run_combine(config: &CombineConfig) -> Result<CombineRun, AppError> {
    let sky = frame_stack(&config.levels, config.rows, config.cols, config.noise, config.seed)?;
    let combined = normalize_and_combine(sky.view(), &config.region, config.final_correction)?;

    // The object frame shares the sky pattern and carries one star at its center.
    let mut object = frame_stack(
        &[config.object_level],
        config.rows,
        config.cols,
        config.noise,
        config.seed.wrapping_add(1),
    )?
    .index_axis_move(Axis(0), 0);
    let grid = CoordinateGrid::indices(&[config.rows, config.cols]);
    let star_truth = GaussianParams::new(
        vec![config.star_width; 2],
        vec![(config.rows / 2) as f64, (config.cols / 2) as f64],
        Some(config.star_height),
    );
    let star_image = evaluate(&grid, &star_truth)
        .into_dimensionality::<Ix2>()
        .map_err(|e| AppError::new(4, format!("Star image has unexpected shape: {e}")))?;
    object += &star_image;

    let subtracted = denormalize_and_subtract(object.view(), combined.frame.view(), &config.region)?;

    let samples = subtracted.view().into_dyn();
    let star = fit_gaussian(samples.view(), Some(&grid), None, &FitOptions::default(), true)?;
    let star_stats = compute_residuals(samples, &grid, &star.params)?;

    Ok(CombineRun {
        combined,
        subtracted,
        star,
        star_stats,
    })
}
