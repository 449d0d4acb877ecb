//! Command-line parsing for the `gfit` demo binary.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting/combination code. Both subcommands run on seeded synthetic data.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "gfit", version, about = "N-dimensional Gaussian fitting and normalized frame combination")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a Gaussian to noisy synthetic samples and report parameters ± errors.
    Fit(FitArgs),
    /// Median-combine synthetic sky frames, subtract the sky from an object frame
    /// and fit the star left behind.
    Combine(CombineArgs),
}

/// Options for `gfit fit`.
#[derive(Debug, Parser, Clone)]
#[command(allow_negative_numbers = true)]
pub struct FitArgs {
    /// Number of dimensions.
    #[arg(long, default_value_t = 1)]
    pub ndim: usize,

    /// True widths (one value, or one per dimension; comma-separated).
    #[arg(long = "true-width", value_delimiter = ',', default_values_t = vec![1.5])]
    pub true_width: Vec<f64>,

    /// True center (one value, or one per dimension; comma-separated).
    #[arg(long = "true-center", value_delimiter = ',', default_values_t = vec![0.5])]
    pub true_center: Vec<f64>,

    /// True height. Omit for a normalized (unit-integral) Gaussian.
    #[arg(long = "true-height")]
    pub true_height: Option<f64>,

    /// Samples per axis.
    #[arg(short = 'n', long, default_value_t = 101)]
    pub samples: usize,

    /// First coordinate on every axis.
    #[arg(long, default_value_t = -10.0)]
    pub start: f64,

    /// Coordinate spacing on every axis.
    #[arg(long, default_value_t = 0.2)]
    pub step: f64,

    /// Standard deviation of the added white noise.
    #[arg(long, default_value_t = 0.005)]
    pub noise: f64,

    /// Random seed for sample generation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Only print the initial guess.
    #[arg(long)]
    pub guess_only: bool,

    /// Maximum number of model evaluations.
    #[arg(long, default_value_t = 2000)]
    pub max_evaluations: usize,

    /// Relative tolerance on the sum of squares.
    #[arg(long, default_value_t = 1.49012e-8)]
    pub ftol: f64,

    /// Relative tolerance on the parameter step.
    #[arg(long, default_value_t = 1.49012e-8)]
    pub xtol: f64,

    /// Orthogonality tolerance between residuals and Jacobian columns.
    #[arg(long, default_value_t = 0.0)]
    pub gtol: f64,

    /// Scale standard errors by the residual variance (for samples not in units of
    /// their uncertainty).
    #[arg(long)]
    pub scaled: bool,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the fit (params, errors, solver status) to JSON.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

/// Options for `gfit combine`.
#[derive(Debug, Parser, Clone)]
#[command(allow_negative_numbers = true)]
pub struct CombineArgs {
    /// Sky level of each synthetic frame (comma-separated).
    #[arg(long, value_delimiter = ',', default_values_t = vec![100.0, 120.0, 90.0, 110.0, 105.0])]
    pub levels: Vec<f64>,

    /// Frame rows.
    #[arg(long, default_value_t = 32)]
    pub rows: usize,

    /// Frame columns.
    #[arg(long, default_value_t = 32)]
    pub cols: usize,

    /// Standard deviation of the per-pixel noise.
    #[arg(long, default_value_t = 0.5)]
    pub noise: f64,

    /// Random seed for frame generation.
    #[arg(long, default_value_t = 7)]
    pub seed: u64,

    /// Normalization region: first row (negative counts from the end).
    #[arg(long)]
    pub y1: Option<isize>,

    /// Normalization region: first column.
    #[arg(long)]
    pub x1: Option<isize>,

    /// Normalization region: row bound (exclusive).
    #[arg(long)]
    pub y2: Option<isize>,

    /// Normalization region: column bound (exclusive).
    #[arg(long)]
    pub x2: Option<isize>,

    /// Divide the combined frame by its own median.
    #[arg(long)]
    pub final_correction: bool,

    /// Sky level of the object frame.
    #[arg(long, default_value_t = 95.0)]
    pub object_level: f64,

    /// Height of the star placed at the center of the object frame.
    #[arg(long, default_value_t = 50.0)]
    pub star_height: f64,

    /// Width of that star (pixels).
    #[arg(long, default_value_t = 1.5)]
    pub star_width: f64,
}
