//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - maps them into run configurations
//! - runs the fit / combine pipelines
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{CombineArgs, Command, FitArgs};
use crate::domain::{CombineConfig, FitConfig, GaussianParams, Region};
use crate::error::AppError;
use crate::fit::{CovarianceScaling, FitOptions};
use crate::math::lm::LmConfig;

pub mod pipeline;

/// Entry point for the `gfit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Combine(args) => handle_combine(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args)?;
    let run = pipeline::run_fit(&config)?;

    println!("{}", crate::report::format_run_header(&config));

    let Some((fit, stats)) = &run.fit else {
        println!("{}", crate::report::format_guess(&run.guess));
        return Ok(());
    };
    println!("{}", crate::report::format_fit(fit, stats));

    if config.plot {
        let plot = crate::plot::render_profile_plot(
            run.sample.samples.view(),
            &run.sample.grid,
            &fit.params,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    if let Some(path) = &config.export {
        let report = crate::io::export::build_fit_report(fit, stats);
        crate::io::export::write_fit_json(path, &report)?;
        log::info!("wrote fit report to {}", path.display());
    }

    Ok(())
}

fn handle_combine(args: CombineArgs) -> Result<(), AppError> {
    let config = combine_config_from_args(&args);
    let run = pipeline::run_combine(&config)?;

    println!("{}", crate::report::format_combine(&config, &run.combined));
    println!("Star in sky-subtracted object frame:");
    println!("{}", crate::report::format_fit(&run.star, &run.star_stats));
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> Result<FitConfig, AppError> {
    if args.ndim == 0 {
        return Err(AppError::new(2, "--ndim must be at least 1."));
    }
    if args.samples < 2 {
        return Err(AppError::new(2, "--samples must be at least 2."));
    }
    if !(args.step.is_finite() && args.step > 0.0) {
        return Err(AppError::new(2, "--step must be a positive number."));
    }

    let widths = broadcast(&args.true_width, args.ndim, "--true-width")?;
    if widths.iter().any(|w| *w == 0.0 || !w.is_finite()) {
        return Err(AppError::new(2, "--true-width values must be finite and non-zero."));
    }
    let center = broadcast(&args.true_center, args.ndim, "--true-center")?;

    let solver = LmConfig {
        max_evaluations: args.max_evaluations,
        ftol: args.ftol,
        xtol: args.xtol,
        gtol: args.gtol,
        ..LmConfig::default()
    };
    solver
        .validate()
        .map_err(|reason| AppError::from(crate::error::FitError::InvalidOptions(reason)))?;

    Ok(FitConfig {
        truth: GaussianParams::new(widths, center, args.true_height),
        samples_per_axis: args.samples,
        axis_start: args.start,
        axis_step: args.step,
        noise: args.noise,
        seed: args.seed,
        guess_only: args.guess_only,
        options: FitOptions {
            solver,
            covariance: if args.scaled {
                CovarianceScaling::ResidualVariance
            } else {
                CovarianceScaling::Unscaled
            },
        },
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export: args.export.clone(),
    })
}

pub fn combine_config_from_args(args: &CombineArgs) -> CombineConfig {
    CombineConfig {
        levels: args.levels.clone(),
        rows: args.rows,
        cols: args.cols,
        noise: args.noise,
        seed: args.seed,
        region: Region::new((args.y1, args.x1), (args.y2, args.x2)),
        final_correction: args.final_correction,
        object_level: args.object_level,
        star_height: args.star_height,
        star_width: args.star_width,
    }
}

/// One value for every axis, or exactly `ndim` values.
fn broadcast(values: &[f64], ndim: usize, flag: &str) -> Result<Vec<f64>, AppError> {
    match values.len() {
        1 => Ok(vec![values[0]; ndim]),
        n if n == ndim => Ok(values.to_vec()),
        n => Err(AppError::new(
            2,
            format!("{flag} takes 1 or {ndim} value(s), got {n}."),
        )),
    }
}
