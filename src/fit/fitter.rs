//! Least-squares refinement of a Gaussian guess.
//!
//! Given:
//! - samples on an N-dimensional grid
//! - an initial guess (or one from the guesser)
//!
//! we minimize `Σ (model(x_k; p) − y_k)²` over the flat parameter vector
//! `[widths.., centers.., height]` with Levenberg–Marquardt and turn the
//! covariance at the solution into standard errors.

use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use ndarray::ArrayViewD;

use crate::domain::{CoordinateGrid, GaussianFit, GaussianParams};
use crate::error::FitError;
use crate::fit::guess::guess_params;
use crate::math::lm::{LeastSquaresProblem, LmConfig, minimize};
use crate::models::value_and_gradient;

/// How the covariance `(JᵀJ)⁻¹` is scaled before taking standard errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CovarianceScaling {
    /// Use the solver's `(JᵀJ)⁻¹` as is (samples in units of their uncertainty).
    #[default]
    Unscaled,
    /// Multiply by the residual variance `SSE / (m − n)`.
    ResidualVariance,
}

/// Options for a single Gaussian fit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitOptions {
    /// Tolerances, evaluation cap and damping schedule.
    pub solver: LmConfig,
    pub covariance: CovarianceScaling,
}

/// Fit a separable Gaussian to `samples`.
///
/// - `grid = None` uses sample indices as coordinates.
/// - `guess = None` runs the guesser; a guess without height gets its normalized
///   height made explicit, so the fitted height is always present.
/// - `with_diagnostics` keeps the full solver report on the result.
pub fn fit_gaussian(
    samples: ArrayViewD<'_, f64>,
    grid: Option<&CoordinateGrid>,
    guess: Option<&GaussianParams>,
    options: &FitOptions,
    with_diagnostics: bool,
) -> Result<GaussianFit, FitError> {
    if samples.is_empty() {
        return Err(FitError::EmptySamples);
    }
    let ndim = samples.ndim();

    let owned_grid;
    let grid = match grid {
        Some(g) => {
            g.check_samples(samples.shape())?;
            g
        }
        None => {
            owned_grid = CoordinateGrid::indices(samples.shape());
            &owned_grid
        }
    };

    let guess = match guess {
        Some(g) => {
            if g.widths.len() != ndim || g.center.len() != ndim {
                return Err(FitError::ShapeMismatch {
                    context: "guess widths/center vs sample rank",
                    expected: vec![ndim, ndim],
                    found: vec![g.widths.len(), g.center.len()],
                });
            }
            g.with_explicit_height()
        }
        None => guess_params(samples.view(), Some(grid))?,
    };

    let problem = GaussianProblem::new(grid, &samples);
    let report = minimize(&problem, DVector::from_vec(guess.to_flat()), &options.solver);

    if !report.status.is_success() {
        warn!(
            "fit failed after {} evaluation(s): status {}",
            report.evaluations, report.status
        );
        return Err(FitError::Convergence {
            status: report.status.code(),
            message: report.status.message().to_string(),
            guess,
        });
    }

    let params = GaussianParams::from_flat(ndim, report.params.as_slice())?;
    let Some(covariance) = report.covariance.as_ref() else {
        warn!("fit converged but JᵀJ is singular at {params}");
        return Err(FitError::SingularCovariance { params });
    };

    let m = problem.residual_count();
    let n = report.params.len();
    let factor = match options.covariance {
        CovarianceScaling::Unscaled => 1.0,
        CovarianceScaling::ResidualVariance if m > n => report.cost / (m - n) as f64,
        // No degrees of freedom left: the errors are unbounded.
        CovarianceScaling::ResidualVariance => f64::INFINITY,
    };
    let errors: Vec<f64> = (0..n)
        .map(|j| (covariance[(j, j)] * factor).sqrt())
        .collect();

    info!(
        "fit converged: {params} (status {}, {} evaluation(s), cost {:.6e})",
        report.status.code(),
        report.evaluations,
        report.cost
    );

    Ok(GaussianFit {
        params,
        errors,
        guess,
        diagnostics: with_diagnostics.then_some(report),
    })
}

/// Residuals `model − samples` over every grid point.
struct GaussianProblem {
    ndim: usize,
    /// Point-major coordinates: point `k` is `coords[k·ndim .. (k+1)·ndim]`.
    coords: Vec<f64>,
    observed: Vec<f64>,
}

impl GaussianProblem {
    fn new(grid: &CoordinateGrid, samples: &ArrayViewD<'_, f64>) -> Self {
        let ndim = grid.ndim();
        let m = samples.len();
        let mut coords = vec![0.0; m * ndim];
        for i in 0..ndim {
            for (k, &x) in grid.axis(i).iter().enumerate() {
                coords[k * ndim + i] = x;
            }
        }
        Self {
            ndim,
            coords,
            observed: samples.iter().copied().collect(),
        }
    }

    fn point(&self, k: usize) -> &[f64] {
        &self.coords[k * self.ndim..(k + 1) * self.ndim]
    }
}

impl LeastSquaresProblem for GaussianProblem {
    fn residual_count(&self) -> usize {
        self.observed.len()
    }

    fn residuals(&self, params: &DVector<f64>, out: &mut DVector<f64>) {
        let mut grad = vec![0.0; params.len()];
        for (k, &y) in self.observed.iter().enumerate() {
            out[k] = value_and_gradient(self.point(k), params.as_slice(), &mut grad) - y;
        }
    }

    fn jacobian(&self, params: &DVector<f64>, out: &mut DMatrix<f64>) {
        let mut grad = vec![0.0; params.len()];
        for k in 0..self.observed.len() {
            value_and_gradient(self.point(k), params.as_slice(), &mut grad);
            for (j, &g) in grad.iter().enumerate() {
                out[(k, j)] = g;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{gaussian_sample, linspace, regular_axes};
    use crate::models::evaluate;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::{Array1, Axis};

    #[test]
    fn noise_free_1d_fit_is_exact() {
        let grid = CoordinateGrid::from_axis(&linspace(-10.0, 10.0, 201));
        let truth = GaussianParams::new(vec![1.3], vec![0.4], Some(2.5));
        let y = evaluate(&grid, &truth);

        let fit = fit_gaussian(y.view(), Some(&grid), None, &FitOptions::default(), false).unwrap();
        assert_relative_eq!(fit.params.widths[0], 1.3, max_relative = 1e-6);
        assert_abs_diff_eq!(fit.params.center[0], 0.4, epsilon = 1e-6);
        assert_relative_eq!(fit.params.height.unwrap(), 2.5, max_relative = 1e-6);
        assert_eq!(fit.errors.len(), 3);
        assert!(fit.diagnostics.is_none());
    }

    #[test]
    fn noise_free_2d_fit_is_exact() {
        let axes = regular_axes(2, 41, -20.0, 1.0);
        let grid = CoordinateGrid::from_axes(&axes);
        let truth = GaussianParams::new(vec![3.0, 5.0], vec![2.0, -1.0], Some(4.0));
        let y = evaluate(&grid, &truth);

        let fit = fit_gaussian(y.view(), Some(&grid), None, &FitOptions::default(), false).unwrap();
        for (got, want) in fit.params.to_flat().iter().zip(truth.to_flat()) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-6);
        }
    }

    #[test]
    fn noisy_fit_lands_within_standard_errors() {
        let truth = GaussianParams::new(vec![2.0], vec![0.5], Some(1.0));
        let sample = gaussian_sample(&truth, &[linspace(-10.0, 10.0, 201)], 0.02, 7).unwrap();

        let opts = FitOptions {
            covariance: CovarianceScaling::ResidualVariance,
            ..FitOptions::default()
        };
        let fit = fit_gaussian(sample.samples.view(), Some(&sample.grid), None, &opts, false).unwrap();

        let got = fit.params.to_flat();
        for ((g, t), e) in got.iter().zip(truth.to_flat()).zip(&fit.errors) {
            assert!(e.is_finite() && *e > 0.0, "error {e}");
            assert!((g - t).abs() < 5.0 * e, "{g} vs {t} ± {e}");
        }
    }

    #[test]
    fn normalized_guess_gets_explicit_height() {
        let grid = CoordinateGrid::from_axis(&linspace(-6.0, 6.0, 121));
        let truth = GaussianParams::new(vec![0.9], vec![-0.3], None);
        let y = evaluate(&grid, &truth);
        let guess = GaussianParams::new(vec![1.2], vec![0.0], None);

        let fit = fit_gaussian(y.view(), Some(&grid), Some(&guess), &FitOptions::default(), false)
            .unwrap();
        assert_eq!(fit.guess.height, Some(guess.height_or_normalized()));
        assert_relative_eq!(
            fit.params.height.unwrap(),
            truth.height_or_normalized(),
            max_relative = 1e-6
        );
    }

    #[test]
    fn flat_and_explicit_grids_give_same_fit() {
        let xs = linspace(-5.0, 5.0, 101);
        let flat = CoordinateGrid::new(Array1::from(xs.clone()).into_dyn()).unwrap();
        let explicit =
            CoordinateGrid::new(Array1::from(xs).insert_axis(Axis(0)).into_dyn()).unwrap();
        let truth = GaussianParams::new(vec![0.8], vec![1.1], Some(2.0));
        let sample = gaussian_sample(&truth, &[linspace(-5.0, 5.0, 101)], 0.01, 3).unwrap();

        let opts = FitOptions::default();
        let a = fit_gaussian(sample.samples.view(), Some(&flat), None, &opts, false).unwrap();
        let b = fit_gaussian(sample.samples.view(), Some(&explicit), None, &opts, false).unwrap();
        assert_eq!(a.params, b.params);
        assert_eq!(a.errors, b.errors);
    }

    #[test]
    fn evaluation_cap_fails_with_guess() {
        let grid = CoordinateGrid::from_axis(&linspace(-10.0, 10.0, 201));
        let y = evaluate(&grid, &GaussianParams::new(vec![1.0], vec![0.0], Some(1.0)));
        let guess = GaussianParams::new(vec![2.0], vec![1.5], Some(1.0));
        let opts = FitOptions {
            solver: LmConfig {
                max_evaluations: 1,
                ..LmConfig::default()
            },
            ..FitOptions::default()
        };

        match fit_gaussian(y.view(), Some(&grid), Some(&guess), &opts, false) {
            Err(FitError::Convergence { status, guess: g, .. }) => {
                assert_eq!(status, 5);
                assert_eq!(g, guess);
            }
            other => panic!("expected convergence failure, got {other:?}"),
        }
    }

    #[test]
    fn invalid_tolerance_is_status_zero() {
        let grid = CoordinateGrid::from_axis(&linspace(-3.0, 3.0, 31));
        let y = evaluate(&grid, &GaussianParams::new(vec![1.0], vec![0.0], Some(1.0)));
        let opts = FitOptions {
            solver: LmConfig {
                xtol: -1.0,
                ..LmConfig::default()
            },
            ..FitOptions::default()
        };
        assert!(matches!(
            fit_gaussian(y.view(), Some(&grid), None, &opts, false),
            Err(FitError::Convergence { status: 0, .. })
        ));
    }

    #[test]
    fn default_errors_come_from_unscaled_covariance() {
        let truth = GaussianParams::new(vec![2.0], vec![0.5], Some(1.0));
        let sample = gaussian_sample(&truth, &[linspace(-10.0, 10.0, 201)], 0.02, 7).unwrap();
        let fit = fit_gaussian(
            sample.samples.view(),
            Some(&sample.grid),
            None,
            &FitOptions::default(),
            true,
        )
        .unwrap();

        let report = fit.diagnostics.as_ref().unwrap();
        let cov = report.covariance.as_ref().unwrap();
        assert_eq!(fit.errors.len(), 3);
        for (j, e) in fit.errors.iter().enumerate() {
            assert_relative_eq!(*e, cov[(j, j)].sqrt(), max_relative = 1e-12);
        }
        // Unit-variance weighting: far wider than the 0.02 noise would suggest.
        assert!(fit.errors[0] > 0.1, "width error {}", fit.errors[0]);
    }

    #[test]
    fn scaled_errors_differ_by_residual_variance() {
        let truth = GaussianParams::new(vec![1.5], vec![-0.5], Some(3.0));
        let sample = gaussian_sample(&truth, &[linspace(-8.0, 8.0, 161)], 0.05, 19).unwrap();
        let scaled = fit_gaussian(
            sample.samples.view(),
            Some(&sample.grid),
            None,
            &FitOptions {
                covariance: CovarianceScaling::ResidualVariance,
                ..FitOptions::default()
            },
            true,
        )
        .unwrap();
        let unscaled = fit_gaussian(
            sample.samples.view(),
            Some(&sample.grid),
            None,
            &FitOptions::default(),
            false,
        )
        .unwrap();

        let report = scaled.diagnostics.as_ref().unwrap();
        assert!(report.status.is_success());
        assert_eq!(report.residuals.len(), 161);
        let variance = report.cost / (161.0 - 3.0);
        for (s, u) in scaled.errors.iter().zip(&unscaled.errors) {
            assert_relative_eq!(*s, u * variance.sqrt(), max_relative = 1e-9);
        }
    }

    #[test]
    fn guess_rank_must_match_samples() {
        let y = evaluate(
            &CoordinateGrid::indices(&[20]),
            &GaussianParams::new(vec![2.0], vec![10.0], Some(1.0)),
        );
        let guess = GaussianParams::isotropic(2, 2.0, 10.0, Some(1.0));
        assert!(matches!(
            fit_gaussian(y.view(), None, Some(&guess), &FitOptions::default(), false),
            Err(FitError::ShapeMismatch { .. })
        ));

        let grid = CoordinateGrid::indices(&[21]);
        assert!(matches!(
            fit_gaussian(y.view(), Some(&grid), None, &FitOptions::default(), false),
            Err(FitError::ShapeMismatch { .. })
        ));
    }
}
