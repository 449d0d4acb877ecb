//! Levenberg–Marquardt nonlinear least squares.
//!
//! Minimizes `Σ r_k(p)²` for a problem that supplies residuals and an analytic
//! Jacobian. Each iteration solves the damped normal equations
//!
//! ```text
//! (JᵀJ + λ·D²) δ = Jᵀr,    p ← p − δ
//! ```
//!
//! where `D²` is the running maximum of `diag(JᵀJ)` (scale invariance). λ shrinks
//! after an accepted step and grows after a rejected one.
//!
//! Termination follows the MINPACK status convention (0..=8) so callers can accept
//! 1..=4 and reject the rest:
//!
//! - 1: actual and predicted relative reductions of the cost are below `ftol`
//! - 2: relative (scaled) step is below `xtol`
//! - 3: both 1 and 2
//! - 4: residuals orthogonal to the Jacobian columns within `gtol` (includes zero residual)
//! - 5: evaluation cap reached
//! - 6/7/8: `ftol`/`xtol`/`gtol` too small for machine precision
//! - 0: improper input

use std::fmt;

use log::debug;
use nalgebra::{DMatrix, DVector};

/// Damping beyond this means no descent direction can be found.
const LAMBDA_MAX: f64 = 1e16;

/// A least-squares problem with `residual_count()` residuals.
pub trait LeastSquaresProblem {
    fn residual_count(&self) -> usize;

    /// Fill `out` with the residual vector at `params`.
    fn residuals(&self, params: &DVector<f64>, out: &mut DVector<f64>);

    /// Fill `out` (residual_count × params.len()) with `∂r_k/∂p_j`.
    fn jacobian(&self, params: &DVector<f64>, out: &mut DMatrix<f64>);
}

/// Solver configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LmConfig {
    /// Maximum number of residual evaluations, including the initial one.
    pub max_evaluations: usize,
    /// Relative tolerance on the reduction of the sum of squares.
    pub ftol: f64,
    /// Relative tolerance on the scaled parameter step.
    pub xtol: f64,
    /// Tolerance on the cosine between the residuals and any Jacobian column.
    pub gtol: f64,
    /// Initial damping.
    pub initial_lambda: f64,
    /// Factor applied to λ after a rejected step.
    pub lambda_up: f64,
    /// Factor applied to λ after an accepted step.
    pub lambda_down: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_evaluations: 2000,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 0.0,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
        }
    }
}

impl LmConfig {
    /// Check the configuration; returns a reason when it is unusable.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_evaluations == 0 {
            return Err("max_evaluations must be > 0".to_string());
        }
        for (name, tol) in [("ftol", self.ftol), ("xtol", self.xtol), ("gtol", self.gtol)] {
            if !(tol.is_finite() && tol >= 0.0) {
                return Err(format!("{name} must be finite and >= 0 (got {tol})"));
            }
        }
        if !(self.initial_lambda.is_finite() && self.initial_lambda > 0.0) {
            return Err(format!("initial_lambda must be > 0 (got {})", self.initial_lambda));
        }
        if !(self.lambda_up.is_finite() && self.lambda_up > 1.0) {
            return Err(format!("lambda_up must be > 1 (got {})", self.lambda_up));
        }
        if !(self.lambda_down > 0.0 && self.lambda_down < 1.0) {
            return Err(format!("lambda_down must be in (0, 1) (got {})", self.lambda_down));
        }
        Ok(())
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    ImproperInput,
    CostConverged,
    StepConverged,
    CostAndStepConverged,
    GradientConverged,
    EvaluationLimit,
    CostToleranceTooSmall,
    StepToleranceTooSmall,
    GradientToleranceTooSmall,
}

impl SolverStatus {
    /// MINPACK-style status code.
    pub fn code(self) -> u8 {
        match self {
            SolverStatus::ImproperInput => 0,
            SolverStatus::CostConverged => 1,
            SolverStatus::StepConverged => 2,
            SolverStatus::CostAndStepConverged => 3,
            SolverStatus::GradientConverged => 4,
            SolverStatus::EvaluationLimit => 5,
            SolverStatus::CostToleranceTooSmall => 6,
            SolverStatus::StepToleranceTooSmall => 7,
            SolverStatus::GradientToleranceTooSmall => 8,
        }
    }

    /// Only statuses 1..=4 count as convergence.
    pub fn is_success(self) -> bool {
        (1..=4).contains(&self.code())
    }

    pub fn message(self) -> &'static str {
        match self {
            SolverStatus::ImproperInput => "Improper input parameters.",
            SolverStatus::CostConverged => {
                "Both actual and predicted relative reductions in the sum of squares are at most ftol."
            }
            SolverStatus::StepConverged => {
                "The relative error between two consecutive iterates is at most xtol."
            }
            SolverStatus::CostAndStepConverged => {
                "Both actual and predicted relative reductions in the sum of squares are at most ftol and the relative error between two consecutive iterates is at most xtol."
            }
            SolverStatus::GradientConverged => {
                "The cosine of the angle between the residuals and any column of the Jacobian is at most gtol in absolute value."
            }
            SolverStatus::EvaluationLimit => {
                "Number of calls to the residual function has reached max_evaluations."
            }
            SolverStatus::CostToleranceTooSmall => {
                "ftol is too small. No further reduction in the sum of squares is possible."
            }
            SolverStatus::StepToleranceTooSmall => {
                "xtol is too small. No further improvement in the approximate solution is possible."
            }
            SolverStatus::GradientToleranceTooSmall => {
                "gtol is too small. The residuals are orthogonal to the Jacobian columns to machine precision."
            }
        }
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.message())
    }
}

/// Everything the solver knows when it stops.
#[derive(Debug, Clone)]
pub struct SolverReport {
    pub params: DVector<f64>,
    /// Residual vector at `params`.
    pub residuals: DVector<f64>,
    /// Jacobian at `params`.
    pub jacobian: DMatrix<f64>,
    /// Sum of squared residuals at `params`.
    pub cost: f64,
    pub status: SolverStatus,
    pub evaluations: usize,
    pub jacobian_evaluations: usize,
    pub iterations: usize,
    /// Damping at termination.
    pub lambda: f64,
    /// Unscaled covariance `(JᵀJ)⁻¹` at `params`, when it exists.
    pub covariance: Option<DMatrix<f64>>,
}

/// Run Levenberg–Marquardt from `initial`.
pub fn minimize<P: LeastSquaresProblem>(
    problem: &P,
    initial: DVector<f64>,
    config: &LmConfig,
) -> SolverReport {
    let n = initial.len();
    let m = problem.residual_count();
    let mut params = initial;
    let mut residuals = DVector::<f64>::zeros(m);
    let mut jacobian = DMatrix::<f64>::zeros(m, n);

    if let Err(reason) = config.validate() {
        debug!("lm: rejecting configuration: {reason}");
        return improper(params, residuals, jacobian);
    }
    if n == 0 || m < n {
        debug!("lm: {m} residual(s) cannot determine {n} parameter(s)");
        return improper(params, residuals, jacobian);
    }

    problem.residuals(&params, &mut residuals);
    let mut evaluations = 1;
    let mut cost = residuals.norm_squared();
    if !cost.is_finite() {
        debug!("lm: initial cost is not finite");
        return improper(params, residuals, jacobian);
    }

    let mut lambda = config.initial_lambda;
    let mut scale = DVector::<f64>::zeros(n);
    let mut trial = DVector::<f64>::zeros(m);
    let mut jacobian_evaluations = 0;
    let mut iterations = 0;

    let status = 'outer: loop {
        problem.jacobian(&params, &mut jacobian);
        jacobian_evaluations += 1;
        iterations += 1;

        let gradient = jacobian.tr_mul(&residuals);
        let normal = jacobian.tr_mul(&jacobian);

        let gnorm = gradient_cosine(&jacobian, &gradient, cost.sqrt());
        if gnorm <= config.gtol {
            break SolverStatus::GradientConverged;
        }

        for j in 0..n {
            let d = normal[(j, j)];
            scale[j] = if d > scale[j] {
                d
            } else if scale[j] > 0.0 {
                scale[j]
            } else {
                1.0
            };
        }

        loop {
            let mut damped = normal.clone();
            for j in 0..n {
                damped[(j, j)] += lambda * scale[j];
            }
            let Some(chol) = damped.cholesky() else {
                lambda *= config.lambda_up;
                if lambda > LAMBDA_MAX {
                    break 'outer SolverStatus::CostToleranceTooSmall;
                }
                continue;
            };

            // The cap bounds residual evaluations, so check before spending one.
            if evaluations >= config.max_evaluations {
                break 'outer SolverStatus::EvaluationLimit;
            }
            let step = chol.solve(&gradient);
            let candidate = &params - &step;
            problem.residuals(&candidate, &mut trial);
            evaluations += 1;
            let trial_cost = trial.norm_squared();

            let step_norm = scaled_norm(&step, &scale);
            let predicted = ((&jacobian * &step).norm_squared()
                + 2.0 * lambda * step_norm * step_norm)
                / cost;
            let actual = if trial_cost.is_finite() {
                1.0 - trial_cost / cost
            } else {
                -1.0
            };
            let ratio = if predicted > 0.0 { actual / predicted } else { 0.0 };

            let accepted = trial_cost < cost;
            if accepted {
                params = candidate;
                std::mem::swap(&mut residuals, &mut trial);
                cost = trial_cost;
                lambda = (lambda * config.lambda_down).max(f64::MIN_POSITIVE);
            } else {
                lambda *= config.lambda_up;
            }
            let param_norm = scaled_norm(&params, &scale);

            debug!(
                "lm iter {iterations}: cost={cost:.6e} lambda={lambda:.3e} step={step_norm:.3e} accepted={accepted}"
            );

            let cost_ok = actual.abs() <= config.ftol && predicted <= config.ftol && 0.5 * ratio <= 1.0;
            let step_ok = step_norm <= config.xtol * param_norm;
            match (cost_ok, step_ok) {
                (true, true) => break 'outer SolverStatus::CostAndStepConverged,
                (true, false) => break 'outer SolverStatus::CostConverged,
                (false, true) => break 'outer SolverStatus::StepConverged,
                (false, false) => {}
            }

            if actual.abs() <= f64::EPSILON && predicted <= f64::EPSILON && 0.5 * ratio <= 1.0 {
                break 'outer SolverStatus::CostToleranceTooSmall;
            }
            if step_norm <= f64::EPSILON * param_norm {
                break 'outer SolverStatus::StepToleranceTooSmall;
            }
            if gnorm <= f64::EPSILON {
                break 'outer SolverStatus::GradientToleranceTooSmall;
            }

            if accepted {
                break;
            }
            if lambda > LAMBDA_MAX {
                break 'outer SolverStatus::CostToleranceTooSmall;
            }
        }
    };

    problem.jacobian(&params, &mut jacobian);
    jacobian_evaluations += 1;
    let covariance = covariance(&jacobian);

    debug!(
        "lm finished: status={} cost={cost:.6e} evaluations={evaluations} iterations={iterations}",
        status.code()
    );

    SolverReport {
        params,
        residuals,
        jacobian,
        cost,
        status,
        evaluations,
        jacobian_evaluations,
        iterations,
        lambda,
        covariance,
    }
}

/// Unscaled covariance `(JᵀJ)⁻¹`, or `None` when `JᵀJ` is not positive definite.
pub fn covariance(jacobian: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let normal = jacobian.tr_mul(jacobian);
    let inverse = normal.cholesky()?.inverse();
    inverse.iter().all(|v| v.is_finite()).then_some(inverse)
}

fn improper(params: DVector<f64>, residuals: DVector<f64>, jacobian: DMatrix<f64>) -> SolverReport {
    SolverReport {
        params,
        residuals,
        jacobian,
        cost: f64::NAN,
        status: SolverStatus::ImproperInput,
        evaluations: 0,
        jacobian_evaluations: 0,
        iterations: 0,
        lambda: 0.0,
        covariance: None,
    }
}

/// Largest |cosine| between the residual vector and a Jacobian column.
fn gradient_cosine(jacobian: &DMatrix<f64>, gradient: &DVector<f64>, fnorm: f64) -> f64 {
    if fnorm == 0.0 {
        return 0.0;
    }
    jacobian
        .column_iter()
        .zip(gradient.iter())
        .map(|(col, g)| {
            let cn = col.norm();
            if cn == 0.0 { 0.0 } else { (g / (cn * fnorm)).abs() }
        })
        .fold(0.0, f64::max)
}

fn scaled_norm(v: &DVector<f64>, scale: &DVector<f64>) -> f64 {
    v.iter()
        .zip(scale.iter())
        .map(|(x, d)| d * x * x)
        .sum::<f64>()
        .sqrt()
}
