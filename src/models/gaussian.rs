//! Separable N-dimensional Gaussian.
//!
//! `f(x) = h · exp(-½ Σ_i ((x_i - c_i) / w_i)²)`, a product of orthogonal 1D
//! Gaussians. When no height is given, `h = ∏_i 1/(w_i·√(2π))` so the function
//! integrates to 1.
//!
//! The fitter relies on two primitive operations:
//! - evaluate the model over a whole grid (for residuals and reports)
//! - value + partial derivatives at a single point (for the Jacobian)

use std::f64::consts::PI;

use ndarray::{Array1, ArrayD, IxDyn, Zip};

use crate::domain::{CoordinateGrid, GaussianParams};
use crate::error::FitError;

/// Height that makes a Gaussian with these widths integrate to 1.
pub fn normalized_height(widths: &[f64]) -> f64 {
    let r2pi = (2.0 * PI).sqrt();
    widths.iter().map(|w| 1.0 / (w * r2pi)).product()
}

/// Evaluate the Gaussian at every point of `grid`.
///
/// The result has the grid's sample shape.
pub fn evaluate(grid: &CoordinateGrid, params: &GaussianParams) -> ArrayD<f64> {
    let ndim = grid.ndim();
    debug_assert!(params.widths.len() >= ndim && params.center.len() >= ndim);

    let height = params.height_or_normalized();
    let mut ponent = ArrayD::<f64>::zeros(IxDyn(grid.sample_shape()));
    for i in 0..ndim {
        let (w, c) = (params.widths[i], params.center[i]);
        Zip::from(&mut ponent).and(grid.axis(i)).for_each(|acc, &x| {
            let u = (x - c) / w;
            *acc += u * u;
        });
    }
    ponent.mapv_into(|p| height * (-0.5 * p).exp())
}

/// Evaluate from a flattened parameter vector (`[widths.., centers.., (height)]`).
pub fn evaluate_flat(grid: &CoordinateGrid, flat: &[f64]) -> Result<ArrayD<f64>, FitError> {
    let params = GaussianParams::from_flat(grid.ndim(), flat)?;
    Ok(evaluate(grid, &params))
}

/// Evaluate a 1D Gaussian over flat abscissae; output has the same length as `xs`.
pub fn evaluate_axis(xs: &[f64], params: &GaussianParams) -> Array1<f64> {
    xs.iter().map(|&x| evaluate_point(&[x], params)).collect()
}

/// Evaluate at a single coordinate.
pub fn evaluate_point(x: &[f64], params: &GaussianParams) -> f64 {
    let mut ponent = 0.0;
    for (i, &xi) in x.iter().enumerate() {
        let u = (xi - params.center[i]) / params.widths[i];
        ponent += u * u;
    }
    params.height_or_normalized() * (-0.5 * ponent).exp()
}

/// Value and partial derivatives at `x` for the flat layout.
///
/// `grad` receives `∂f/∂p` in the same order as `flat`. With no height in `flat`
/// the normalization's dependence on the widths is included in `∂f/∂w_i`.
///
/// # Panics
/// Panics if `flat` is shorter than `2 * x.len()` or `grad` is shorter than `flat`.
pub fn value_and_gradient(x: &[f64], flat: &[f64], grad: &mut [f64]) -> f64 {
    let ndim = x.len();
    let widths = &flat[..ndim];
    let center = &flat[ndim..2 * ndim];
    let explicit_height = flat.get(2 * ndim).copied();
    let height = explicit_height.unwrap_or_else(|| normalized_height(widths));

    let mut ponent = 0.0;
    for i in 0..ndim {
        let u = (x[i] - center[i]) / widths[i];
        ponent += u * u;
    }
    let shape = (-0.5 * ponent).exp();
    let f = height * shape;

    for i in 0..ndim {
        let w = widths[i];
        let u = (x[i] - center[i]) / w;
        grad[i] = match explicit_height {
            Some(_) => f * u * u / w,
            None => f * (u * u - 1.0) / w,
        };
        grad[ndim + i] = f * u / w;
    }
    if explicit_height.is_some() {
        grad[2 * ndim] = shape;
    }
    f
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn centered_indices(n: usize, ndim: usize) -> CoordinateGrid {
        let axis: Vec<f64> = (0..n).map(|i| i as f64 - (n / 2) as f64).collect();
        CoordinateGrid::from_axes(&vec![axis; ndim])
    }

    #[test]
    fn normalized_gaussian_sums_to_one() {
        let grid = centered_indices(100, 2);
        let params = GaussianParams::isotropic(2, 3.0, 3.0, None);
        let total: f64 = evaluate(&grid, &params).sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn anisotropic_normalized_gaussian_sums_to_one() {
        let grid = centered_indices(100, 2);
        let params = GaussianParams::new(vec![1.0, 2.0], vec![2.0, 3.0], None);
        let total: f64 = evaluate(&grid, &params).sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn explicit_height_is_peak_value() {
        let grid = CoordinateGrid::indices(&[9, 9]);
        let params = GaussianParams::new(vec![1.5, 2.5], vec![4.0, 4.0], Some(7.0));
        let y = evaluate(&grid, &params);
        assert_abs_diff_eq!(y[[4, 4]], 7.0, epsilon = 1e-12);
        assert!(y[[0, 0]] < 7.0);
    }

    #[test]
    fn flat_parameters_match_structured_ones() {
        let grid = centered_indices(40, 2);
        let structured = evaluate(&grid, &GaussianParams::new(vec![3.0, 2.0], vec![7.0, 3.0], None));
        let flat = evaluate_flat(&grid, &[3.0, 2.0, 7.0, 3.0]).unwrap();
        assert_eq!(structured, flat);

        let with_height = evaluate_flat(&grid, &[3.0, 2.0, 7.0, 3.0, 9.0]).unwrap();
        assert_abs_diff_eq!(with_height[[27, 23]], 9.0, epsilon = 1e-12);
    }

    #[test]
    fn flat_axis_matches_single_axis_grid() {
        let xs: Vec<f64> = (0..201).map(|i| -10.0 + 0.1 * i as f64).collect();
        let params = GaussianParams::new(vec![2.0], vec![2.0], Some(3.0));
        let flat = evaluate_axis(&xs, &params);
        let gridded = evaluate(&CoordinateGrid::from_axis(&xs), &params);
        assert_eq!(flat.shape(), &[201]);
        for (a, b) in flat.iter().zip(gridded.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-15);
        }
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let x = [0.7, -1.3];
        for flat in [vec![1.2, 0.8, 0.1, -0.9, 2.5], vec![1.2, 0.8, 0.1, -0.9]] {
            let mut grad = vec![0.0; flat.len()];
            value_and_gradient(&x, &flat, &mut grad);

            let mut scratch = vec![0.0; flat.len()];
            for j in 0..flat.len() {
                let h = 1e-6;
                let mut up = flat.clone();
                let mut down = flat.clone();
                up[j] += h;
                down[j] -= h;
                let fd = (value_and_gradient(&x, &up, &mut scratch)
                    - value_and_gradient(&x, &down, &mut scratch))
                    / (2.0 * h);
                assert_abs_diff_eq!(grad[j], fd, epsilon = 1e-7);
            }
        }
    }
}
