//! Crude initial parameter estimates.
//!
//! The most extreme sample (by magnitude) gives the peak location and height. The
//! width along each axis is half the coordinate span of the samples beyond 0.6 × the
//! peak on the 1D slice through the peak along that axis.
//!
//! Limitations (kept on purpose, the estimate only seeds the fitter):
//! - spikes larger than the real peak move the guess to the spike
//! - qualifying samples need not be contiguous, so two peaks on one slice widen
//!   the width to cover both
//! - if only one sample qualifies the width is set to 1.0

use log::debug;
use ndarray::{ArrayViewD, Dimension};

use crate::domain::{CoordinateGrid, GaussianParams};
use crate::error::FitError;

/// Fraction of the peak that defines the width-measuring threshold.
const WIDTH_THRESHOLD: f64 = 0.6;

/// Width used when the span at threshold is zero.
const FALLBACK_WIDTH: f64 = 1.0;

/// Estimate `(width, center, height)` for `samples`.
///
/// Without a grid, coordinates are sample indices. The returned height is always
/// explicit and equals the peak sample.
pub fn guess_params(
    samples: ArrayViewD<'_, f64>,
    grid: Option<&CoordinateGrid>,
) -> Result<GaussianParams, FitError> {
    if samples.is_empty() {
        return Err(FitError::EmptySamples);
    }

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

    let peak = peak_index(&samples);
    let height = samples[peak.as_slice()];
    let threshold = WIDTH_THRESHOLD * height;
    let beyond = |v: f64| {
        if height >= 0.0 {
            v > threshold
        } else {
            v < threshold
        }
    };

    let ndim = samples.ndim();
    let mut widths = Vec::with_capacity(ndim);
    let mut center = Vec::with_capacity(ndim);

    for axis in 0..ndim {
        let mut idx = peak.clone();
        let mut lo: Option<usize> = None;
        let mut hi: Option<usize> = None;
        for j in 0..samples.shape()[axis] {
            idx[axis] = j;
            if beyond(samples[idx.as_slice()]) {
                lo.get_or_insert(j);
                hi = Some(j);
            }
        }

        let width = match (lo, hi) {
            (Some(lo), Some(hi)) => {
                idx[axis] = hi;
                let x_hi = grid.coordinate(axis, &idx);
                idx[axis] = lo;
                let x_lo = grid.coordinate(axis, &idx);
                (x_hi - x_lo) / 2.0
            }
            _ => 0.0,
        };

        if width == 0.0 {
            debug!("guess: zero width along axis {axis}, using {FALLBACK_WIDTH}");
            widths.push(FALLBACK_WIDTH);
        } else {
            widths.push(width);
        }
        center.push(grid.coordinate(axis, &peak));
    }

    Ok(GaussianParams::new(widths, center, Some(height)))
}

/// Row-major index of the first maximum or first minimum, whichever has the larger
/// magnitude (ties go to the minimum).
fn peak_index(samples: &ArrayViewD<'_, f64>) -> Vec<usize> {
    let mut iter = samples.indexed_iter();
    let (first_idx, &first) = match iter.next() {
        Some(item) => item,
        None => return vec![0; samples.ndim()],
    };
    let mut max = (first_idx.clone(), first);
    let mut min = (first_idx, first);
    for (idx, &v) in iter {
        if v > max.1 {
            max = (idx.clone(), v);
        }
        if v < min.1 {
            min = (idx, v);
        }
    }
    let (idx, _) = if min.1.abs() >= max.1.abs() { min } else { max };
    idx.slice().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::evaluate;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, ArrayD, Axis, IxDyn};

    fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
        Array1::linspace(start, stop, n).to_vec()
    }

    #[test]
    fn guesses_unit_gaussian_in_1d() {
        let xs = linspace(-10.0, 10.0, 201);
        let grid = CoordinateGrid::from_axis(&xs);
        let y = evaluate(&grid, &GaussianParams::isotropic(1, 1.0, 0.0, None));

        let g = guess_params(y.view(), Some(&grid)).unwrap();
        assert_abs_diff_eq!(g.widths[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(g.center[0], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(g.height.unwrap(), 0.3989422804014327, epsilon = 1e-12);
    }

    #[test]
    fn guesses_2d_gaussian_on_offset_indices() {
        let axis: Vec<f64> = (0..100).map(|i| i as f64 - 50.0).collect();
        let grid = CoordinateGrid::from_axes(&[axis.clone(), axis]);
        let truth = GaussianParams::new(vec![3.0, 5.0], vec![13.0, 14.0], None);
        let y = evaluate(&grid, &truth);

        let g = guess_params(y.view(), Some(&grid)).unwrap();
        assert_eq!(g.widths, vec![3.0, 5.0]);
        assert_eq!(g.center, vec![13.0, 14.0]);
        assert_abs_diff_eq!(g.height.unwrap(), truth.height_or_normalized(), epsilon = 1e-15);
    }

    #[test]
    fn default_grid_is_index_space() {
        let grid = CoordinateGrid::indices(&[30]);
        let y = evaluate(&grid, &GaussianParams::new(vec![2.0], vec![12.0], Some(5.0)));
        let g = guess_params(y.view(), None).unwrap();
        assert_eq!(g.center, vec![12.0]);
        assert_eq!(g.height, Some(5.0));
        assert_abs_diff_eq!(g.widths[0], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn flat_and_explicit_grids_give_same_guess() {
        let xs = linspace(-5.0, 5.0, 101);
        let flat = CoordinateGrid::new(Array1::from(xs.clone()).into_dyn()).unwrap();
        let explicit =
            CoordinateGrid::new(Array1::from(xs).insert_axis(Axis(0)).into_dyn()).unwrap();
        let y = evaluate(&flat, &GaussianParams::new(vec![0.8], vec![1.1], Some(2.0)));

        let a = guess_params(y.view(), Some(&flat)).unwrap();
        let b = guess_params(y.view(), Some(&explicit)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn negative_peak_is_found_by_magnitude() {
        let xs = linspace(-10.0, 10.0, 201);
        let grid = CoordinateGrid::from_axis(&xs);
        let y = evaluate(&grid, &GaussianParams::new(vec![1.5], vec![2.0], Some(-4.0)));

        let g = guess_params(y.view(), Some(&grid)).unwrap();
        assert_eq!(g.height, Some(-4.0));
        assert_abs_diff_eq!(g.center[0], 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(g.widths[0], 1.5, epsilon = 0.1);
    }

    #[test]
    fn single_qualifying_sample_gives_unit_width() {
        let mut y = ArrayD::<f64>::zeros(IxDyn(&[7]));
        y[[3]] = 10.0;
        let g = guess_params(y.view(), None).unwrap();
        assert_eq!(g.widths, vec![1.0]);
        assert_eq!(g.center, vec![3.0]);
    }

    #[test]
    fn all_zero_samples_still_give_usable_width() {
        let y = ArrayD::<f64>::zeros(IxDyn(&[4, 4]));
        let g = guess_params(y.view(), None).unwrap();
        assert_eq!(g.widths, vec![1.0, 1.0]);
        assert_eq!(g.height, Some(0.0));
    }

    #[test]
    fn two_peaks_on_a_slice_widen_the_estimate() {
        // Crude estimator: qualifying samples are not required to be contiguous.
        let grid = CoordinateGrid::indices(&[60]);
        let a = evaluate(&grid, &GaussianParams::new(vec![2.0], vec![15.0], Some(10.0)));
        let b = evaluate(&grid, &GaussianParams::new(vec![2.0], vec![45.0], Some(9.0)));
        let y = &a + &b;

        let g = guess_params(y.view(), None).unwrap();
        assert_eq!(g.center, vec![15.0]);
        assert!(g.widths[0] > 10.0, "width {}", g.widths[0]);
    }

    #[test]
    fn mismatched_grid_is_rejected() {
        let grid = CoordinateGrid::indices(&[10]);
        let y = ArrayD::<f64>::zeros(IxDyn(&[11]));
        assert!(matches!(
            guess_params(y.view(), Some(&grid)),
            Err(FitError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn empty_samples_are_rejected() {
        let y = ArrayD::<f64>::zeros(IxDyn(&[0]));
        assert_eq!(guess_params(y.view(), None), Err(FitError::EmptySamples));
    }
}
