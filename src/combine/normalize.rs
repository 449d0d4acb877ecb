//! Normalized median combination of 2D frames.
//!
//! Sky frames taken at different times share a spatial pattern but not a level.
//! Dividing each frame by the median of a reference region puts them on a common
//! scale; the per-pixel median across frames then rejects stars and cosmic rays.
//! `denormalize_and_subtract` applies the result to an object frame.

use log::debug;
use ndarray::{Array2, ArrayView2, ArrayView3, Axis};
use rayon::prelude::*;

use crate::domain::{Combined, Region};
use crate::error::FitError;
use crate::math::stats::{median, median_mut};

/// Median of `frame` restricted to `region`.
pub fn region_median(frame: ArrayView2<'_, f64>, region: &Region) -> Result<f64, FitError> {
    let view = region.slice(frame);
    median(view.iter().copied()).ok_or(FitError::EmptyRegion { region: *region })
}

/// Normalize every frame of `stack` `(frame, row, col)` by its region median and
/// median-combine the results pixel by pixel.
///
/// With `final_correction` the combined frame is divided by its own median (the
/// value 1.0 need not occur in it) and the factors are multiplied by the same value,
/// so `factor × combined` still reproduces each frame's level.
pub fn normalize_and_combine(
    stack: ArrayView3<'_, f64>,
    region: &Region,
    final_correction: bool,
) -> Result<Combined, FitError> {
    let (nframes, rows, cols) = stack.dim();
    if nframes == 0 {
        return Err(FitError::EmptyStack);
    }

    let mut factors = Vec::with_capacity(nframes);
    for (frame, sheet) in stack.axis_iter(Axis(0)).enumerate() {
        let factor = region_median(sheet, region)?;
        if factor == 0.0 || !factor.is_finite() {
            return Err(FitError::DegenerateNormalization { frame, factor });
        }
        factors.push(factor);
    }
    debug!("combine: {nframes} frame(s) {rows}x{cols}, region {region}, factors {factors:?}");

    let mut normalized = stack.to_owned();
    for (mut sheet, &factor) in normalized.axis_iter_mut(Axis(0)).zip(&factors) {
        sheet.mapv_inplace(|v| v / factor);
    }

    let mut pixels = vec![0.0; rows * cols];
    pixels
        .par_chunks_mut(cols.max(1))
        .enumerate()
        .for_each(|(r, row)| {
            // One buffer per row, reused for every pixel in it.
            let mut values = vec![0.0; nframes];
            for (c, out) in row.iter_mut().enumerate() {
                for (f, v) in values.iter_mut().enumerate() {
                    *v = normalized[[f, r, c]];
                }
                *out = median_mut(&mut values).unwrap_or(f64::NAN);
            }
        });
    let mut frame = Array2::from_shape_vec((rows, cols), pixels).map_err(|_| {
        FitError::ShapeMismatch {
            context: "combined frame",
            expected: vec![rows, cols],
            found: vec![rows * cols],
        }
    })?;

    if final_correction {
        let correction = median(frame.iter().copied()).unwrap_or(f64::NAN);
        if correction == 0.0 || !correction.is_finite() {
            return Err(FitError::DegenerateCorrection { factor: correction });
        }
        debug!("combine: final correction {correction}");
        frame.mapv_inplace(|v| v / correction);
        for factor in &mut factors {
            *factor *= correction;
        }
    }

    Ok(Combined { frame, factors })
}

/// Scale the normalized `reference` to the level of `object` (median over `region`)
/// and subtract it.
pub fn denormalize_and_subtract(
    object: ArrayView2<'_, f64>,
    reference: ArrayView2<'_, f64>,
    region: &Region,
) -> Result<Array2<f64>, FitError> {
    if object.shape() != reference.shape() {
        return Err(FitError::ShapeMismatch {
            context: "object vs normalized reference frame",
            expected: object.shape().to_vec(),
            found: reference.shape().to_vec(),
        });
    }
    let level = region_median(object, region)?;
    debug!("denormalize: object level {level} over region {region}");
    Ok(&object - &reference.mapv(|v| v * level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::frame_stack;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array3, stack};

    #[test]
    fn constant_frames_combine_to_unity() {
        let unit = Array2::<f64>::ones((5, 5));
        let frames = stack![Axis(0), unit.clone() * 5.0, unit.clone() * 7.0, unit * 5.0];

        let out = normalize_and_combine(frames.view(), &Region::full(), false).unwrap();
        assert_eq!(out.factors, vec![5.0, 7.0, 5.0]);
        assert!(out.frame.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn final_correction_rescales_frame_and_factors() {
        // Rows 0..2 hold 1.0, rows 2..4 hold 3.0; normalize on the top rows only.
        let pattern = Array2::from_shape_fn((4, 4), |(r, _)| if r < 2 { 1.0 } else { 3.0 });
        let frames = stack![Axis(0), &pattern * 2.0, &pattern * 4.0, &pattern * 6.0];
        let region = Region::new((None, None), (Some(2), None));

        let plain = normalize_and_combine(frames.view(), &region, false).unwrap();
        assert_eq!(plain.factors, vec![2.0, 4.0, 6.0]);
        assert_eq!(plain.frame, pattern);

        let corrected = normalize_and_combine(frames.view(), &region, true).unwrap();
        assert_eq!(corrected.factors, vec![4.0, 8.0, 12.0]);
        assert_abs_diff_eq!(corrected.frame[[0, 0]], 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(corrected.frame[[3, 3]], 1.5, epsilon = 1e-15);
        assert_eq!(median(corrected.frame.iter().copied()), Some(1.0));
    }

    #[test]
    fn star_in_one_frame_is_rejected() {
        let mut frames = frame_stack(&[100.0, 120.0, 90.0], 6, 6, 0.0, 1).unwrap();
        frames[[1, 3, 3]] += 5000.0;
        let out = normalize_and_combine(frames.view(), &Region::full(), false).unwrap();
        assert!(out.frame[[3, 3]] < 2.0);
    }

    #[test]
    fn denormalize_round_trip_recovers_object() {
        let sky = frame_stack(&[100.0, 120.0, 90.0, 110.0], 8, 8, 0.0, 5).unwrap();
        let region = Region::new((Some(0), Some(0)), (Some(4), Some(8)));
        let reference = normalize_and_combine(sky.view(), &region, false).unwrap().frame;

        let sky_only = frame_stack(&[80.0], 8, 8, 0.0, 9)
            .unwrap()
            .index_axis_move(Axis(0), 0);
        let residual = denormalize_and_subtract(sky_only.view(), reference.view(), &region).unwrap();
        for v in residual.iter() {
            assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-10);
        }

        let mut object = sky_only.clone();
        object[[6, 6]] += 250.0;
        let out = denormalize_and_subtract(object.view(), reference.view(), &region).unwrap();
        assert_abs_diff_eq!(out[[6, 6]], 250.0, epsilon = 1e-10);

        let level = region_median(object.view(), &region).unwrap();
        let restored = &out + &reference.mapv(|v| v * level);
        for (a, b) in restored.iter().zip(object.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
        }
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let empty = Array3::<f64>::zeros((0, 4, 4));
        assert_eq!(
            normalize_and_combine(empty.view(), &Region::full(), false).unwrap_err(),
            FitError::EmptyStack
        );

        let frames = Array3::<f64>::ones((2, 4, 4));
        let region = Region::new((Some(3), None), (Some(3), None));
        assert_eq!(
            normalize_and_combine(frames.view(), &region, false).unwrap_err(),
            FitError::EmptyRegion { region }
        );
    }

    #[test]
    fn zero_factor_names_the_frame() {
        let mut frames = Array3::<f64>::ones((3, 4, 4));
        frames.index_axis_mut(Axis(0), 1).fill(0.0);
        assert_eq!(
            normalize_and_combine(frames.view(), &Region::full(), false).unwrap_err(),
            FitError::DegenerateNormalization {
                frame: 1,
                factor: 0.0
            }
        );
    }

    #[test]
    fn zero_combined_median_blocks_final_correction() {
        // Only the top-left pixel is lit; it is the whole normalization region.
        let mut frames = Array3::<f64>::zeros((2, 3, 3));
        frames[[0, 0, 0]] = 2.0;
        frames[[1, 0, 0]] = 4.0;
        let region = Region::new((None, None), (Some(1), Some(1)));
        assert!(matches!(
            normalize_and_combine(frames.view(), &region, true),
            Err(FitError::DegenerateCorrection { .. })
        ));
    }

    #[test]
    fn reference_shape_must_match_object() {
        let object = Array2::<f64>::ones((4, 4));
        let reference = Array2::<f64>::ones((4, 5));
        assert!(matches!(
            denormalize_and_subtract(object.view(), reference.view(), &Region::full()),
            Err(FitError::ShapeMismatch { .. })
        ));
    }
}
