//! Spectral line-shift helpers.
//!
//! `cross_correlate` finds how far one spectrum is displaced from another in
//! pixels; `wavelength_shift` converts a pixel displacement to wavelength units;
//! `spline_interpolate` resamples a spectrum onto a new wavelength axis.

use ndarray::Array1;
use ndarray_interp::interp1d::Interp1D;
use ndarray_interp::interp1d::cubic_spline::CubicSpline;

use crate::error::FitError;

/// Zero-padded circular cross-correlation of `g` against `f`.
///
/// Both signals are mean-subtracted and embedded in buffers three times the length
/// of `f` (each starting at its own length as offset). For every shift `s` the value
/// is `Σ_k f_pad[k] · g_pad[(k + s) mod 3n]`. Default shifts are `0..g.len()`.
pub fn cross_correlate(f: &[f64], g: &[f64], shifts: Option<&[i64]>) -> Result<Vec<f64>, FitError> {
    if f.is_empty() || g.is_empty() {
        return Err(FitError::EmptySamples);
    }
    if g.len() > f.len() {
        return Err(FitError::ShapeMismatch {
            context: "correlated signal longer than reference",
            expected: vec![f.len()],
            found: vec![g.len()],
        });
    }

    let len = 3 * f.len();
    let f_pad = padded(f, f.len(), len);
    let g_pad = padded(g, g.len(), len);

    let default_shifts: Vec<i64>;
    let shifts = match shifts {
        Some(s) => s,
        None => {
            default_shifts = (0..g.len() as i64).collect();
            &default_shifts
        }
    };

    let out = shifts
        .iter()
        .map(|&s| {
            let offset = s.rem_euclid(len as i64) as usize;
            f_pad
                .iter()
                .enumerate()
                .map(|(k, &a)| a * g_pad[(k + offset) % len])
                .sum()
        })
        .collect();
    Ok(out)
}

/// Wavelength offset of `pixel` from `ref_pixel` for a linear dispersion
/// (wavelength per pixel).
pub fn wavelength_shift(pixel: f64, ref_pixel: f64, dispersion: f64) -> f64 {
    (pixel - ref_pixel) * dispersion
}

/// Cubic spline through `(x_old, y_old)` evaluated at `x_new`.
///
/// `x_old` must be strictly ascending. Points outside `x_old` are extrapolated from
/// the end polynomials.
pub fn spline_interpolate(x_new: &[f64], x_old: &[f64], y_old: &[f64]) -> Result<Vec<f64>, FitError> {
    if x_old.len() != y_old.len() {
        return Err(FitError::ShapeMismatch {
            context: "spline knots vs values",
            expected: vec![x_old.len()],
            found: vec![y_old.len()],
        });
    }
    if x_old.is_empty() {
        return Err(FitError::EmptySamples);
    }

    let spline = Interp1D::builder(Array1::from(y_old.to_vec()))
        .x(Array1::from(x_old.to_vec()))
        .strategy(CubicSpline::new().extrapolate(true))
        .build()
        .map_err(|e| FitError::Interpolation(e.to_string()))?;
    let out = spline
        .interp_array(&Array1::from(x_new.to_vec()))
        .map_err(|e| FitError::Interpolation(e.to_string()))?;
    Ok(out.to_vec())
}

fn padded(signal: &[f64], offset: usize, len: usize) -> Vec<f64> {
    let mean = signal.iter().sum::<f64>() / signal.len() as f64;
    let mut out = vec![0.0; len];
    for (dst, &v) in out[offset..offset + signal.len()].iter_mut().zip(signal) {
        *dst = v - mean;
    }
    out
}
