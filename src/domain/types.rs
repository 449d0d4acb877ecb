//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - passed between guesser, fitter and reports without conversion
//! - serialized for JSON export of fit results

use std::fmt;
use std::ops::Range;
use std::path::PathBuf;

use ndarray::{ArrayView2, s};
use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::fit::FitOptions;
use crate::math::lm::SolverReport;
use crate::models::normalized_height;

/// Parameters of a separable N-dimensional Gaussian.
///
/// `height = None` means "normalized": the height that makes the Gaussian integrate
/// to 1 over continuous space, `∏ 1/(w_i·√(2π))`.
///
/// The flat layout `[widths.., centers.., (height)]` only exists at the solver
/// boundary (`to_flat` / `from_flat`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianParams {
    pub widths: Vec<f64>,
    pub center: Vec<f64>,
    pub height: Option<f64>,
}

impl GaussianParams {
    pub fn new(widths: Vec<f64>, center: Vec<f64>, height: Option<f64>) -> Self {
        Self {
            widths,
            center,
            height,
        }
    }

    /// Same width and center along every one of `ndim` axes.
    pub fn isotropic(ndim: usize, width: f64, center: f64, height: Option<f64>) -> Self {
        Self::new(vec![width; ndim], vec![center; ndim], height)
    }

    pub fn ndim(&self) -> usize {
        self.widths.len()
    }

    /// The explicit height, or the normalized one when none is set.
    pub fn height_or_normalized(&self) -> f64 {
        self.height
            .unwrap_or_else(|| normalized_height(&self.widths))
    }

    /// Copy with the height made explicit.
    pub fn with_explicit_height(&self) -> Self {
        Self {
            height: Some(self.height_or_normalized()),
            ..self.clone()
        }
    }

    /// Flatten to `[widths.., centers.., (height)]`.
    pub fn to_flat(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(2 * self.ndim() + 1);
        out.extend_from_slice(&self.widths);
        out.extend_from_slice(&self.center);
        if let Some(h) = self.height {
            out.push(h);
        }
        out
    }

    /// Inverse of `to_flat` for a known dimensionality.
    ///
    /// `2·ndim` values carry no height, `2·ndim + 1` values end with the height.
    pub fn from_flat(ndim: usize, flat: &[f64]) -> Result<Self, FitError> {
        let height = if flat.len() == 2 * ndim {
            None
        } else if flat.len() == 2 * ndim + 1 {
            Some(flat[2 * ndim])
        } else {
            return Err(FitError::ParamLength {
                ndim,
                len: flat.len(),
            });
        };
        Ok(Self::new(
            flat[..ndim].to_vec(),
            flat[ndim..2 * ndim].to_vec(),
            height,
        ))
    }
}

impl fmt::Display for GaussianParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "width={}, center={}, height=",
            fmt_list(&self.widths),
            fmt_list(&self.center)
        )?;
        match self.height {
            Some(h) => write!(f, "{h}"),
            None => write!(f, "normalized"),
        }
    }
}

fn fmt_list(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

/// Output of a Gaussian fit.
#[derive(Debug, Clone)]
pub struct GaussianFit {
    /// Fitted parameters; the height is always explicit.
    pub params: GaussianParams,
    /// Standard errors ordered `[width errs.., center errs.., height err]`.
    pub errors: Vec<f64>,
    /// The guess the solver started from.
    pub guess: GaussianParams,
    /// Full solver output, present only when requested.
    pub diagnostics: Option<SolverReport>,
}

impl GaussianFit {
    pub fn width_errors(&self) -> &[f64] {
        &self.errors[..self.params.ndim()]
    }

    pub fn center_errors(&self) -> &[f64] {
        let n = self.params.ndim();
        &self.errors[n..2 * n]
    }

    pub fn height_error(&self) -> f64 {
        self.errors[2 * self.params.ndim()]
    }
}

/// Rectangular sub-window `((y1, x1), (y2, x2))` of a 2D frame.
///
/// Bounds behave like slice bounds: `None` extends to the edge, negative values
/// count from the end, and out-of-range values are clamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub y1: Option<isize>,
    pub x1: Option<isize>,
    pub y2: Option<isize>,
    pub x2: Option<isize>,
}

impl Region {
    /// The whole frame.
    pub fn full() -> Self {
        Self::default()
    }

    pub fn new(lower: (Option<isize>, Option<isize>), upper: (Option<isize>, Option<isize>)) -> Self {
        Self {
            y1: lower.0,
            x1: lower.1,
            y2: upper.0,
            x2: upper.1,
        }
    }

    /// Row range for a frame with `len` rows.
    pub fn rows(&self, len: usize) -> Range<usize> {
        resolve_bounds(self.y1, self.y2, len)
    }

    /// Column range for a frame with `len` columns.
    pub fn cols(&self, len: usize) -> Range<usize> {
        resolve_bounds(self.x1, self.x2, len)
    }

    /// View of `frame` restricted to this region.
    pub fn slice<'a>(&self, frame: ArrayView2<'a, f64>) -> ArrayView2<'a, f64> {
        let (nrows, ncols) = frame.dim();
        let rows = self.rows(nrows);
        let cols = self.cols(ncols);
        frame.slice_move(s![rows, cols])
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = |v: Option<isize>| v.map(|x| x.to_string()).unwrap_or_default();
        write!(f, "[{}:{}, {}:{}]", b(self.y1), b(self.y2), b(self.x1), b(self.x2))
    }
}

fn resolve_bounds(start: Option<isize>, stop: Option<isize>, len: usize) -> Range<usize> {
    let clamp = |v: isize| -> usize {
        let v = if v < 0 { v + len as isize } else { v };
        v.clamp(0, len as isize) as usize
    };
    let start = start.map(clamp).unwrap_or(0);
    let stop = stop.map(clamp).unwrap_or(len);
    start..stop.max(start)
}

/// Result of a normalized median combination.
#[derive(Debug, Clone)]
pub struct Combined {
    /// Per-pixel median of the normalized frames.
    pub frame: ndarray::Array2<f64>,
    /// Normalization factor of each input frame.
    pub factors: Vec<f64>,
}

/// A synthetic fit run as understood by the `gfit fit` pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub truth: GaussianParams,
    pub samples_per_axis: usize,
    pub axis_start: f64,
    pub axis_step: f64,
    pub noise: f64,
    pub seed: u64,

    /// Stop after the guess; skip the least-squares refinement.
    pub guess_only: bool,
    pub options: FitOptions,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export: Option<PathBuf>,
}

/// A synthetic frame-combination run as understood by the `gfit combine` pipeline.
#[derive(Debug, Clone)]
pub struct CombineConfig {
    pub levels: Vec<f64>,
    pub rows: usize,
    pub cols: usize,
    pub noise: f64,
    pub seed: u64,
    pub region: Region,
    pub final_correction: bool,

    /// Sky level of the synthetic object frame.
    pub object_level: f64,
    /// Star added at the frame center of the object frame.
    pub star_height: f64,
    pub star_width: f64,
}

/// Exported fit summary (JSON).
///
/// Solver fields are only present when the fit kept its diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReportFile {
    pub tool: String,
    pub ndim: usize,
    pub guess: GaussianParams,
    pub params: GaussianParams,
    pub errors: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluations: Option<usize>,
    pub rms_residual: f64,
}
