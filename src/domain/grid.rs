//! Coordinate grids for N-dimensional samples.
//!
//! A grid is stored in canonical form `(ndim, ...sample_shape)`: `axis(i)` holds the
//! coordinate of every sample along dimension `i`, laid out like the samples.
//! A rank-1 coordinate array (plain 1D abscissae) is canonicalized to `(1, n)` when
//! the grid is built; the caller's array is never reshaped in place.

use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};

use crate::error::FitError;

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateGrid {
    coords: ArrayD<f64>,
}

impl CoordinateGrid {
    /// Index-space grid: the coordinate along axis `i` equals the index along axis `i`.
    pub fn indices(shape: &[usize]) -> Self {
        let full = canonical_shape(shape);
        let coords = ArrayD::from_shape_fn(IxDyn(&full), |idx| idx[idx[0] + 1] as f64);
        Self { coords }
    }

    /// Regular (possibly non-uniform) grid from per-axis coordinate vectors.
    pub fn from_axes(axes: &[Vec<f64>]) -> Self {
        let shape: Vec<usize> = axes.iter().map(Vec::len).collect();
        let full = canonical_shape(&shape);
        let coords = ArrayD::from_shape_fn(IxDyn(&full), |idx| {
            let axis = idx[0];
            axes[axis][idx[axis + 1]]
        });
        Self { coords }
    }

    /// Single-axis grid from flat 1D abscissae.
    pub fn from_axis(xs: &[f64]) -> Self {
        Self::from_axes(&[xs.to_vec()])
    }

    /// Wrap an explicit coordinate array.
    ///
    /// Rank-1 input is taken as 1D abscissae and gains a leading axis of length 1.
    pub fn new(coords: ArrayD<f64>) -> Result<Self, FitError> {
        match coords.ndim() {
            0 => Err(FitError::ShapeMismatch {
                context: "coordinate grid",
                expected: vec![1, 0],
                found: Vec::new(),
            }),
            1 => Ok(Self {
                coords: coords.insert_axis(Axis(0)),
            }),
            _ => Ok(Self { coords }),
        }
    }

    /// Number of coordinate dimensions.
    pub fn ndim(&self) -> usize {
        self.coords.shape()[0]
    }

    /// Shape of the samples this grid describes.
    pub fn sample_shape(&self) -> &[usize] {
        &self.coords.shape()[1..]
    }

    /// Coordinates along dimension `axis`, shaped like the samples.
    pub fn axis(&self, axis: usize) -> ArrayViewD<'_, f64> {
        self.coords.index_axis(Axis(0), axis)
    }

    /// Coordinate along `axis` of the sample at `index`.
    pub fn coordinate(&self, axis: usize, index: &[usize]) -> f64 {
        self.axis(axis)[index]
    }

    /// Verify the grid describes samples of shape `samples`.
    ///
    /// The leading dimension must equal the sample rank and the trailing dimensions
    /// must equal the sample shape.
    pub fn check_samples(&self, samples: &[usize]) -> Result<(), FitError> {
        let expected = canonical_shape(samples);
        if self.coords.shape() != expected.as_slice() {
            return Err(FitError::ShapeMismatch {
                context: "coordinate grid vs samples",
                expected,
                found: self.coords.shape().to_vec(),
            });
        }
        Ok(())
    }
}

fn canonical_shape(shape: &[usize]) -> Vec<usize> {
    let mut full = Vec::with_capacity(shape.len() + 1);
    full.push(shape.len());
    full.extend_from_slice(shape);
    full
}
