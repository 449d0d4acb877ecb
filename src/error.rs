//! Error types.
//!
//! - `FitError` is returned by every library operation.
//! - `AppError` is what the `gfit` binary reports: a message plus a process exit code.

use thiserror::Error;

use crate::domain::{GaussianParams, Region};

/// Failures of the fitting / combination core.
///
/// Every variant carries enough context (shapes, guess, region) for the caller to
/// retry with adjusted inputs. Nothing is retried internally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("Shape mismatch for {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Parameter vector of length {len} does not fit {ndim} dimension(s)")]
    ParamLength { ndim: usize, len: usize },

    #[error("No samples to work on")]
    EmptySamples,

    #[error("{message} No convergence (status {status}). Guess = {guess}; try a different guess, evaluation cap, or tolerances.")]
    Convergence {
        status: u8,
        message: String,
        guess: GaussianParams,
    },

    #[error("Covariance is singular at the fitted parameters {params}")]
    SingularCovariance { params: GaussianParams },

    #[error("Frame stack is empty")]
    EmptyStack,

    #[error("Normalization region {region} selects no pixels")]
    EmptyRegion { region: Region },

    #[error("Frame {frame} has unusable normalization factor {factor}")]
    DegenerateNormalization { frame: usize, factor: f64 },

    #[error("Combined frame has unusable median {factor}; final correction not possible")]
    DegenerateCorrection { factor: f64 },

    #[error("Interpolation failed: {0}")]
    Interpolation(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let exit_code = match err {
            FitError::Convergence { .. } | FitError::SingularCovariance { .. } => 3,
            _ => 2,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
