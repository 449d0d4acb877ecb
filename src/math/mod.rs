//! Mathematical utilities: robust statistics and nonlinear least squares.

pub mod lm;
pub mod stats;

pub use lm::*;
pub use stats::*;
