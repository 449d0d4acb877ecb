//! Gaussian fitting.
//!
//! Responsibilities:
//!
//! - crude initial estimates from the samples alone (`guess`)
//! - Levenberg–Marquardt refinement with standard errors (`fitter`)

pub mod fitter;
pub mod guess;

pub use fitter::*;
pub use guess::*;
