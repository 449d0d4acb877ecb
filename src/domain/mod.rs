//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - Gaussian parameters and fit outputs (`GaussianParams`, `GaussianFit`)
//! - coordinate grids for N-dimensional samples (`CoordinateGrid`)
//! - frame regions and combination outputs (`Region`, `Combined`)
//! - run configuration for the demo binary (`FitConfig`, `CombineConfig`)

pub mod grid;
pub mod types;

pub use grid::*;
pub use types::*;
