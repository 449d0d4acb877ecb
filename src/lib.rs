//! `gaussfit` library crate.
//!
//! N-dimensional Gaussian evaluation, guessing and Levenberg–Marquardt fitting,
//! plus normalized median combination of 2D frames.
//!
//! The binary (`gfit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - modules are reusable from other tools

pub mod app;
pub mod cli;
pub mod combine;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod spectra;
