//! Synthetic data used by the demo binary and the tests.

pub mod synthetic;

pub use synthetic::*;
