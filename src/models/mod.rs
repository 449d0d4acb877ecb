//! Model functions.
//!
//! Models are implemented as small, pure functions so that guessing/fitting code
//! can stay generic over dimensionality.

pub mod gaussian;

pub use gaussian::*;
