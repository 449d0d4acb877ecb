//! Frame combination.

pub mod normalize;

pub use normalize::*;
