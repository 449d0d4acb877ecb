//! Input/output helpers.
//!
//! - fit result export (JSON) (`export`)

pub mod export;

pub use export::*;
