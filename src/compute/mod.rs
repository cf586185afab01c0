//! Compute module - Level search and measurement.

mod census;

pub mod evolution;

pub use census::*;
