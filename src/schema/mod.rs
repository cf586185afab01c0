//! Schema module - Level, design element and configuration types.

mod config;
mod element;
mod evolution;
mod level;

pub use config::*;
pub use element::*;
pub use evolution::*;
pub use level::*;
