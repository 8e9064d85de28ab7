//! Reporting utilities: formatted terminal output of fits, error estimates
//! and energy densities.

pub mod format;

pub use format::*;
