//! SED datasets.
//!
//! - multi-wavelength SED points and the fit dataset (`sed`)
//! - synthetic SEDs drawn from the SSC model (`synthetic`)

pub mod sed;
pub mod synthetic;

pub use sed::*;
pub use synthetic::*;
