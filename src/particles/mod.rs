//! Particle energy distributions.

pub mod spectra;

pub use spectra::*;
