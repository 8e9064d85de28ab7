//! Emission regions.

pub mod blob;

pub use blob::*;
