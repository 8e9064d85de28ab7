//! Physical constants and cosmology.

pub mod constants;
pub mod cosmology;

pub use constants::*;
pub use cosmology::*;
