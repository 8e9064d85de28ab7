//! Radiative processes of the emission region: synchrotron and synchrotron
//! self-Compton.
//!
//! Both processes are evaluated from a flat set of source parameters
//! ([`RadiatingRegion`]) plus an electron distribution, so the fittable model
//! can call them with raw parameter vectors without building a [`Blob`].
//! [`Synchrotron`] and [`SynchrotronSelfCompton`] are thin conveniences bound
//! to a blob.

pub mod compton;
pub mod synchrotron;

pub use compton::*;
pub use synchrotron::*;

use std::f64::consts::PI;

use crate::emission::Blob;

/// Number of Lorentz factors sampled when integrating over the electrons.
pub const GAMMA_SIZE: usize = 200;

/// Geometry, beaming and field of an emitting sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiatingRegion {
    pub z: f64,
    /// Luminosity distance (cm).
    pub d_l: f64,
    pub delta_d: f64,
    /// Magnetic field (G).
    pub b: f64,
    /// Radius (cm).
    pub r_b: f64,
}

impl RadiatingRegion {
    pub fn from_blob(blob: &Blob) -> Self {
        Self {
            z: blob.z(),
            d_l: blob.d_l(),
            delta_d: blob.delta_d(),
            b: blob.b(),
            r_b: blob.r_b(),
        }
    }

    pub fn volume(&self) -> f64 {
        4.0 / 3.0 * PI * self.r_b.powi(3)
    }

    /// Observed-to-comoving conversion for dimensionless photon energies.
    pub fn to_comoving(&self, epsilon_obs: f64) -> f64 {
        (1.0 + self.z) * epsilon_obs / self.delta_d
    }

    /// `δ_D^4 / (4π d_L^2)`, the comoving-luminosity to observed-flux factor.
    pub fn flux_prefactor(&self) -> f64 {
        self.delta_d.powi(4) / (4.0 * PI * self.d_l * self.d_l)
    }
}
