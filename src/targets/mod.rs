//! External photon fields seen by the blob.
//!
//! Each target reports its energy density in the blob's comoving frame as a
//! function of the blob's distance `r` from the central black hole along the
//! jet axis. Photons arriving at angle `θ` to the jet (`μ = cos θ`) are boosted
//! by `Γ^2 (1 - β μ)^2` in energy density; isotropic fields pick up
//! `Γ^2 (1 + β^2 / 3)`.

pub mod blr;
pub mod cmb;
pub mod disk;
pub mod torus;

pub use blr::*;
pub use cmb::*;
pub use disk::*;
pub use torus::*;

use rayon::prelude::*;

use crate::emission::Blob;

/// A photon field whose comoving energy density can be sampled along the jet.
pub trait PhotonTarget: Sync {
    /// Label used in logs and plot legends.
    fn label(&self) -> &str;

    /// Comoving energy density (erg cm^-3) at distance `r` (cm).
    fn u(&self, r: f64, blob: &Blob) -> f64;

    /// Comoving energy density over a grid of distances.
    fn u_profile(&self, r: &[f64], blob: &Blob) -> Vec<f64> {
        r.par_iter().map(|&r| self.u(r, blob)).collect()
    }
}

/// Boost of the energy density of a photon beam travelling at cosine `mu` to
/// the jet axis, into the frame moving with `gamma` / `beta`.
pub fn beam_boost(gamma: f64, beta: f64, mu: f64) -> f64 {
    let d = gamma * (1.0 - beta * mu);
    d * d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_on_photons_are_boosted_trailing_ones_deboosted() {
        let gamma: f64 = 10.0;
        let beta = (1.0 - 1.0 / (gamma * gamma)).sqrt();
        assert!(beam_boost(gamma, beta, -1.0) > 100.0);
        assert!(beam_boost(gamma, beta, 1.0) < 1.0 / 100.0);
    }
}
