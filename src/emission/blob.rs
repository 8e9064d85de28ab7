//! Spherical emission region ("blob") streaming down the jet.
//!
//! The blob is a sphere of radius `R_b` in its own frame, filled with a
//! tangled magnetic field `B` and an isotropic electron population. It moves
//! with bulk Lorentz factor `Γ`; the observer sees it with Doppler factor `δ_D`
//! from redshift `z`.
//!
//! Derived quantities follow the standard one-zone relations:
//!
//! - `U_B = B^2 / 8π`
//! - `u'_synch = 4/3 σ_T U_B R_b ∫ γ^2 n(γ) dγ` (escape-time estimate of the
//!   synchrotron photon density)
//! - `P_jet = 2π R_b^2 β Γ^2 c U` for particles (`U_e`) and field (`U_B`)

use std::f64::consts::PI;

use serde::Serialize;

use crate::error::AppError;
use crate::particles::{ElectronSpectrum, Normalization, SpectrumShape};
use crate::physics::{C, SIGMA_T, luminosity_distance};

/// Inputs needed to build a [`Blob`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlobParams {
    /// Radius in the comoving frame (cm).
    pub r_b: f64,
    pub z: f64,
    pub delta_d: f64,
    /// Bulk Lorentz factor.
    pub gamma: f64,
    /// Magnetic field (G).
    pub b: f64,
    pub spectrum: SpectrumShape,
    pub norm: Normalization,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blob {
    r_b: f64,
    z: f64,
    d_l: f64,
    delta_d: f64,
    gamma: f64,
    b: f64,
    electrons: ElectronSpectrum,
}

impl Blob {
    /// Build the blob, placing it at the luminosity distance of `z`.
    pub fn new(params: BlobParams) -> Result<Self, AppError> {
        let d_l = luminosity_distance(params.z)?;
        Self::with_distance(params, d_l)
    }

    /// Build the blob at an explicit luminosity distance (cm).
    pub fn with_distance(params: BlobParams, d_l: f64) -> Result<Self, AppError> {
        let BlobParams { r_b, z, delta_d, gamma, b, spectrum, norm } = params;
        if !(r_b.is_finite() && r_b > 0.0) {
            return Err(AppError::new(2, format!("Blob radius must be positive, got {r_b}")));
        }
        if !(delta_d.is_finite() && delta_d > 0.0) {
            return Err(AppError::new(2, format!("Doppler factor must be positive, got {delta_d}")));
        }
        if !(gamma.is_finite() && gamma >= 1.0) {
            return Err(AppError::new(2, format!("Bulk Lorentz factor must be >= 1, got {gamma}")));
        }
        if !(b.is_finite() && b >= 0.0) {
            return Err(AppError::new(2, format!("Magnetic field must be non-negative, got {b}")));
        }
        if !(d_l.is_finite() && d_l > 0.0) {
            return Err(AppError::new(2, format!("Luminosity distance must be positive, got {d_l}")));
        }
        let volume = 4.0 / 3.0 * PI * r_b.powi(3);
        let electrons = ElectronSpectrum::normalized(spectrum, norm, volume)?;
        Ok(Self { r_b, z, d_l, delta_d, gamma, b, electrons })
    }

    pub fn r_b(&self) -> f64 {
        self.r_b
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn d_l(&self) -> f64 {
        self.d_l
    }

    pub fn delta_d(&self) -> f64 {
        self.delta_d
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn electrons(&self) -> &ElectronSpectrum {
        &self.electrons
    }

    /// Comoving volume (cm^3).
    pub fn volume(&self) -> f64 {
        4.0 / 3.0 * PI * self.r_b.powi(3)
    }

    /// Bulk speed in units of c.
    pub fn beta(&self) -> f64 {
        (1.0 - 1.0 / (self.gamma * self.gamma)).sqrt()
    }

    /// Cosine of the viewing angle implied by `Γ` and `δ_D`, clamped to `[-1, 1]`.
    pub fn mu_s(&self) -> f64 {
        let beta = self.beta();
        if beta == 0.0 {
            return 1.0;
        }
        ((1.0 - 1.0 / (self.gamma * self.delta_d)) / beta).clamp(-1.0, 1.0)
    }

    /// Viewing angle (degrees).
    pub fn theta_s(&self) -> f64 {
        self.mu_s().acos().to_degrees()
    }

    /// Magnetic energy density (erg cm^-3).
    pub fn u_b(&self) -> f64 {
        self.b * self.b / (8.0 * PI)
    }

    /// Electron number density (cm^-3).
    pub fn n_e_tot(&self) -> f64 {
        self.electrons.n_tot()
    }

    /// Electron energy density (erg cm^-3).
    pub fn u_e(&self) -> f64 {
        self.electrons.energy_density()
    }

    /// Total electron energy in the blob (erg).
    pub fn w_e(&self) -> f64 {
        self.u_e() * self.volume()
    }

    /// Comoving energy density of the synchrotron photons (erg cm^-3).
    pub fn u_ph_synch(&self) -> f64 {
        4.0 / 3.0 * SIGMA_T * self.u_b() * self.r_b * self.electrons.moment(2.0)
    }

    fn jet_power(&self, energy_density: f64) -> f64 {
        2.0 * PI * self.r_b * self.r_b * self.beta() * self.gamma * self.gamma * C * energy_density
    }

    /// Jet power carried by the electrons (erg s^-1).
    pub fn p_jet_e(&self) -> f64 {
        self.jet_power(self.u_e())
    }

    /// Jet power carried by the magnetic field (erg s^-1).
    pub fn p_jet_b(&self) -> f64 {
        self.jet_power(self.u_b())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> BlobParams {
        BlobParams {
            r_b: 1e16,
            z: 1.0,
            delta_d: 40.0,
            gamma: 40.0,
            b: 0.56,
            spectrum: SpectrumShape::BrokenPowerLaw {
                p1: 2.0,
                p2: 3.5,
                gamma_b: 1e4,
                gamma_min: 20.0,
                gamma_max: 5e7,
            },
            norm: Normalization::Energy(6e42),
        }
    }

    #[test]
    fn derived_quantities() {
        let blob = Blob::new(params()).unwrap();
        assert!((blob.u_b() - 0.56f64.powi(2) / (8.0 * PI)).abs() < 1e-15);
        assert!((blob.w_e() / 6e42 - 1.0).abs() < 1e-12);
        assert!(blob.u_ph_synch() > 0.0);

        // δ_D = Γ corresponds to viewing at θ = 1/Γ.
        let theta = blob.theta_s().to_radians();
        assert!((theta * 40.0 - 1.0).abs() < 1e-2, "θΓ = {}", theta * 40.0);

        let ratio = blob.p_jet_e() / blob.p_jet_b();
        assert!((ratio - blob.u_e() / blob.u_b()).abs() < 1e-9 * ratio);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let mut p = params();
        p.r_b = 0.0;
        assert!(Blob::new(p).is_err());

        let mut p = params();
        p.gamma = 0.5;
        assert!(Blob::new(p).is_err());
    }
}
