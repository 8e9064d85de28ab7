//! Synchrotron SED of an isotropic electron population in a tangled field.
//!
//! The single-electron power per unit dimensionless energy, averaged over
//! pitch angles, is
//!
//! ```text
//! P(ε, γ) = √3 e^3 B / h · R(x),   x = 4π ε m_e^2 c^3 / (3 e B h γ^2)
//! ```
//!
//! with `R(x)` from Aharonian, Kelner & Prosekin (2010). The observed SED
//! flux is
//!
//! ```text
//! νFν = δ_D^4 / (4π d_L^2) · ε' ∫ dγ N_e(γ) P(ε', γ),   ε' = (1+z) ε / δ_D
//! ```
//!
//! Optional synchrotron self-absorption multiplies by the escape probability
//! of a uniform sphere, `3 u(τ) / τ`.

use std::f64::consts::PI;

use rayon::prelude::*;

use crate::emission::Blob;
use crate::math::trapz_loglog;
use crate::particles::ElectronSpectrum;
use crate::physics::{C, E_CHARGE, H, LAMBDA_C, M_E, nu_to_epsilon};
use crate::radiative::{GAMMA_SIZE, RadiatingRegion};

/// Below this optical depth the attenuation factor uses its series expansion.
const TAU_SMALL: f64 = 1e-3;

/// Pitch-angle averaged synchrotron function `R(x)`.
pub fn r_function(x: f64) -> f64 {
    let x13 = x.cbrt();
    let x23 = x13 * x13;
    let x43 = x23 * x23;
    let term_1 = 1.808 * x13 / (1.0 + 3.4 * x23).sqrt();
    let term_2 = (1.0 + 2.21 * x23 + 0.347 * x43) / (1.0 + 1.353 * x23 + 0.217 * x43);
    term_1 * term_2 * (-x).exp()
}

/// Power emitted by one electron per unit dimensionless energy (erg s^-1).
pub fn single_electron_power(b: f64, epsilon: f64, gamma: f64) -> f64 {
    if b <= 0.0 {
        return 0.0;
    }
    let prefactor = 3f64.sqrt() * E_CHARGE.powi(3) * b / H;
    let x = 4.0 * PI * epsilon * M_E * M_E * C.powi(3) / (3.0 * E_CHARGE * b * H * gamma * gamma);
    prefactor * r_function(x)
}

/// Escape probability `3 u(τ) / τ` of a homogeneous sphere.
pub fn ssa_attenuation(tau: f64) -> f64 {
    if tau < TAU_SMALL {
        return 1.0 - 3.0 * tau / 8.0;
    }
    let u = 0.5 + (-tau).exp() / tau - (1.0 - (-tau).exp()) / (tau * tau);
    3.0 * u / tau
}

/// Self-absorption optical depth across the sphere at comoving energy
/// `epsilon`, given a precomputed Lorentz factor grid.
fn ssa_tau(region: &RadiatingRegion, electrons: &ElectronSpectrum, epsilon: f64, gamma: &[f64]) -> f64 {
    let prefactor = -1.0 / (8.0 * PI * M_E * epsilon * epsilon) * (LAMBDA_C / C).powi(3);
    let integrand: Vec<f64> = gamma
        .iter()
        .map(|&g| single_electron_power(region.b, epsilon, g) * g * g * electrons.ssa_integrand(g))
        .collect();
    // The integrand is negative everywhere, so integrate its magnitude in
    // log-log space.
    let magnitude: Vec<f64> = integrand.iter().map(|v| -v).collect();
    let k_epsilon = -prefactor * trapz_loglog(&magnitude, gamma);
    2.0 * k_epsilon * region.r_b
}

/// Observed synchrotron SED flux νFν (erg cm^-2 s^-1) at frequencies `nu` (Hz).
pub fn synchrotron_sed_flux(
    nu: &[f64],
    region: &RadiatingRegion,
    electrons: &ElectronSpectrum,
    ssa: bool,
) -> Vec<f64> {
    let gamma = electrons.gamma_grid(GAMMA_SIZE);
    let volume = region.volume();
    let n_e: Vec<f64> = gamma.iter().map(|&g| volume * electrons.evaluate(g)).collect();
    let prefactor = region.flux_prefactor();

    nu.par_iter()
        .map(|&nu| {
            let epsilon = region.to_comoving(nu_to_epsilon(nu));
            let integrand: Vec<f64> = gamma
                .iter()
                .zip(&n_e)
                .map(|(&g, &n)| n * single_electron_power(region.b, epsilon, g))
                .collect();
            let emissivity = trapz_loglog(&integrand, &gamma);
            let mut sed = prefactor * epsilon * emissivity;
            if ssa {
                sed *= ssa_attenuation(ssa_tau(region, electrons, epsilon, &gamma));
            }
            sed
        })
        .collect()
}

/// Synchrotron radiation of a [`Blob`].
#[derive(Debug, Clone)]
pub struct Synchrotron<'a> {
    blob: &'a Blob,
    ssa: bool,
}

impl<'a> Synchrotron<'a> {
    pub fn new(blob: &'a Blob) -> Self {
        Self { blob, ssa: false }
    }

    /// Enable synchrotron self-absorption.
    pub fn with_ssa(mut self, ssa: bool) -> Self {
        self.ssa = ssa;
        self
    }

    pub fn sed_flux(&self, nu: &[f64]) -> Vec<f64> {
        synchrotron_sed_flux(nu, &RadiatingRegion::from_blob(self.blob), self.blob.electrons(), self.ssa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emission::BlobParams;
    use crate::math::logspace;
    use crate::particles::{Normalization, SpectrumShape};

    fn blob() -> Blob {
        Blob::new(BlobParams {
            r_b: 1e16,
            z: 0.069,
            delta_d: 10.0,
            gamma: 10.0,
            b: 1.0,
            spectrum: SpectrumShape::PowerLaw { p: 2.8, gamma_min: 1e2, gamma_max: 1e7 },
            norm: Normalization::Energy(1e48),
        })
        .unwrap()
    }

    #[test]
    fn r_function_shape() {
        // Peaks near x ≈ 0.23 and vanishes at both ends.
        let xs = logspace(1e-4, 20.0, 2000);
        let (x_peak, _) = xs
            .iter()
            .map(|&x| (x, r_function(x)))
            .fold((0.0, 0.0), |acc, v| if v.1 > acc.1 { v } else { acc });
        assert!((0.15..0.35).contains(&x_peak), "peak at {x_peak}");
        assert!(r_function(1e-8) < 1e-2);
        assert!(r_function(50.0) < 1e-20);
    }

    #[test]
    fn sed_is_positive_and_falls_past_cutoff() {
        let blob = blob();
        let nu = logspace(1e9, 1e26, 60);
        let sed = Synchrotron::new(&blob).sed_flux(&nu);
        assert!(sed.iter().all(|v| v.is_finite() && *v >= 0.0));

        // Critical frequency of the highest-energy electrons, observed.
        let nu_c = 4.2e6 * blob.b() * 1e14 * blob.delta_d() / (1.0 + blob.z());
        let peak = sed.iter().cloned().fold(0.0, f64::max);
        let far = Synchrotron::new(&blob).sed_flux(&[100.0 * nu_c])[0];
        assert!(far < 1e-6 * peak);
    }

    #[test]
    fn optically_thin_slope() {
        // νFν ∝ ν^((3-p)/2) between the cutoffs.
        let blob = blob();
        let nu = [1e14, 1e15];
        let sed = Synchrotron::new(&blob).sed_flux(&nu);
        let slope = (sed[1] / sed[0]).log10();
        assert!((slope - 0.1).abs() < 0.03, "slope {slope}");
    }

    #[test]
    fn self_absorption_only_suppresses() {
        let blob = blob();
        let nu = logspace(1e8, 1e16, 20);
        let thin = Synchrotron::new(&blob).sed_flux(&nu);
        let thick = Synchrotron::new(&blob).with_ssa(true).sed_flux(&nu);
        for (a, b) in thin.iter().zip(&thick) {
            assert!(*b <= *a * (1.0 + 1e-9));
        }
        // Strong absorption at the lowest frequency.
        assert!(thick[0] < 0.5 * thin[0]);
        assert!((ssa_attenuation(1e-5) - 1.0).abs() < 1e-5);
    }
}
