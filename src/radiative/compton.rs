//! Synchrotron self-Compton SED.
//!
//! The blob's own synchrotron photons are the Compton targets. Their comoving
//! differential energy density is recovered from the synchrotron SED flux,
//!
//! ```text
//! u(ε) = 3 d_L^2 νFν_syn / (c R_b^2 δ_D^4 ε)
//! ```
//!
//! and the scattered emissivity uses the isotropic (Jones 1968) kernel:
//!
//! ```text
//! ε_s J(ε_s) = 3/4 c σ_T ε_s^2 ∫ dε u(ε)/ε^2 ∫ dγ N_e(γ)/γ^2 F_c(q, Γ_e)
//! ```

use rayon::prelude::*;

use crate::emission::Blob;
use crate::math::{logspace, trapz_loglog};
use crate::particles::ElectronSpectrum;
use crate::physics::{C, SIGMA_T, nu_to_epsilon};
use crate::radiative::synchrotron::synchrotron_sed_flux;
use crate::radiative::{GAMMA_SIZE, RadiatingRegion};

/// Frequency grid (Hz) on which the seed synchrotron field is tabulated.
const NU_SEED_MIN: f64 = 1e5;
const NU_SEED_MAX: f64 = 1e30;
const NU_SEED_SIZE: usize = 200;

/// Compton kernel `F_c(q, Γ_e)` for head-on scattering in the electron frame.
fn f_c(q: f64, gamma_e: f64) -> f64 {
    let term_1 = 2.0 * q * q.ln();
    let term_2 = (1.0 + 2.0 * q) * (1.0 - q);
    let gq = gamma_e * q;
    let term_3 = 0.5 * gq * gq / (1.0 + gq) * (1.0 - q);
    term_1 + term_2 + term_3
}

/// Isotropic Compton kernel for an electron of Lorentz factor `gamma`
/// scattering a photon of energy `epsilon` to `epsilon_s` (dimensionless,
/// same frame). Zero outside the kinematically allowed range.
pub fn isotropic_kernel(gamma: f64, epsilon: f64, epsilon_s: f64) -> f64 {
    if epsilon_s >= gamma {
        return 0.0;
    }
    let gamma_e = 4.0 * gamma * epsilon;
    let ratio = epsilon_s / gamma;
    let q = ratio / (gamma_e * (1.0 - ratio));
    let q_min = 1.0 / (4.0 * gamma * gamma);
    if q < q_min || q > 1.0 {
        return 0.0;
    }
    f_c(q, gamma_e)
}

/// Observed SSC SED flux νFν (erg cm^-2 s^-1) at frequencies `nu` (Hz).
pub fn ssc_sed_flux(nu: &[f64], region: &RadiatingRegion, electrons: &ElectronSpectrum, ssa: bool) -> Vec<f64> {
    let nu_seed = logspace(NU_SEED_MIN, NU_SEED_MAX, NU_SEED_SIZE);
    let sed_seed = synchrotron_sed_flux(&nu_seed, region, electrons, ssa);
    let epsilon_seed: Vec<f64> = nu_seed.iter().map(|&v| region.to_comoving(nu_to_epsilon(v))).collect();

    let u_factor = 3.0 * region.d_l * region.d_l / (C * region.r_b * region.r_b * region.delta_d.powi(4));
    let u_seed: Vec<f64> = sed_seed.iter().zip(&epsilon_seed).map(|(&s, &e)| u_factor * s / e).collect();

    // Only the span where the seed field is non-zero contributes.
    let Some(first) = u_seed.iter().position(|&u| u > 0.0) else {
        return vec![0.0; nu.len()];
    };
    let last = u_seed.iter().rposition(|&u| u > 0.0).unwrap_or(first);
    if last <= first {
        return vec![0.0; nu.len()];
    }
    let epsilon_seed = &epsilon_seed[first..=last];
    let u_seed = &u_seed[first..=last];

    let gamma = electrons.gamma_grid(GAMMA_SIZE);
    let volume = region.volume();
    let n_e_over_g2: Vec<f64> = gamma.iter().map(|&g| volume * electrons.evaluate(g) / (g * g)).collect();
    let prefactor = region.flux_prefactor();

    nu.par_iter()
        .map(|&nu| {
            let epsilon_s = region.to_comoving(nu_to_epsilon(nu));
            let outer: Vec<f64> = epsilon_seed
                .iter()
                .zip(u_seed)
                .map(|(&eps, &u)| {
                    let inner: Vec<f64> = gamma
                        .iter()
                        .zip(&n_e_over_g2)
                        .map(|(&g, &n)| n * isotropic_kernel(g, eps, epsilon_s))
                        .collect();
                    u / (eps * eps) * trapz_loglog(&inner, &gamma)
                })
                .collect();
            let integral = trapz_loglog(&outer, epsilon_seed);
            let emissivity = 0.75 * C * SIGMA_T * epsilon_s * epsilon_s * integral;
            prefactor * emissivity
        })
        .collect()
}

/// Synchrotron self-Compton radiation of a [`Blob`].
#[derive(Debug, Clone)]
pub struct SynchrotronSelfCompton<'a> {
    blob: &'a Blob,
    ssa: bool,
}

impl<'a> SynchrotronSelfCompton<'a> {
    pub fn new(blob: &'a Blob) -> Self {
        Self { blob, ssa: false }
    }

    /// Apply self-absorption to the seed synchrotron field.
    pub fn with_ssa(mut self, ssa: bool) -> Self {
        self.ssa = ssa;
        self
    }

    pub fn sed_flux(&self, nu: &[f64]) -> Vec<f64> {
        ssc_sed_flux(nu, &RadiatingRegion::from_blob(self.blob), self.blob.electrons(), self.ssa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emission::BlobParams;
    use crate::particles::{Normalization, SpectrumShape};

    fn blob(k_e: f64) -> Blob {
        Blob::new(BlobParams {
            r_b: 5e16,
            z: 0.0308,
            delta_d: 18.0,
            gamma: 18.0,
            b: 0.05,
            spectrum: SpectrumShape::BrokenPowerLaw {
                p1: 2.0,
                p2: 3.4,
                gamma_b: 1e5,
                gamma_min: 500.0,
                gamma_max: 1e6,
            },
            norm: Normalization::Differential(k_e),
        })
        .unwrap()
    }

    #[test]
    fn kernel_respects_kinematics() {
        // Scattered energy cannot exceed the electron energy.
        assert_eq!(isotropic_kernel(100.0, 1e-6, 150.0), 0.0);
        // Thomson regime, mid-range q: kernel is positive and bounded.
        let k = isotropic_kernel(1e3, 1e-8, 1e-2);
        assert!(k > 0.0 && k <= 1.0 + 1e-12, "kernel {k}");
    }

    #[test]
    fn ssc_scales_quadratically_with_density() {
        let nu = [1e24, 1e25, 1e26];
        let low = ssc_sed_flux(&nu, &RadiatingRegion::from_blob(&blob(1e-8)), blob(1e-8).electrons(), false);
        let high = ssc_sed_flux(&nu, &RadiatingRegion::from_blob(&blob(1e-7)), blob(1e-7).electrons(), false);
        for (l, h) in low.iter().zip(&high) {
            assert!(*l > 0.0);
            assert!((h / l / 100.0 - 1.0).abs() < 1e-9, "ratio {}", h / l);
        }
    }

    #[test]
    fn ssc_hump_sits_above_synchrotron_hump() {
        let blob = blob(1e-8);
        let nu = logspace(1e10, 1e29, 40);
        let ssc = SynchrotronSelfCompton::new(&blob).sed_flux(&nu);
        let syn = crate::radiative::Synchrotron::new(&blob).sed_flux(&nu);
        let argmax = |v: &[f64]| {
            v.iter()
                .enumerate()
                .fold((0, 0.0), |acc, (i, &x)| if x > acc.1 { (i, x) } else { acc })
                .0
        };
        assert!(nu[argmax(&ssc)] > 1e3 * nu[argmax(&syn)]);
        assert!(ssc.iter().all(|v| v.is_finite() && *v >= 0.0));
    }
}
