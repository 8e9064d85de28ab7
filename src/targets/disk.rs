//! Shakura–Sunyaev accretion disk.
//!
//! Geometrically thin, optically thick disk between `R_in` and `R_out`
//! radiating locally as
//!
//! ```text
//! F(R) = 3 G M ṁ / (8π R^3) · φ(R),   φ(R) = 1 - sqrt(R_in / R),   ṁ = L_disk / (η c^2)
//! ```
//!
//! per face. On the jet axis at height `r`, an annulus at radius `R` subtends
//! `dΩ = 2π r R dR / (r^2 + R^2)^{3/2}` and its photons travel at
//! `μ = r / sqrt(r^2 + R^2)` to the axis, so the comoving energy density is
//!
//! ```text
//! u'(r) = 3 G M ṁ / (4π c) ∫ dR φ(R) r / (R^2 (r^2 + R^2)^{3/2}) · Γ^2 (1 - β μ)^2
//! ```

use std::f64::consts::PI;

use crate::emission::Blob;
use crate::error::AppError;
use crate::math::{linspace, trapz};
use crate::physics::{C, G};
use crate::targets::{PhotonTarget, beam_boost};

/// Number of radii sampled (uniform in ln R) across the disk.
const R_SIZE: usize = 400;

/// Units in which disk radii are supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadiusUnit {
    /// Gravitational radii `G M / c^2`.
    Gravitational,
    Centimeters,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SsDisk {
    /// Black hole mass (g).
    m_bh: f64,
    /// Disk luminosity (erg s^-1).
    l_disk: f64,
    /// Radiative efficiency.
    eta: f64,
    /// Inner / outer radius (cm).
    r_in: f64,
    r_out: f64,
}

impl SsDisk {
    pub fn new(m_bh: f64, l_disk: f64, eta: f64, r_in: f64, r_out: f64, unit: RadiusUnit) -> Result<Self, AppError> {
        if !(m_bh.is_finite() && m_bh > 0.0) {
            return Err(AppError::new(2, format!("Black hole mass must be positive, got {m_bh}")));
        }
        if !(l_disk.is_finite() && l_disk > 0.0) {
            return Err(AppError::new(2, format!("Disk luminosity must be positive, got {l_disk}")));
        }
        if !(eta.is_finite() && eta > 0.0 && eta <= 1.0) {
            return Err(AppError::new(2, format!("Accretion efficiency must be in (0, 1], got {eta}")));
        }
        let scale = match unit {
            RadiusUnit::Gravitational => G * m_bh / (C * C),
            RadiusUnit::Centimeters => 1.0,
        };
        let (r_in, r_out) = (r_in * scale, r_out * scale);
        if !(r_in > 0.0 && r_out > r_in) {
            return Err(AppError::new(2, format!("Invalid disk radii: [{r_in}, {r_out}] cm")));
        }
        Ok(Self { m_bh, l_disk, eta, r_in, r_out })
    }

    /// Gravitational radius (cm).
    pub fn r_g(&self) -> f64 {
        G * self.m_bh / (C * C)
    }

    /// Mass accretion rate (g s^-1).
    pub fn m_dot(&self) -> f64 {
        self.l_disk / (self.eta * C * C)
    }

    pub fn r_in(&self) -> f64 {
        self.r_in
    }

    pub fn r_out(&self) -> f64 {
        self.r_out
    }

    /// Radial profile of the emitted flux, `1 - sqrt(R_in / R)`.
    pub fn phi(&self, r_disk: f64) -> f64 {
        1.0 - (self.r_in / r_disk).sqrt()
    }

    /// Energy density on the axis at `r` for a frame moving with `gamma`.
    pub fn u_comoving(&self, r: f64, gamma: f64) -> f64 {
        let beta = (1.0 - 1.0 / (gamma * gamma)).sqrt();
        let ln_r = linspace(self.r_in.ln(), self.r_out.ln(), R_SIZE);
        let integrand: Vec<f64> = ln_r
            .iter()
            .map(|&lr| {
                let rd = lr.exp();
                let x2 = r * r + rd * rd;
                let mu = r / x2.sqrt();
                // dR = R d(ln R)
                self.phi(rd) * r / (rd * x2 * x2.sqrt()) * beam_boost(gamma, beta, mu)
            })
            .collect();
        let prefactor = 3.0 * G * self.m_bh * self.m_dot() / (4.0 * PI * C);
        prefactor * trapz(&integrand, &ln_r)
    }
}

impl PhotonTarget for SsDisk {
    fn label(&self) -> &str {
        "disk"
    }

    fn u(&self, r: f64, blob: &Blob) -> f64 {
        self.u_comoving(r, blob.gamma())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::M_SUN;

    fn disk() -> SsDisk {
        SsDisk::new(1.2e9 * M_SUN, 2e46, 1.0 / 12.0, 6.0, 200.0, RadiusUnit::Gravitational).unwrap()
    }

    #[test]
    fn radii_in_gravitational_units() {
        let d = disk();
        assert!((d.r_in() / d.r_g() - 6.0).abs() < 1e-12);
        assert!((d.r_out() / d.r_g() - 200.0).abs() < 1e-12);
    }

    #[test]
    fn stationary_far_field_matches_point_source() {
        // Far away on the axis, a Lambertian face of luminosity
        // L_face = ∫ 2π R F(R) dR gives u = L_face / (π r^2 c).
        let d = disk();
        let r = 1e4 * d.r_out();
        let u = d.u_comoving(r, 1.0);

        let rs = linspace(d.r_in().ln(), d.r_out().ln(), 4000);
        let integrand: Vec<f64> = rs
            .iter()
            .map(|&lr| {
                let rd = lr.exp();
                2.0 * PI * rd * rd * 3.0 * G * d.m_bh * d.m_dot() / (8.0 * PI * rd.powi(3)) * d.phi(rd)
            })
            .collect();
        let l_face = trapz(&integrand, &rs);
        let expected = l_face / (PI * r * r * C);
        assert!((u / expected - 1.0).abs() < 1e-2, "u={u} expected={expected}");
    }

    #[test]
    fn moving_blob_sees_deboosted_disk_far_away() {
        let d = disk();
        let r = 1e19;
        assert!(d.u_comoving(r, 40.0) < d.u_comoving(r, 1.0));
    }
}
