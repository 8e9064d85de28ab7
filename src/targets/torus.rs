//! Dust torus reduced to an infinitesimally thin ring of radius `R_dt` in
//! the disk plane, re-emitting a fraction `ξ_dt` of the disk luminosity as a
//! monochromatic thermal line.
//!
//! Every ring element is at `x = sqrt(r^2 + R_dt^2)` from the blob with
//! photons arriving at `μ = r / x`, so the integral over the ring is trivial.

use std::f64::consts::PI;

use crate::emission::Blob;
use crate::error::AppError;
use crate::physics::{C, K_B, MEC2};
use crate::targets::{PhotonTarget, beam_boost};

/// Sublimation radius (cm) for a disk luminosity `l_disk` (erg s^-1).
pub fn sublimation_radius(l_disk: f64) -> f64 {
    2.5e18 * (l_disk / 1e45).sqrt()
}

#[derive(Debug, Clone, PartialEq)]
pub struct RingDustTorus {
    l_disk: f64,
    xi_dt: f64,
    /// Dust temperature (K).
    t_dt: f64,
    /// Ring radius (cm).
    r_dt: f64,
}

impl RingDustTorus {
    /// Build the ring; `r_dt = None` places it at the sublimation radius.
    pub fn new(l_disk: f64, xi_dt: f64, t_dt: f64, r_dt: Option<f64>) -> Result<Self, AppError> {
        if !(l_disk.is_finite() && l_disk > 0.0) {
            return Err(AppError::new(2, format!("Disk luminosity must be positive, got {l_disk}")));
        }
        if !(xi_dt.is_finite() && xi_dt > 0.0 && xi_dt <= 1.0) {
            return Err(AppError::new(2, format!("Reprocessed fraction must be in (0, 1], got {xi_dt}")));
        }
        if !(t_dt.is_finite() && t_dt > 0.0) {
            return Err(AppError::new(2, format!("Dust temperature must be positive, got {t_dt}")));
        }
        let r_dt = r_dt.unwrap_or_else(|| sublimation_radius(l_disk));
        if !(r_dt.is_finite() && r_dt > 0.0) {
            return Err(AppError::new(2, format!("Torus radius must be positive, got {r_dt}")));
        }
        Ok(Self { l_disk, xi_dt, t_dt, r_dt })
    }

    pub fn r_dt(&self) -> f64 {
        self.r_dt
    }

    pub fn t_dt(&self) -> f64 {
        self.t_dt
    }

    /// Dimensionless energy of the thermal peak, `2.7 k T / m_e c^2`.
    pub fn epsilon_dt(&self) -> f64 {
        2.7 * K_B * self.t_dt / MEC2
    }

    pub fn u_comoving(&self, r: f64, gamma: f64) -> f64 {
        let beta = (1.0 - 1.0 / (gamma * gamma)).sqrt();
        let x2 = r * r + self.r_dt * self.r_dt;
        let mu = r / x2.sqrt();
        self.xi_dt * self.l_disk / (4.0 * PI * C * x2) * beam_boost(gamma, beta, mu)
    }
}

impl PhotonTarget for RingDustTorus {
    fn label(&self) -> &str {
        "dust torus"
    }

    fn u(&self, r: f64, blob: &Blob) -> f64 {
        self.u_comoving(r, blob.gamma())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_radius_scales_with_sqrt_luminosity() {
        let torus = RingDustTorus::new(2e46, 0.1, 1000.0, None).unwrap();
        assert!((torus.r_dt() / (2.5e18 * 20f64.sqrt()) - 1.0).abs() < 1e-12);
        let explicit = RingDustTorus::new(2e46, 0.1, 1000.0, Some(1e18)).unwrap();
        assert_eq!(explicit.r_dt(), 1e18);
    }

    #[test]
    fn stationary_field_falls_off_as_inverse_square() {
        let torus = RingDustTorus::new(2e46, 0.1, 1000.0, Some(1e18)).unwrap();
        let u1 = torus.u_comoving(1e21, 1.0);
        let u2 = torus.u_comoving(2e21, 1.0);
        assert!((u1 / u2 - 4.0).abs() < 1e-5);
        // Inside the ring the field saturates.
        let near = torus.u_comoving(1e14, 1.0);
        let expected = 0.1 * 2e46 / (4.0 * PI * C * 1e36);
        assert!((near / expected - 1.0).abs() < 1e-6);
    }

    #[test]
    fn thermal_peak_energy() {
        let torus = RingDustTorus::new(2e46, 0.1, 1000.0, None).unwrap();
        let ev = torus.epsilon_dt() * MEC2 / crate::physics::EV;
        // 2.7 k T at 1000 K ≈ 0.233 eV.
        assert!((ev - 0.2327).abs() < 1e-3, "got {ev}");
        assert!(RingDustTorus::new(2e46, 0.1, -5.0, None).is_err());
    }
}
