//! Flat ΛCDM distances.
//!
//! Only the luminosity distance is needed (source flux normalisation), so we
//! keep a matter + Λ model and ignore radiation, which is negligible at the
//! redshifts of interest (`z ≲ 1`).

use crate::error::AppError;
use crate::math::simpson;
use crate::physics::constants::{C, PARSEC};

/// Number of Simpson intervals for the comoving-distance integral.
const N_INTERVALS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatLambdaCdm {
    /// Hubble constant (km s^-1 Mpc^-1).
    h0: f64,
    omega_m: f64,
}

impl FlatLambdaCdm {
    /// Planck 2018 (TT,TE,EE+lowE+lensing+BAO) parameters.
    pub const PLANCK18: FlatLambdaCdm = FlatLambdaCdm {
        h0: 67.66,
        omega_m: 0.30966,
    };

    pub fn new(h0: f64, omega_m: f64) -> Result<Self, AppError> {
        if !(h0.is_finite() && h0 > 0.0) {
            return Err(AppError::new(2, format!("Invalid Hubble constant: {h0}")));
        }
        if !(omega_m.is_finite() && (0.0..=1.0).contains(&omega_m)) {
            return Err(AppError::new(2, format!("Invalid matter density: {omega_m}")));
        }
        Ok(Self { h0, omega_m })
    }

    /// Hubble distance `c / H0` (cm).
    pub fn hubble_distance(&self) -> f64 {
        let h0_per_s = self.h0 * 1e5 / (1e6 * PARSEC);
        C / h0_per_s
    }

    fn inv_efunc(&self, z: f64) -> f64 {
        let zp1 = 1.0 + z;
        let e2 = self.omega_m * zp1 * zp1 * zp1 + (1.0 - self.omega_m);
        1.0 / e2.sqrt()
    }

    /// Line-of-sight comoving distance (cm).
    pub fn comoving_distance(&self, z: f64) -> Result<f64, AppError> {
        if !(z.is_finite() && z >= 0.0) {
            return Err(AppError::new(2, format!("Invalid redshift: {z}")));
        }
        if z == 0.0 {
            return Ok(0.0);
        }
        let integral = simpson(|zz| self.inv_efunc(zz), 0.0, z, N_INTERVALS);
        Ok(self.hubble_distance() * integral)
    }

    /// Luminosity distance `(1 + z) D_C` (cm).
    pub fn luminosity_distance(&self, z: f64) -> Result<f64, AppError> {
        Ok((1.0 + z) * self.comoving_distance(z)?)
    }
}

impl Default for FlatLambdaCdm {
    fn default() -> Self {
        Self::PLANCK18
    }
}

/// Luminosity distance (cm) with the default cosmology.
pub fn luminosity_distance(z: f64) -> Result<f64, AppError> {
    FlatLambdaCdm::PLANCK18.luminosity_distance(z)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MPC: f64 = 1e6 * PARSEC;

    #[test]
    fn low_redshift_matches_hubble_law() {
        let cosmo = FlatLambdaCdm::PLANCK18;
        let z = 1e-3;
        let d_l = cosmo.luminosity_distance(z).unwrap();
        let hubble = z * cosmo.hubble_distance();
        assert!((d_l / hubble - 1.0).abs() < 2e-3, "d_L={d_l} cz/H0={hubble}");
    }

    #[test]
    fn mrk421_distance() {
        // Planck18 gives D_L(0.0308) ≈ 139.6 Mpc.
        let d_l = luminosity_distance(0.0308).unwrap() / MPC;
        assert!((d_l - 139.6).abs() < 1.0, "got {d_l} Mpc");
    }

    #[test]
    fn rejects_negative_redshift() {
        assert!(luminosity_distance(-0.1).is_err());
        assert_eq!(luminosity_distance(0.0).unwrap(), 0.0);
    }
}
