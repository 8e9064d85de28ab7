//! Broad-line region as an infinitesimally thin spherical shell emitting a
//! single line.
//!
//! The shell of radius `R_line` reprocesses a fraction `ξ_line` of the disk
//! luminosity. A shell element at polar cosine `μ_re` is at distance
//! `x = sqrt(R_line^2 + r^2 - 2 r R_line μ_re)` from the blob and its photons
//! travel at `μ* = (r - R_line μ_re) / x` to the axis:
//!
//! ```text
//! u'(r) = ξ_line L_disk / (8π c) ∫_{-1}^{1} dμ_re Γ^2 (1 - β μ*)^2 / x^2
//! ```

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::emission::Blob;
use crate::error::AppError;
use crate::math::{linspace, trapz};
use crate::physics::{ANGSTROM, C, H, MEC2};
use crate::targets::{PhotonTarget, beam_boost};

/// Number of `μ_re` samples across the shell.
const MU_SIZE: usize = 1000;

/// Emission lines available for the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlrLine {
    LyBeta,
    LyAlpha,
    CIV,
    HeII,
    MgII,
    HGamma,
    HBeta,
    HAlpha,
}

impl BlrLine {
    pub const ALL: [BlrLine; 8] = [
        BlrLine::LyBeta,
        BlrLine::LyAlpha,
        BlrLine::CIV,
        BlrLine::HeII,
        BlrLine::MgII,
        BlrLine::HGamma,
        BlrLine::HBeta,
        BlrLine::HAlpha,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BlrLine::LyBeta => "Lybeta",
            BlrLine::LyAlpha => "Lyalpha",
            BlrLine::CIV => "CIV",
            BlrLine::HeII => "HeII",
            BlrLine::MgII => "MgII",
            BlrLine::HGamma => "Hgamma",
            BlrLine::HBeta => "Hbeta",
            BlrLine::HAlpha => "Halpha",
        }
    }

    /// Rest-frame wavelength (Å).
    pub fn wavelength(self) -> f64 {
        match self {
            BlrLine::LyBeta => 1025.72,
            BlrLine::LyAlpha => 1215.67,
            BlrLine::CIV => 1549.06,
            BlrLine::HeII => 1640.42,
            BlrLine::MgII => 2798.75,
            BlrLine::HGamma => 4341.68,
            BlrLine::HBeta => 4862.68,
            BlrLine::HAlpha => 6564.61,
        }
    }

    /// Dimensionless line photon energy `h c / (λ m_e c^2)`.
    pub fn epsilon(self) -> f64 {
        H * C / (self.wavelength() * ANGSTROM) / MEC2
    }
}

impl fmt::Display for BlrLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlrLine {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlrLine::ALL
            .into_iter()
            .find(|line| line.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<&str> = BlrLine::ALL.iter().map(|l| l.name()).collect();
                AppError::new(2, format!("Unknown BLR line '{s}' (known: {})", known.join(", ")))
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SphericalShellBlr {
    l_disk: f64,
    xi_line: f64,
    line: BlrLine,
    /// Shell radius (cm).
    r_line: f64,
}

impl SphericalShellBlr {
    pub fn new(l_disk: f64, xi_line: f64, line: BlrLine, r_line: f64) -> Result<Self, AppError> {
        if !(l_disk.is_finite() && l_disk > 0.0) {
            return Err(AppError::new(2, format!("Disk luminosity must be positive, got {l_disk}")));
        }
        if !(xi_line.is_finite() && xi_line > 0.0 && xi_line <= 1.0) {
            return Err(AppError::new(2, format!("Reprocessed fraction must be in (0, 1], got {xi_line}")));
        }
        if !(r_line.is_finite() && r_line > 0.0) {
            return Err(AppError::new(2, format!("BLR radius must be positive, got {r_line}")));
        }
        Ok(Self { l_disk, xi_line, line, r_line })
    }

    pub fn line(&self) -> BlrLine {
        self.line
    }

    pub fn r_line(&self) -> f64 {
        self.r_line
    }

    /// Line luminosity (erg s^-1).
    pub fn l_line(&self) -> f64 {
        self.xi_line * self.l_disk
    }

    pub fn u_comoving(&self, r: f64, gamma: f64) -> f64 {
        let beta = (1.0 - 1.0 / (gamma * gamma)).sqrt();
        let mu_re = linspace(-1.0, 1.0, MU_SIZE);
        let integrand: Vec<f64> = mu_re
            .iter()
            .map(|&mu| {
                let x2 = self.r_line * self.r_line + r * r - 2.0 * r * self.r_line * mu;
                if x2 <= 0.0 {
                    return 0.0;
                }
                let mu_star = (r - self.r_line * mu) / x2.sqrt();
                beam_boost(gamma, beta, mu_star) / x2
            })
            .collect();
        self.l_line() / (8.0 * PI * C) * trapz(&integrand, &mu_re)
    }
}

impl PhotonTarget for SphericalShellBlr {
    fn label(&self) -> &str {
        "broad line region"
    }

    fn u(&self, r: f64, blob: &Blob) -> f64 {
        self.u_comoving(r, blob.gamma())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blr() -> SphericalShellBlr {
        SphericalShellBlr::new(2e46, 0.024, BlrLine::LyAlpha, 1.1e17).unwrap()
    }

    #[test]
    fn line_lookup() {
        assert_eq!("lyalpha".parse::<BlrLine>().unwrap(), BlrLine::LyAlpha);
        assert!("Foo".parse::<BlrLine>().is_err());
        // Lyα ≈ 10.2 eV.
        let ev = BlrLine::LyAlpha.epsilon() * MEC2 / crate::physics::EV;
        assert!((ev - 10.2).abs() < 0.01, "got {ev} eV");
    }

    #[test]
    fn stationary_field_inside_and_outside_shell() {
        let blr = blr();
        // Deep inside: ∫ dμ / R^2 = 2 / R^2.
        let inside = blr.u_comoving(1e13, 1.0);
        let expected = blr.l_line() / (4.0 * PI * C * blr.r_line().powi(2));
        assert!((inside / expected - 1.0).abs() < 1e-3, "{inside} vs {expected}");

        // Far outside the shell behaves like a point source.
        let r = 1e21;
        let outside = blr.u_comoving(r, 1.0);
        let expected = blr.l_line() / (4.0 * PI * C * r * r);
        assert!((outside / expected - 1.0).abs() < 1e-3);
    }

    #[test]
    fn moving_blob_sees_boost_inside_and_deboost_outside() {
        let blr = blr();
        assert!(blr.u_comoving(1e16, 40.0) > blr.u_comoving(1e16, 1.0));
        assert!(blr.u_comoving(1e20, 40.0) < blr.u_comoving(1e20, 1.0));
    }
}
